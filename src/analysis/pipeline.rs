//! The three-stage controller.
//!
//! Stages run strictly in sequence; each stage sees the complete output of the
//! one before it. No stage can abort the run: every failure is absorbed into a
//! fallback text, so [`Pipeline::run`] always returns a full result.

use crate::analysis::deep_dive::DeepDiveAnalyzer;
use crate::analysis::extract::KeyEventExtractor;
use crate::analysis::overview::OverviewStage;
use crate::analysis::synthesis::SynthesisStage;
use crate::api::TextGenerator;
use crate::config::AnalystConfig;
use crate::models::{NewsItem, PipelineResult};
use crate::search::SearchProvider;
use std::time::Instant;
use tracing::{info, instrument};

pub struct Pipeline<'a, G, S> {
    generator: &'a G,
    search: &'a S,
    config: &'a AnalystConfig,
}

impl<'a, G: TextGenerator, S: SearchProvider> Pipeline<'a, G, S> {
    pub fn new(generator: &'a G, search: &'a S, config: &'a AnalystConfig) -> Self {
        Self {
            generator,
            search,
            config,
        }
    }

    #[instrument(level = "info", skip_all, fields(news_count = news.len()))]
    pub async fn run(&self, news: &[NewsItem]) -> PipelineResult {
        let t0 = Instant::now();

        // Stage 1
        let stage_one = OverviewStage::new(
            self.generator,
            &self.config.generation,
            &self.config.extraction,
        )
        .summarize(news)
        .await;
        info!(elapsed_ms = t0.elapsed().as_millis(), "Stage 1 done");

        // Stage 2
        let events = if news.is_empty() {
            Vec::new()
        } else {
            KeyEventExtractor::new(self.generator, &self.config.extraction)
                .extract(&stage_one)
                .await
        };
        let stage_two = if events.is_empty() {
            info!("No key events; skipping deep dives");
            Vec::new()
        } else {
            DeepDiveAnalyzer::new(self.generator, self.search, self.config)
                .analyze_all(&events)
                .await
        };
        info!(
            events = events.len(),
            analyses = stage_two.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "Stage 2 done"
        );

        // Stage 3
        let stage_three = SynthesisStage::new(
            self.generator,
            &self.config.synthesis,
            &self.config.generation,
        )
        .synthesize(&stage_one, &stage_two)
        .await;
        info!(elapsed_ms_total = t0.elapsed().as_millis(), "Stage 3 done");

        PipelineResult {
            stage_one,
            stage_two,
            stage_three,
        }
    }
}
