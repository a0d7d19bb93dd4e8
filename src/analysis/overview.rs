//! Stage 1: one generation call over every headline of the batch.

use crate::analysis::prompts;
use crate::api::TextGenerator;
use crate::config::{ExtractionConfig, GenerationConfig};
use crate::models::{ChatMessage, NewsItem};
use crate::utils::truncate_for_log;
use std::fmt::Write;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Render titles as one markdown bullet each, in input order.
pub fn render_titles(news: &[NewsItem]) -> String {
    news.iter().fold(String::new(), |mut out, item| {
        let _ = writeln!(out, "- {}", item.title);
        out
    })
}

pub struct OverviewStage<'a, G> {
    generator: &'a G,
    generation: &'a GenerationConfig,
    extraction: &'a ExtractionConfig,
}

impl<'a, G: TextGenerator> OverviewStage<'a, G> {
    pub fn new(
        generator: &'a G,
        generation: &'a GenerationConfig,
        extraction: &'a ExtractionConfig,
    ) -> Self {
        Self {
            generator,
            generation,
            extraction,
        }
    }

    /// Produce the daily overview, or a fallback text; never fails.
    #[instrument(level = "info", skip_all, fields(news_count = news.len()))]
    pub async fn summarize(&self, news: &[NewsItem]) -> String {
        if news.is_empty() {
            info!("Empty news batch; using empty-input overview");
            return prompts::EMPTY_INPUT_OVERVIEW.to_string();
        }

        let prompt = prompts::overview_prompt(&self.extraction.heading_marker, &render_titles(news));
        debug!(prompt_chars = prompt.chars().count(), "Built overview prompt");
        let messages = [
            ChatMessage::system(self.generation.system_prompt.as_str()),
            ChatMessage::user(prompt),
        ];

        let t0 = Instant::now();
        match self
            .generator
            .generate(&messages, self.generation.max_tokens, self.generation.timeout())
            .await
        {
            Ok(overview) => {
                info!(
                    elapsed_ms = t0.elapsed().as_millis(),
                    chars = overview.chars().count(),
                    preview = %truncate_for_log(&overview, 200),
                    "Overview generated"
                );
                overview
            }
            Err(e) => {
                error!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "Overview generation failed; using fallback");
                prompts::OVERVIEW_FAILED.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedGenerator;

    #[test]
    fn test_render_titles() {
        let news = vec![
            NewsItem::new("Central bank cuts rates"),
            NewsItem::new("Chipmaker unveils accelerator"),
        ];
        assert_eq!(
            render_titles(&news),
            "- Central bank cuts rates\n- Chipmaker unveils accelerator\n"
        );
        assert_eq!(render_titles(&[]), "");
    }

    #[tokio::test]
    async fn test_empty_batch_skips_generation() {
        let generator = ScriptedGenerator::replying("unused");
        let generation = GenerationConfig::default();
        let extraction = ExtractionConfig::default();
        let stage = OverviewStage::new(&generator, &generation, &extraction);

        assert_eq!(stage.summarize(&[]).await, prompts::EMPTY_INPUT_OVERVIEW);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_summarize_sends_titles_with_main_budget() {
        let generator = ScriptedGenerator::replying("# Overview\n\n## Key Events\n- something");
        let generation = GenerationConfig::default();
        let extraction = ExtractionConfig::default();
        let stage = OverviewStage::new(&generator, &generation, &extraction);

        let out = stage
            .summarize(&[NewsItem::new("Central bank cuts rates")])
            .await;
        assert!(out.starts_with("# Overview"));

        let call = &generator.calls()[0];
        assert!(call.prompt.starts_with(prompts::OVERVIEW_TASK));
        assert!(call.prompt.ends_with("- Central bank cuts rates\n"));
        assert_eq!(call.max_tokens, 4096);
        assert_eq!(call.timeout, generation.timeout());
    }

    #[tokio::test]
    async fn test_failure_yields_fallback_without_events() {
        let generator = ScriptedGenerator::failing();
        let generation = GenerationConfig::default();
        let extraction = ExtractionConfig::default();
        let stage = OverviewStage::new(&generator, &generation, &extraction);

        let out = stage.summarize(&[NewsItem::new("Headline")]).await;
        assert_eq!(out, prompts::OVERVIEW_FAILED);
        assert_eq!(
            crate::analysis::extract::parse_key_events(&out, &extraction),
            None
        );
    }
}
