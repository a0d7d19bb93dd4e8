//! Stage 2: per-event deep dives, run concurrently.
//!
//! At most `deep_dive.max_events` events are analysed; the rest are ignored.
//! Each event runs as an independent future:
//!
//! 1. Search for context (best-effort, empty on failure)
//! 2. Generate with the search hits embedded in the prompt
//! 3. On failure, generate once more with the plain prompt
//! 4. On failure again, record a placeholder carrying the error
//!
//! All futures are polled together, so the stage takes about as long as its
//! slowest event rather than the sum of them.

use crate::analysis::prompts;
use crate::api::TextGenerator;
use crate::config::AnalystConfig;
use crate::error::GenerationError;
use crate::models::{ChatMessage, KeyEvent};
use crate::search::{SearchProvider, build_search_query};
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

pub struct DeepDiveAnalyzer<'a, G, S> {
    generator: &'a G,
    search: &'a S,
    config: &'a AnalystConfig,
}

impl<'a, G: TextGenerator, S: SearchProvider> DeepDiveAnalyzer<'a, G, S> {
    pub fn new(generator: &'a G, search: &'a S, config: &'a AnalystConfig) -> Self {
        Self {
            generator,
            search,
            config,
        }
    }

    /// Analyse the first `max_events` events. Results are in submission order.
    #[instrument(level = "info", skip_all, fields(events = events.len()))]
    pub async fn analyze_all(&self, events: &[KeyEvent]) -> Vec<String> {
        let width = self.config.deep_dive.max_events;
        if events.len() > width {
            info!(
                ignored = events.len() - width,
                width, "More events than fan-out width; extra events ignored"
            );
        }
        let t0 = Instant::now();

        let analyses: Vec<String> = stream::iter(events.iter().take(width).enumerate())
            .map(|(index, event)| self.analyze_one(index, event))
            .buffered(width.max(1))
            .collect()
            .await;

        info!(
            count = analyses.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "Deep dives completed"
        );
        analyses
    }

    async fn analyze_one(&self, index: usize, event: &KeyEvent) -> String {
        debug!(index, event = %event, "Starting deep dive");

        let query = build_search_query(event.as_str());
        let hits = self
            .search
            .search(&query, self.config.search.max_results)
            .await;
        debug!(index, hits = hits.len(), "Search enrichment done");

        let enriched =
            prompts::enriched_deep_dive_prompt(event, &hits, self.config.deep_dive.snippet_chars);
        let first = match self.ask(enriched).await {
            Ok(analysis) => {
                info!(index, chars = analysis.chars().count(), "Deep dive succeeded");
                return analysis;
            }
            Err(e) => e,
        };

        warn!(index, error = %first, "Enriched deep dive failed; retrying with plain prompt");
        match self.ask(prompts::deep_dive_prompt(event)).await {
            Ok(analysis) => {
                info!(index, chars = analysis.chars().count(), "Plain deep dive succeeded");
                analysis
            }
            Err(e) => {
                error!(index, error = %e, "Deep dive failed at every tier; recording placeholder");
                prompts::deep_dive_failed(&e.to_string())
            }
        }
    }

    async fn ask(&self, prompt: String) -> Result<String, GenerationError> {
        let generation = &self.config.generation;
        let messages = [
            ChatMessage::system(generation.system_prompt.as_str()),
            ChatMessage::user(prompt),
        ];
        self.generator
            .generate(&messages, generation.max_tokens, generation.timeout())
            .await
    }
}
