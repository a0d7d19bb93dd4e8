//! Key-event extraction from the stage-1 overview.
//!
//! Extraction degrades through three tiers, each tried only when the previous
//! one found nothing:
//!
//! 1. Structural parse of the `## Key Events` section ([`parse_key_events`])
//! 2. One constrained generation call whose bullets are parsed the same way
//! 3. An empty list, in which case stage 2 is skipped
//!
//! Tier 1 is pure and deterministic; running it twice on the same text yields
//! the same list.

use crate::analysis::prompts;
use crate::api::TextGenerator;
use crate::config::ExtractionConfig;
use crate::error::AnalysisError;
use crate::models::{ChatMessage, KeyEvent};
use crate::utils::{truncate_chars, truncate_for_log};
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

/// Tier 1: collect the bullets under the key-events heading.
///
/// Returns `None` when there is no such heading or no bullet under it passes
/// the length threshold. A later heading that also carries the marker keeps
/// the section open; any other heading closes it.
pub fn parse_key_events(summary: &str, config: &ExtractionConfig) -> Option<Vec<KeyEvent>> {
    let mut capturing = false;
    let mut candidates = Vec::new();

    for line in summary.lines() {
        let line = line.trim();
        let is_heading = line.starts_with('#');
        let has_marker = line.contains(config.heading_marker.as_str());

        if !capturing {
            if is_heading && has_marker {
                debug!(heading = %line, "Found key events heading");
                capturing = true;
            }
            continue;
        }
        if is_heading {
            if has_marker {
                continue;
            }
            break;
        }
        if let Some(candidate) = accept_bullet(line, config) {
            candidates.push(candidate);
        }
    }

    let events = finalize(candidates, config.max_events);
    if events.is_empty() { None } else { Some(events) }
}

/// Parse every bullet line of free text, as returned by the AI tier.
pub fn parse_bullets(text: &str, config: &ExtractionConfig) -> Vec<KeyEvent> {
    let candidates = text
        .lines()
        .filter_map(|line| accept_bullet(line.trim(), config))
        .collect();
    finalize(candidates, config.max_events)
}

/// Strip the first matching bullet marker and apply the length threshold.
fn accept_bullet<'a>(line: &'a str, config: &ExtractionConfig) -> Option<&'a str> {
    let rest = config
        .bullet_markers
        .iter()
        .find_map(|marker| line.strip_prefix(marker.as_str()))?;
    let candidate = rest.trim();
    (candidate.chars().count() > config.min_event_chars).then_some(candidate)
}

/// Case-insensitive dedup keeping first-seen order and casing, then cap.
fn finalize(candidates: Vec<&str>, max_events: usize) -> Vec<KeyEvent> {
    candidates
        .into_iter()
        .unique_by(|c| c.to_lowercase())
        .take(max_events)
        .map(KeyEvent::new)
        .collect()
}

/// Runs the three extraction tiers.
pub struct KeyEventExtractor<'a, G> {
    generator: &'a G,
    config: &'a ExtractionConfig,
}

impl<'a, G: TextGenerator> KeyEventExtractor<'a, G> {
    pub fn new(generator: &'a G, config: &'a ExtractionConfig) -> Self {
        Self { generator, config }
    }

    /// Extract up to `max_events` key events; never fails.
    #[instrument(level = "info", skip_all, fields(summary_chars = summary.chars().count()))]
    pub async fn extract(&self, summary: &str) -> Vec<KeyEvent> {
        if let Some(events) = parse_key_events(summary, self.config) {
            info!(count = events.len(), "Structural extraction succeeded");
            return events;
        }

        info!("Structural extraction found nothing; trying AI extraction");
        match self.ai_extract(summary).await {
            Ok(events) => {
                info!(count = events.len(), "AI extraction succeeded");
                events
            }
            Err(AnalysisError::ExtractionEmpty) => {
                warn!("All extraction tiers failed; stage 2 will be skipped");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "AI extraction call failed; stage 2 will be skipped");
                Vec::new()
            }
        }
    }

    /// Tier 2: one small-budget generation call.
    async fn ai_extract(&self, summary: &str) -> Result<Vec<KeyEvent>, AnalysisError> {
        let excerpt = truncate_chars(summary, self.config.ai_input_chars);
        let messages = [ChatMessage::user(prompts::extraction_prompt(
            excerpt,
            self.config.max_events,
        ))];
        let response = self
            .generator
            .generate(
                &messages,
                self.config.ai_max_tokens,
                self.config.ai_timeout(),
            )
            .await?;
        debug!(preview = %truncate_for_log(&response, 300), "AI extraction response");

        let events = parse_bullets(&response, self.config);
        if events.is_empty() {
            return Err(AnalysisError::ExtractionEmpty);
        }
        Ok(events)
    }
}
