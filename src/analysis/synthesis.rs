//! Stage 3: synthesis with bounded retries, exponential backoff and prompt
//! degradation.
//!
//! # Retry Strategy
//!
//! ```text
//! Attempting(1) -fail-> sleep(base) -> Attempting(2) -fail-> sleep(2*base) -> ...
//! Attempting(retries) -fail-> Degraded -fail-> Failed
//! any attempt -ok-> Done
//! ```
//!
//! The degraded prompt keeps the overview and replaces the per-event analyses
//! with a placeholder, so a rejection triggered by payload size can still
//! succeed.

use crate::analysis::prompts;
use crate::api::TextGenerator;
use crate::config::{GenerationConfig, SynthesisConfig};
use crate::error::GenerationError;
use crate::models::ChatMessage;
use rand::{Rng, rng};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Position in the synthesis retry sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisPhase {
    /// Attempt `n` (1-based) against the full prompt.
    Attempting(u32),
    /// The single attempt against the degraded prompt.
    Degraded,
    Done,
    Failed,
}

impl SynthesisPhase {
    /// Entry phase for a policy with `max_attempts` full-prompt attempts.
    pub fn start(max_attempts: u32) -> Self {
        if max_attempts == 0 {
            SynthesisPhase::Degraded
        } else {
            SynthesisPhase::Attempting(1)
        }
    }

    /// Next phase after the current attempt succeeded or failed.
    pub fn advance(self, succeeded: bool, max_attempts: u32) -> Self {
        match (self, succeeded) {
            (SynthesisPhase::Attempting(_) | SynthesisPhase::Degraded, true) => SynthesisPhase::Done,
            (SynthesisPhase::Attempting(n), false) if n < max_attempts => {
                SynthesisPhase::Attempting(n + 1)
            }
            (SynthesisPhase::Attempting(_), false) => SynthesisPhase::Degraded,
            (SynthesisPhase::Degraded, false) => SynthesisPhase::Failed,
            (terminal, _) => terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SynthesisPhase::Done | SynthesisPhase::Failed)
    }
}

/// Exponential backoff between full-prompt attempts.
///
/// ```text
/// delay(n) = min(base * 2^(n-2), max) + random_jitter(0..=jitter)   for n >= 2
/// delay(1) = 0
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    jitter_ms: u64,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, jitter_ms: u64) -> Self {
        Self {
            base,
            max,
            jitter_ms,
        }
    }

    pub fn from_config(config: &SynthesisConfig) -> Self {
        Self::new(
            Duration::from_secs(config.base_delay_secs),
            Duration::from_secs(config.max_delay_secs),
            config.jitter_ms,
        )
    }

    /// Deterministic part of the wait before full-prompt attempt `attempt`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exp = (attempt - 2).min(31);
        self.base.saturating_mul(1 << exp).min(self.max)
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let delay = self.delay_before(attempt);
        if delay.is_zero() || self.jitter_ms == 0 {
            return delay;
        }
        let jitter_ms: u64 = rng().random_range(0..=self.jitter_ms);
        delay + Duration::from_millis(jitter_ms)
    }
}

pub struct SynthesisStage<'a, G> {
    generator: &'a G,
    config: &'a SynthesisConfig,
    generation: &'a GenerationConfig,
    backoff: Backoff,
}

impl<'a, G: TextGenerator> SynthesisStage<'a, G> {
    pub fn new(
        generator: &'a G,
        config: &'a SynthesisConfig,
        generation: &'a GenerationConfig,
    ) -> Self {
        Self {
            generator,
            config,
            generation,
            backoff: Backoff::from_config(config),
        }
    }

    /// Produce the synthesis report, or the failure placeholder; never fails.
    #[instrument(level = "info", skip_all, fields(analyses = analyses.len(), retries = self.config.retries))]
    pub async fn synthesize(&self, overview: &str, analyses: &[String]) -> String {
        let full = prompts::synthesis_prompt(overview, analyses);
        let degraded = prompts::degraded_synthesis_prompt(overview);
        let max_attempts = self.config.retries;
        let total_t0 = Instant::now();

        let mut phase = SynthesisPhase::start(max_attempts);
        let mut report = None;
        while !phase.is_terminal() {
            let outcome = match phase {
                SynthesisPhase::Attempting(attempt) => {
                    let delay = self.backoff.jittered(attempt);
                    if !delay.is_zero() {
                        warn!(attempt, max = max_attempts, ?delay, "Backing off before next synthesis attempt");
                        sleep(delay).await;
                    }
                    self.ask(&full).await
                }
                SynthesisPhase::Degraded => {
                    warn!("Full-prompt attempts exhausted; trying degraded prompt");
                    self.ask(&degraded).await
                }
                SynthesisPhase::Done | SynthesisPhase::Failed => break,
            };

            match outcome {
                Ok(text) => {
                    info!(
                        ?phase,
                        elapsed_ms_total = total_t0.elapsed().as_millis(),
                        "Synthesis succeeded"
                    );
                    report = Some(text);
                    phase = phase.advance(true, max_attempts);
                }
                Err(e) => {
                    warn!(?phase, error = %e, "Synthesis attempt failed");
                    phase = phase.advance(false, max_attempts);
                }
            }
        }

        report.unwrap_or_else(|| {
            error!(
                elapsed_ms_total = total_t0.elapsed().as_millis(),
                "Synthesis failed at every attempt; using fallback"
            );
            prompts::SYNTHESIS_FAILED.to_string()
        })
    }

    async fn ask(&self, prompt: &str) -> Result<String, GenerationError> {
        let messages = [
            ChatMessage::system(self.generation.system_prompt.as_str()),
            ChatMessage::user(prompt),
        ];
        self.generator
            .generate(&messages, self.generation.max_tokens, self.config.timeout())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedGenerator, transport_error};

    const ANALYSIS: &str = "# Deep dive on the rate cut";

    fn no_jitter() -> SynthesisConfig {
        SynthesisConfig {
            jitter_ms: 0,
            ..SynthesisConfig::default()
        }
    }

    #[test]
    fn test_phase_sequence_all_failures() {
        let mut phase = SynthesisPhase::start(3);
        let mut seen = vec![phase];
        while !phase.is_terminal() {
            phase = phase.advance(false, 3);
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                SynthesisPhase::Attempting(1),
                SynthesisPhase::Attempting(2),
                SynthesisPhase::Attempting(3),
                SynthesisPhase::Degraded,
                SynthesisPhase::Failed,
            ]
        );
    }

    #[test]
    fn test_phase_success_is_done() {
        assert_eq!(SynthesisPhase::Attempting(2).advance(true, 3), SynthesisPhase::Done);
        assert_eq!(SynthesisPhase::Degraded.advance(true, 3), SynthesisPhase::Done);
        assert_eq!(SynthesisPhase::Done.advance(false, 3), SynthesisPhase::Done);
        assert_eq!(SynthesisPhase::Failed.advance(true, 3), SynthesisPhase::Failed);
    }

    #[test]
    fn test_zero_retries_goes_straight_to_degraded() {
        assert_eq!(SynthesisPhase::start(0), SynthesisPhase::Degraded);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let backoff = Backoff::new(Duration::from_secs(3), Duration::from_secs(10), 0);
        assert_eq!(backoff.delay_before(1), Duration::ZERO);
        assert_eq!(backoff.delay_before(2), Duration::from_secs(3));
        assert_eq!(backoff.delay_before(3), Duration::from_secs(6));
        assert_eq!(backoff.delay_before(4), Duration::from_secs(10));
        assert_eq!(backoff.delay_before(60), Duration::from_secs(10));
    }

    #[test]
    fn test_jitter_is_bounded() {
        let backoff = Backoff::new(Duration::from_secs(3), Duration::from_secs(60), 250);
        for _ in 0..50 {
            let d = backoff.jittered(2);
            assert!(d >= Duration::from_secs(3));
            assert!(d <= Duration::from_millis(3250));
        }
        assert_eq!(backoff.jittered(1), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_uses_full_prompt() {
        let generator = ScriptedGenerator::replying("# Insights");
        let config = no_jitter();
        let generation = GenerationConfig::default();
        let stage = SynthesisStage::new(&generator, &config, &generation);

        let out = stage.synthesize("overview", &[ANALYSIS.to_string()]).await;
        assert_eq!(out, "# Insights");
        let calls = generator.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.starts_with(prompts::SYNTHESIS_TASK));
        assert!(calls[0].prompt.contains(ANALYSIS));
        assert_eq!(calls[0].timeout, config.timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_second_attempt() {
        let generator =
            ScriptedGenerator::replying("# Insights").queue(vec![Err(transport_error())]);
        let config = no_jitter();
        let generation = GenerationConfig::default();
        let stage = SynthesisStage::new(&generator, &config, &generation);

        let out = stage.synthesize("overview", &[ANALYSIS.to_string()]).await;
        assert_eq!(out, "# Insights");
        let calls = generator.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].prompt.contains(ANALYSIS));
        let waited = calls[1].at - calls[0].at;
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_degrades_after_exhausting_retries() {
        let generator = ScriptedGenerator::replying("# Degraded insights").rule(
            ANALYSIS,
            Err(GenerationError::NonSuccessStatus {
                status: 413,
                body: "payload too large".to_string(),
            }),
        );
        let config = no_jitter();
        let generation = GenerationConfig::default();
        let stage = SynthesisStage::new(&generator, &config, &generation);

        let out = stage.synthesize("overview", &[ANALYSIS.to_string()]).await;
        assert_eq!(out, "# Degraded insights");

        let calls = generator.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(generator.prompts_containing(ANALYSIS), 3);
        assert!(!calls[3].prompt.contains(ANALYSIS));
        assert!(calls[3].prompt.contains("# Overview\noverview"));

        // 3 + 6 seconds of backoff before the degraded attempt
        assert!(calls[3].at - calls[0].at >= Duration::from_secs(9));
        assert!(calls[1].at - calls[0].at >= Duration::from_secs(3));
        assert!(calls[2].at - calls[1].at >= Duration::from_secs(6));
        assert!(calls[3].at - calls[2].at < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_total_failure_returns_placeholder() {
        let generator = ScriptedGenerator::failing();
        let config = no_jitter();
        let generation = GenerationConfig::default();
        let stage = SynthesisStage::new(&generator, &config, &generation);

        let out = stage.synthesize("overview", &[]).await;
        assert_eq!(out, prompts::SYNTHESIS_FAILED);
        assert_eq!(generator.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_retry_count_is_honoured() {
        let generator = ScriptedGenerator::failing();
        let config = SynthesisConfig {
            retries: 1,
            ..no_jitter()
        };
        let generation = GenerationConfig::default();
        let stage = SynthesisStage::new(&generator, &config, &generation);

        let out = stage.synthesize("overview", &[ANALYSIS.to_string()]).await;
        assert_eq!(out, prompts::SYNTHESIS_FAILED);
        assert_eq!(generator.call_count(), 2);
    }
}
