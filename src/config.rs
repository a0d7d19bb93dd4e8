//! Process-wide configuration for the analysis pipeline.
//!
//! [`AnalystConfig`] is loaded once at start-up from an optional YAML file,
//! adjusted by CLI overrides, validated, and then passed by reference into
//! every component. Nothing reads it from global state.
//!
//! # Example
//!
//! ```yaml
//! generation:
//!   model: deepseek-chat
//!   api_key: ENV          # read AI_API_KEY
//! search:
//!   api_key: ENV          # read TAVILY_API_KEY; leave empty to disable
//! synthesis:
//!   retries: 3
//!   base_delay_secs: 3
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Sentinel meaning "resolve this key from the environment".
const ENV_SENTINEL: &str = "ENV";

/// Upper bound for both the extraction cap and the deep-dive fan-out width.
pub const MAX_KEY_EVENTS: usize = 3;

/// Top-level configuration, one section per pipeline component.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalystConfig {
    pub generation: GenerationConfig,
    pub extraction: ExtractionConfig,
    pub deep_dive: DeepDiveConfig,
    pub search: SearchConfig,
    pub synthesis: SynthesisConfig,
}

/// Chat-completion endpoint settings shared by every generation call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub model: String,
    /// Bearer token, or `ENV` to read `AI_API_KEY`.
    pub api_key: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub system_prompt: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.deepseek.com/v1/chat/completions".to_string(),
            model: "deepseek-chat".to_string(),
            api_key: ENV_SENTINEL.to_string(),
            max_tokens: 4096,
            timeout_secs: 90,
            system_prompt: "You are a professional news analyst.".to_string(),
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Key-event extraction thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Literal text a heading must contain to open the key-events section.
    pub heading_marker: String,
    pub bullet_markers: Vec<String>,
    /// Candidates must be strictly longer than this many characters.
    pub min_event_chars: usize,
    pub max_events: usize,
    pub ai_max_tokens: u32,
    pub ai_timeout_secs: u64,
    /// Characters of the summary forwarded to the AI extraction prompt.
    pub ai_input_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            heading_marker: "Key Events".to_string(),
            bullet_markers: ["- ", "• ", "· ", "* "]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            min_event_chars: 10,
            max_events: 3,
            ai_max_tokens: 300,
            ai_timeout_secs: 60,
            ai_input_chars: 4000,
        }
    }
}

impl ExtractionConfig {
    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeepDiveConfig {
    /// Fan-out width: events beyond this many are ignored.
    pub max_events: usize,
    /// Characters of each search snippet embedded in the prompt.
    pub snippet_chars: usize,
}

impl Default for DeepDiveConfig {
    fn default() -> Self {
        Self {
            max_events: 3,
            snippet_chars: 200,
        }
    }
}

/// Web-search enrichment. An empty key disables the capability.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    /// API key, or `ENV` to read `TAVILY_API_KEY`.
    pub api_key: String,
    pub max_results: u32,
    pub depth: String,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.tavily.com/search".to_string(),
            api_key: ENV_SENTINEL.to_string(),
            max_results: 5,
            depth: "advanced".to_string(),
            timeout_secs: 20,
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Retry policy of the synthesis stage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Attempts against the full prompt before degrading.
    pub retries: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    /// Upper bound of the random jitter added to each backoff.
    pub jitter_ms: u64,
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay_secs: 3,
            max_delay_secs: 60,
            jitter_ms: 250,
            timeout_secs: 120,
        }
    }
}

impl SynthesisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AnalystConfig {
    /// Load configuration from a YAML file, or the defaults when `path` is `None`.
    ///
    /// `ENV` placeholders are resolved afterwards; call [`AnalystConfig::validate`]
    /// once CLI overrides have been applied.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(Path::new(p)).map_err(|source| {
                    ConfigError::Read {
                        path: p.to_string(),
                        source,
                    }
                })?;
                let parsed = Self::from_yaml(&raw)?;
                info!(config_path = p, "Loaded configuration");
                parsed
            }
            None => {
                info!("No config file given; using defaults");
                Self::default()
            }
        };
        config.resolve_env_keys(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse a YAML document. An empty document yields the defaults.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Replace `ENV` placeholders using `lookup`. A missing variable leaves the key empty,
    /// which disables search and makes generation calls fail with an auth status.
    pub fn resolve_env_keys<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.generation.api_key.trim().eq_ignore_ascii_case(ENV_SENTINEL) {
            self.generation.api_key = lookup("AI_API_KEY").unwrap_or_default();
        }
        if self.search.api_key.trim().eq_ignore_ascii_case(ENV_SENTINEL) {
            self.search.api_key = lookup("TAVILY_API_KEY").unwrap_or_default();
        }
        debug!(
            generation_key_set = !self.generation.api_key.is_empty(),
            search_enabled = self.search.is_enabled(),
            "Resolved API keys"
        );
    }

    /// Check endpoints, timeouts and event caps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_endpoint("generation.endpoint", &self.generation.endpoint)?;
        check_endpoint("search.endpoint", &self.search.endpoint)?;

        let timeouts = [
            ("generation.timeout_secs", self.generation.timeout_secs),
            ("extraction.ai_timeout_secs", self.extraction.ai_timeout_secs),
            ("search.timeout_secs", self.search.timeout_secs),
            ("synthesis.timeout_secs", self.synthesis.timeout_secs),
        ];
        for (name, secs) in timeouts {
            if secs == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
            }
        }
        if self.extraction.bullet_markers.is_empty() {
            return Err(ConfigError::Invalid(
                "extraction.bullet_markers must not be empty".to_string(),
            ));
        }

        let caps = [
            ("extraction.max_events", self.extraction.max_events),
            ("deep_dive.max_events", self.deep_dive.max_events),
        ];
        for (name, cap) in caps {
            if !(1..=MAX_KEY_EVENTS).contains(&cap) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 1 and {MAX_KEY_EVENTS}, got {cap}"
                )));
            }
        }
        Ok(())
    }
}

fn check_endpoint(name: &str, raw: &str) -> Result<(), ConfigError> {
    let parsed =
        Url::parse(raw).map_err(|e| ConfigError::Invalid(format!("{name} ({raw}): {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid(format!(
            "{name} must use http or https, got {other}"
        ))),
    }
}
