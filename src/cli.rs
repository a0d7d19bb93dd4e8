//! Command-line interface definitions for Daily Brief.
//!
//! API keys and the model can come from flags or environment variables and
//! take precedence over the config file.

use crate::config::AnalystConfig;
use crate::outputs::json::DEFAULT_RETENTION_DAYS;
use clap::Parser;

/// Command-line arguments for the Daily Brief application.
///
/// # Examples
///
/// ```sh
/// # Basic usage with defaults for everything else
/// daily_brief --news ./news.json -o ./out
///
/// # With a config file and a shorter retention window
/// daily_brief --news ./news.json -o ./out -c ./analyst.yaml --retention-days 14
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// JSON file holding an array of news items (only `title` is read)
    #[arg(short, long)]
    pub news: String,

    /// Output directory for the JSON snapshots and Markdown reports
    #[arg(short, long)]
    pub output_dir: String,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Days to keep dated JSON snapshots
    #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS)]
    pub retention_days: u32,

    /// API key for the chat-completion endpoint
    #[arg(long, env = "AI_API_KEY", hide_env_values = true)]
    pub ai_api_key: Option<String>,

    /// Tavily API key; search enrichment is disabled without one
    #[arg(long, env = "TAVILY_API_KEY", hide_env_values = true)]
    pub tavily_api_key: Option<String>,

    /// Model name override
    #[arg(long)]
    pub model: Option<String>,
}

impl Cli {
    /// Apply flag values over the loaded configuration.
    pub fn apply_overrides(&self, config: &mut AnalystConfig) {
        if let Some(key) = self.ai_api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            config.generation.api_key = key.clone();
        }
        if let Some(key) = self.tavily_api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            config.search.api_key = key.clone();
        }
        if let Some(model) = &self.model {
            config.generation.model = model.clone();
        }
    }
}
