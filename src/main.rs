//! # Daily Brief
//!
//! Turns a day's batch of news headlines into a three-stage analytical brief
//! using an OpenAI-compatible chat-completion endpoint, optionally enriched
//! with web search.
//!
//! ## Usage
//!
//! ```sh
//! daily_brief --news ./news.json -o ./out
//! ```
//!
//! ## Architecture
//!
//! 1. **Overview**: One call over every headline, with a key-events section
//! 2. **Extraction**: Key events parsed from the overview, AI fallback if needed
//! 3. **Deep dives**: Up to three events analysed concurrently, search-enriched
//! 4. **Synthesis**: Retried with backoff, degraded prompt as a last resort
//! 5. **Output**: Dated JSON snapshot and Markdown report, old snapshots pruned
//!
//! A failing stage never aborts the run; it contributes a placeholder text.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analysis;
mod api;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod search;
#[cfg(test)]
mod test_support;
mod utils;

use analysis::pipeline::Pipeline;
use api::ChatCompletionClient;
use cli::Cli;
use config::AnalystConfig;
use models::NewsItem;
use outputs::{AnalysisReport, json, markdown};
use search::SearchBackend;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("daily_brief starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(news = %args.news, output_dir = %args.output_dir, config = ?args.config, "Parsed CLI arguments");

    // ---- Load config ----
    let mut config = AnalystConfig::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }
    info!(
        model = %config.generation.model,
        search_enabled = config.search.is_enabled(),
        retries = config.synthesis.retries,
        "Configuration ready"
    );

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Read news ----
    let raw = tokio::fs::read_to_string(&args.news).await.map_err(|e| {
        error!(path = %args.news, error = %e, "Failed to read news file");
        e
    })?;
    let news: Vec<NewsItem> = serde_json::from_str(&raw)?;
    info!(count = news.len(), path = %args.news, "Loaded news items");

    // ---- Collaborators ----
    let generator = ChatCompletionClient::new(&config.generation)?;
    let search = SearchBackend::from_config(&config.search);
    debug!(?generator, ?search, "Built collaborators");

    // ---- Run ----
    let result = Pipeline::new(&generator, &search, &config).run(&news).await;

    // ---- Outputs ----
    let report = AnalysisReport::from_result(result, news.len(), Local::now());

    if let Err(e) = json::write_report(&report, &args.output_dir).await {
        error!(error = %e, "Failed to write JSON report");
    }
    if let Err(e) = markdown::write_report(&report, &args.output_dir).await {
        error!(error = %e, "Failed to write Markdown report");
    }

    match json::prune_reports(&args.output_dir, args.retention_days, Local::now().date_naive()).await
    {
        Ok(removed) => debug!(removed, "Pruned old snapshots"),
        Err(e) => warn!(error = %e, "Failed to prune old snapshots"),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        analyses = report.stage_two.len(),
        "Execution complete"
    );

    Ok(())
}
