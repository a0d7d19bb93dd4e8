//! Report outputs written by the binary after a pipeline run.
//!
//! # Submodules
//!
//! - [`json`]: Dated JSON snapshots, plus pruning of old ones
//! - [`markdown`]: A readable markdown rendering of the report
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 2026-10-13.json
//! ├── 2026-10-14.json
//! └── reports/
//!     ├── 2026-10-13.md
//!     └── 2026-10-14.md
//! ```

pub mod json;
pub mod markdown;

use crate::models::PipelineResult;
use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};

/// A pipeline result stamped with when and over how many items it ran.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnalysisReport {
    /// Local date, `YYYY-MM-DD`; also the file stem of both outputs.
    pub date: String,
    /// RFC 3339 local timestamp of report creation.
    pub timestamp: String,
    pub news_count: usize,
    pub stage_one: String,
    pub stage_two: Vec<String>,
    pub stage_three: String,
}

impl AnalysisReport {
    pub fn from_result(result: PipelineResult, news_count: usize, now: DateTime<Local>) -> Self {
        Self {
            date: now.date_naive().to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, false),
            news_count,
            stage_one: result.stage_one,
            stage_two: result.stage_two,
            stage_three: result.stage_three,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_report(date: &str) -> AnalysisReport {
    AnalysisReport {
        date: date.to_string(),
        timestamp: format!("{date}T07:30:00+00:00"),
        news_count: 42,
        stage_one: "# Daily Overview\n\n## Key Events\n- Central bank cuts its policy rate".to_string(),
        stage_two: vec!["# Rate cut".to_string(), "# Chip launch".to_string()],
        stage_three: "## Insight\nEasing continues.".to_string(),
    }
}
