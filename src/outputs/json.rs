//! Dated JSON snapshots of each run.
//!
//! One file per day, `{output_dir}/{date}.json`; a second run on the same day
//! overwrites the first. Snapshots older than the retention window are
//! removed by [`prune_reports`].

use crate::outputs::AnalysisReport;
use chrono::{Duration, NaiveDate};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

/// Default number of days a snapshot is kept.
pub const DEFAULT_RETENTION_DAYS: u32 = 60;

/// Write `report` as pretty JSON to `{output_dir}/{date}.json`.
///
/// # Returns
///
/// The path written on success, or an error if directory creation,
/// serialization or writing fails.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, date = %report.date))]
pub async fn write_report(
    report: &AnalysisReport,
    output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(%output_dir, error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = Path::new(output_dir).join(format!("{}.json", report.date));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON report");
    Ok(path)
}

/// Delete `{YYYY-MM-DD}.json` snapshots dated before `today - retention_days`.
///
/// Files whose stem is not a date, and non-JSON files, are left alone. A
/// file that cannot be removed is logged and skipped.
///
/// # Returns
///
/// The number of files removed.
#[instrument(level = "info", skip(output_dir), fields(output_dir = %output_dir))]
pub async fn prune_reports(
    output_dir: &str,
    retention_days: u32,
    today: NaiveDate,
) -> Result<usize, Box<dyn Error>> {
    let cutoff = today - Duration::days(i64::from(retention_days));
    let mut entries = fs::read_dir(output_dir).await?;
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(date) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        else {
            debug!(path = %path.display(), "Not a dated snapshot; skipping");
            continue;
        };
        if date >= cutoff {
            continue;
        }
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), %date, "Removed expired snapshot");
                removed += 1;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove expired snapshot"),
        }
    }

    info!(removed, %cutoff, "Snapshot pruning complete");
    Ok(removed)
}
