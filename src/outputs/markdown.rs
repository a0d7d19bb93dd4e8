//! Markdown rendering of an [`AnalysisReport`].
//!
//! Stage texts are already markdown; headings inside them are kept as-is and
//! nest under the section headings added here.

use crate::outputs::AnalysisReport;
use std::error::Error;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Convert a report to a single markdown document.
pub fn report_to_markdown(report: &AnalysisReport) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# Daily Brief: {}\n", report.date);
    let _ = writeln!(md, "- Generated: {}", report.timestamp);
    let _ = writeln!(md, "- News items: {}", report.news_count);
    let _ = writeln!(md, "- Key events analysed: {}\n", report.stage_two.len());

    let _ = writeln!(md, "## Summary\n");
    let _ = writeln!(md, "{}\n", report.stage_one.trim());

    let _ = writeln!(md, "## Deep Dives\n");
    if report.stage_two.is_empty() {
        let _ = writeln!(md, "No key events were analysed.\n");
    }
    for (i, analysis) in report.stage_two.iter().enumerate() {
        let _ = writeln!(md, "### Event {}\n", i + 1);
        let _ = writeln!(md, "{}\n", analysis.trim());
    }

    let _ = writeln!(md, "## Insights\n");
    let _ = writeln!(md, "{}", report.stage_three.trim());

    md
}

/// Write the markdown rendering to `{output_dir}/reports/{date}.md`.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, date = %report.date))]
pub async fn write_report(
    report: &AnalysisReport,
    output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let reports_dir = Path::new(output_dir).join("reports");
    fs::create_dir_all(&reports_dir).await?;

    let path = reports_dir.join(format!("{}.md", report.date));
    fs::write(&path, report_to_markdown(report)).await?;
    info!(path = %path.display(), "Wrote Markdown report");
    Ok(path)
}
