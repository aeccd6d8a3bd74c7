//! Report builder: run summaries and their durable renderings.
//!
//! Provides three renderings of a frozen [`RunReport`]:
//! - JSON (`test-report.json`): stable field names for downstream diffing
//! - HTML (`test-report.html`): self-contained, failures highlighted
//! - console text: log-only convenience output
//!
//! All renderings are pure functions of the report, so the same report
//! always yields byte-identical output.

mod console;
mod html;
mod json;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::obs::emit_report_written;
use crate::outcome::{CheckStatus, RunReport};

pub use console::render_console;
pub use html::render_html;
pub use json::{parse_json, render_json, OutcomeDocument, ReportDocument, REPORT_SCHEMA_VERSION};

/// Default path for the machine-readable report.
pub const DEFAULT_JSON_REPORT: &str = "test-report.json";

/// Default path for the human-readable report.
pub const DEFAULT_HTML_REPORT: &str = "test-report.html";

/// A failing check and its error text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedCheck {
    pub name: String,
    pub error: String,
}

/// Derived statistics over a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// `passed / (passed + failed)`; skips are excluded, `0.0` when nothing
    /// passed or failed.
    pub pass_rate: f64,
    /// Wall-clock run time in milliseconds.
    pub duration_ms: u64,
    pub failures: Vec<FailedCheck>,
}

impl Summary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Compute counts, pass rate and failure list for a report.
pub fn summarize(report: &RunReport) -> Summary {
    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;
    let mut failures = Vec::new();

    for outcome in report.outcomes() {
        match outcome.status() {
            CheckStatus::Pass => passed += 1,
            CheckStatus::Skip => skipped += 1,
            CheckStatus::Fail => {
                failed += 1;
                failures.push(FailedCheck {
                    name: outcome.name().to_string(),
                    error: outcome.error().unwrap_or_default().to_string(),
                });
            }
        }
    }

    let decided = passed + failed;
    let pass_rate = if decided == 0 {
        0.0
    } else {
        passed as f64 / decided as f64
    };

    Summary {
        total: report.outcomes().len(),
        passed,
        failed,
        skipped,
        pass_rate,
        duration_ms: report.elapsed().as_millis() as u64,
        failures,
    }
}

/// Output formats supported by [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    Json,
    Html,
    Console,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
            ReportFormat::Console => "console",
        }
    }
}

/// Render a report into bytes.
pub fn render(report: &RunReport, format: ReportFormat) -> Result<Vec<u8>, ReportError> {
    match format {
        ReportFormat::Json => render_json(report),
        ReportFormat::Html => Ok(render_html(report).into_bytes()),
        ReportFormat::Console => Ok(render_console(report).into_bytes()),
    }
}

/// Immutable report settings, resolved once from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// Whether report files are written at all.
    pub enabled: bool,
    pub json_path: PathBuf,
    pub html_path: PathBuf,
}

impl ReportConfig {
    pub fn new(enabled: bool, json_path: impl Into<PathBuf>, html_path: impl Into<PathBuf>) -> Self {
        Self {
            enabled,
            json_path: json_path.into(),
            html_path: html_path.into(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self::new(false, DEFAULT_JSON_REPORT, DEFAULT_HTML_REPORT)
    }
}

/// Write the JSON and HTML reports, overwriting existing files.
///
/// Returns the paths written; empty when reporting is disabled.
pub fn write_reports(config: &ReportConfig, report: &RunReport) -> Result<Vec<PathBuf>, ReportError> {
    if !config.enabled {
        return Ok(Vec::new());
    }

    let targets = [
        (ReportFormat::Json, config.json_path.as_path()),
        (ReportFormat::Html, config.html_path.as_path()),
    ];

    let mut written = Vec::with_capacity(targets.len());
    for (format, path) in targets {
        let bytes = render(report, format)?;
        write_file(path, &bytes)?;
        emit_report_written(format.as_str(), path);
        written.push(path.to_path_buf());
    }
    Ok(written)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, bytes).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::CheckOutcome;
    use chrono::{DateTime, Utc};
    use std::time::Duration;
    use uuid::Uuid;

    fn report_with(outcomes: Vec<CheckOutcome>) -> RunReport {
        let start = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .expect("parse RFC3339")
            .with_timezone(&Utc);
        RunReport::new(
            "suite",
            Uuid::nil(),
            start,
            start + chrono::Duration::milliseconds(1500),
            outcomes,
        )
    }

    #[test]
    fn test_summary_counts_and_pass_rate_exclude_skips() {
        let report = report_with(vec![
            CheckOutcome::pass("a", Duration::from_millis(10)),
            CheckOutcome::fail("b", Duration::from_millis(10), "boom"),
            CheckOutcome::skip("c", Duration::from_millis(10)),
            CheckOutcome::pass("d", Duration::from_millis(10)),
        ]);

        let summary = summarize(&report);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed + summary.failed + summary.skipped, summary.total);
        assert!((summary.pass_rate - 2.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(summary.duration_ms, 1500);
        assert_eq!(
            summary.failures,
            vec![FailedCheck {
                name: "b".to_string(),
                error: "boom".to_string()
            }]
        );
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_pass_rate_zero_when_only_skips() {
        let report = report_with(vec![CheckOutcome::skip("a", Duration::ZERO)]);
        let summary = summarize(&report);
        assert_eq!(summary.pass_rate, 0.0);
        assert!(summary.all_passed());
    }

    #[test]
    fn test_disabled_config_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ReportConfig::new(
            false,
            dir.path().join("r.json"),
            dir.path().join("r.html"),
        );
        let written = write_reports(&config, &report_with(vec![])).expect("write");
        assert!(written.is_empty());
        assert!(!dir.path().join("r.json").exists());
    }

    #[test]
    fn test_write_reports_creates_parent_dirs_and_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let json_path = dir.path().join("out/nested/report.json");
        let html_path = dir.path().join("out/report.html");
        std::fs::create_dir_all(dir.path().join("out")).expect("mkdir");
        std::fs::write(&html_path, "stale").expect("seed stale file");

        let config = ReportConfig::new(true, &json_path, &html_path);
        let written = write_reports(
            &config,
            &report_with(vec![CheckOutcome::pass("a", Duration::ZERO)]),
        )
        .expect("write");

        assert_eq!(written, vec![json_path.clone(), html_path.clone()]);
        let html = std::fs::read_to_string(&html_path).expect("read html");
        assert!(!html.contains("stale"));
        assert!(json_path.exists());
    }

    #[test]
    fn test_write_failure_is_report_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory cannot be overwritten as a file.
        let config = ReportConfig::new(true, dir.path(), dir.path().join("r.html"));
        let err = write_reports(&config, &report_with(vec![])).expect_err("should fail");
        assert!(matches!(err, ReportError::Io { .. }));
    }
}
