use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{summarize, Summary};
use crate::error::ReportError;
use crate::outcome::{CheckStatus, RunReport};

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

/// One check as persisted in `test-report.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeDocument {
    pub name: String,
    pub status: CheckStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Canonical machine-readable report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub schema_version: String,
    pub suite_name: String,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub summary: Summary,
    pub outcomes: Vec<OutcomeDocument>,
}

impl From<&RunReport> for ReportDocument {
    fn from(report: &RunReport) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            suite_name: report.suite_name().to_string(),
            run_id: report.run_id(),
            started_at: report.started_at(),
            ended_at: report.ended_at(),
            summary: summarize(report),
            outcomes: report
                .outcomes()
                .iter()
                .map(|o| OutcomeDocument {
                    name: o.name().to_string(),
                    status: o.status(),
                    duration_ms: o.duration().as_millis() as u64,
                    error: o.error().map(str::to_string),
                })
                .collect(),
        }
    }
}

/// Serialize a report as pretty-printed JSON.
pub fn render_json(report: &RunReport) -> Result<Vec<u8>, ReportError> {
    let mut bytes = serde_json::to_vec_pretty(&ReportDocument::from(report))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse a document previously produced by [`render_json`].
pub fn parse_json(bytes: &[u8]) -> Result<ReportDocument, ReportError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::CheckOutcome;
    use serde_json::{json, Value};
    use std::time::Duration;

    fn sample() -> RunReport {
        let start = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .expect("parse RFC3339")
            .with_timezone(&Utc);
        RunReport::new(
            "Terraform AWS ECS Fargate Service Tests",
            Uuid::nil(),
            start,
            start + chrono::Duration::seconds(2),
            vec![
                CheckOutcome::pass("TestECSServiceCreated", Duration::from_millis(120)),
                CheckOutcome::fail(
                    "TestECSTaskCreated",
                    Duration::from_millis(900),
                    "condition not met after 3 attempt(s): no RUNNING tasks",
                ),
            ],
        )
    }

    #[test]
    fn test_json_schema_has_expected_keys() {
        let raw: Value = serde_json::from_slice(&render_json(&sample()).expect("render"))
            .expect("valid json");
        let obj = raw.as_object().expect("top-level object");
        for key in [
            "schema_version",
            "suite_name",
            "run_id",
            "started_at",
            "ended_at",
            "summary",
            "outcomes",
        ] {
            assert!(obj.contains_key(key), "missing key: {}", key);
        }

        assert_eq!(raw["started_at"], json!("2026-01-01T00:00:00Z"));
        assert_eq!(raw["summary"]["passed"], json!(1));
        assert_eq!(raw["summary"]["failed"], json!(1));
        assert_eq!(raw["summary"]["duration_ms"], json!(2000));
        assert_eq!(raw["outcomes"][0]["status"], json!("PASS"));
        assert!(raw["outcomes"][0].get("error").is_none());
        assert_eq!(raw["outcomes"][1]["duration_ms"], json!(900));
    }

    #[test]
    fn test_json_render_is_deterministic() {
        let report = sample();
        assert_eq!(
            render_json(&report).expect("first"),
            render_json(&report).expect("second")
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_json(b"not json"),
            Err(ReportError::Serialize(_))
        ));
    }
}
