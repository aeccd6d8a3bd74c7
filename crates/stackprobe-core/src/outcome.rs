//! Outcome model: per-check results and the frozen run report.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal classification of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skip,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skip => "SKIP",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single named check.
///
/// Built only through [`CheckOutcome::pass`], [`CheckOutcome::fail`] and
/// [`CheckOutcome::skip`], so `error` is present exactly when the status is
/// [`CheckStatus::Fail`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    name: String,
    status: CheckStatus,
    duration: Duration,
    error: Option<String>,
}

impl CheckOutcome {
    pub fn pass(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Pass,
            duration,
            error: None,
        }
    }

    pub fn fail(name: impl Into<String>, duration: Duration, error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.is_empty() {
            "check failed without a message".to_string()
        } else {
            error
        };
        Self {
            name: name.into(),
            status: CheckStatus::Fail,
            duration,
            error: Some(error),
        }
    }

    pub fn skip(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Skip,
            duration,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> CheckStatus {
        self.status
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Everything captured during one run of a suite.
///
/// Immutable once built; [`RunRecorder`] is the only way to grow one during
/// execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    suite_name: String,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    outcomes: Vec<CheckOutcome>,
}

impl RunReport {
    /// Assemble a report from already-captured parts.
    ///
    /// `ended_at` is clamped so it never precedes `started_at`.
    pub fn new(
        suite_name: impl Into<String>,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        outcomes: Vec<CheckOutcome>,
    ) -> Self {
        Self {
            suite_name: suite_name.into(),
            run_id,
            started_at,
            ended_at: ended_at.max(started_at),
            outcomes,
        }
    }

    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    pub fn outcomes(&self) -> &[CheckOutcome] {
        &self.outcomes
    }

    /// Look up an outcome by check name.
    pub fn outcome(&self, name: &str) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Wall-clock time between run start and end.
    pub fn elapsed(&self) -> Duration {
        (self.ended_at - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.status == CheckStatus::Fail)
    }
}

/// Accumulates outcomes while a run is in progress.
#[derive(Debug)]
pub struct RunRecorder {
    suite_name: String,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    outcomes: Vec<CheckOutcome>,
}

impl RunRecorder {
    /// Open a new run, stamping `started_at` with the current time.
    pub fn start(suite_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            outcomes: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn record(&mut self, outcome: CheckOutcome) {
        self.outcomes.push(outcome);
    }

    /// Freeze the run with `ended_at = now`.
    pub fn finish(self) -> RunReport {
        RunReport::new(
            self.suite_name,
            self.run_id,
            self.started_at,
            Utc::now(),
            self.outcomes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_present_only_for_failures() {
        let pass = CheckOutcome::pass("a", Duration::from_millis(5));
        let skip = CheckOutcome::skip("b", Duration::from_millis(5));
        let fail = CheckOutcome::fail("c", Duration::from_millis(5), "boom");

        assert!(pass.error().is_none());
        assert!(skip.error().is_none());
        assert_eq!(fail.error(), Some("boom"));
        assert_eq!(fail.status(), CheckStatus::Fail);
    }

    #[test]
    fn test_fail_with_empty_message_keeps_error_text() {
        let fail = CheckOutcome::fail("c", Duration::ZERO, "");
        assert!(!fail.error().unwrap_or_default().is_empty());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&CheckStatus::Skip).expect("serialize");
        assert_eq!(json, "\"SKIP\"");
        assert_eq!(CheckStatus::Pass.to_string(), "PASS");
    }

    #[test]
    fn test_report_clamps_end_before_start() {
        let start = Utc::now();
        let end = start - chrono::Duration::seconds(5);
        let report = RunReport::new("suite", Uuid::new_v4(), start, end, vec![]);
        assert_eq!(report.ended_at(), report.started_at());
        assert_eq!(report.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_recorder_preserves_order() {
        let mut recorder = RunRecorder::start("suite");
        recorder.record(CheckOutcome::pass("first", Duration::ZERO));
        recorder.record(CheckOutcome::skip("second", Duration::ZERO));
        let report = recorder.finish();

        let names: Vec<&str> = report.outcomes().iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(report.ended_at() >= report.started_at());
        assert!(report.outcome("second").is_some());
    }
}
