//! Structured observability hooks for run, check, poll and stack lifecycle
//! events.
//!
//! Events are emitted at `info!` level with an `event` field so they can be
//! filtered and aggregated. For JSON output, pass `json = true` to
//! [`crate::init_tracing`].

use tracing::{info, warn};

/// RAII guard that enters a suite-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = RunSpan::enter("Terraform AWS ECS Fargate Service Tests");
/// // stack apply/destroy logs are now tagged with the suite name
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Enter a `stackprobe.suite` span tagged with `suite`.
    pub fn enter(suite: &str) -> Self {
        let span = tracing::info_span!("stackprobe.suite", suite = %suite);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a run started.
pub fn emit_run_started(run_id: &str, suite: &str, checks: usize) {
    info!(event = "run.started", run_id = %run_id, suite = %suite, checks = checks);
}

/// Emit event: a run finished with its totals.
pub fn emit_run_finished(run_id: &str, total: usize, failed: usize, duration_ms: u64) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        total = total,
        failed = failed,
        duration_ms = duration_ms,
    );
}

/// Emit event: a check started.
pub fn emit_check_started(name: &str) {
    info!(event = "check.started", check = %name);
}

/// Emit event: a check finished, with its error when it failed.
pub fn emit_check_finished(name: &str, status: &str, duration_ms: u64, error: Option<&str>) {
    match error {
        Some(error) => info!(
            event = "check.finished",
            check = %name,
            status = %status,
            duration_ms = duration_ms,
            error = %error,
        ),
        None => info!(
            event = "check.finished",
            check = %name,
            status = %status,
            duration_ms = duration_ms,
        ),
    }
}

/// Emit event: a probe attempt did not converge yet.
pub fn emit_poll_attempt(label: &str, attempt: u32, max_attempts: u32, reason: &str) {
    info!(
        event = "poll.attempt",
        poll = %label,
        attempt = attempt,
        max_attempts = max_attempts,
        reason = %reason,
    );
}

/// Emit event: a convergence wait ended.
pub fn emit_poll_finished(label: &str, outcome: &str, attempts: u32) {
    info!(event = "poll.finished", poll = %label, outcome = %outcome, attempts = attempts);
}

/// Emit event: a report file was written.
pub fn emit_report_written(format: &str, path: &std::path::Path) {
    info!(event = "report.written", format = %format, path = %path.display());
}

/// Emit event: the stack guard entered a phase.
pub fn emit_stack_phase(phase: &str) {
    info!(event = "stack.phase", phase = %phase);
}

/// Emit event: teardown failed (warning level).
pub fn emit_teardown_error(error: &dyn std::fmt::Display) {
    warn!(event = "stack.teardown_error", error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_enter_and_drop() {
        let span = RunSpan::enter("suite");
        drop(span);
    }

    #[test]
    fn test_emitters_do_not_panic_without_subscriber() {
        emit_run_started("run-1", "suite", 3);
        emit_check_started("TestA");
        emit_check_finished("TestA", "FAIL", 12, Some("boom"));
        emit_check_finished("TestB", "PASS", 3, None);
        emit_poll_attempt("tasks", 1, 30, "no RUNNING tasks");
        emit_poll_finished("tasks", "converged", 2);
        emit_report_written("json", std::path::Path::new("test-report.json"));
        emit_stack_phase("apply");
        emit_teardown_error(&"destroy failed");
        emit_run_finished("run-1", 3, 1, 250);
    }
}
