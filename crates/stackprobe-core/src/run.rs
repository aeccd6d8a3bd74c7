//! Run aggregator: executes a suite sequentially and captures one outcome
//! per check.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use tracing::Instrument;

use crate::check::{Check, Suite};
use crate::error::CheckError;
use crate::obs::{emit_check_finished, emit_check_started, emit_run_finished, emit_run_started};
use crate::outcome::{CheckOutcome, RunRecorder, RunReport};

/// Prefix marking failures recovered from a panic inside a check.
pub const PANIC_PREFIX: &str = "Panic: ";

/// Sequential suite executor.
pub struct RunAggregator;

impl RunAggregator {
    /// Execute every check in `suite` against `ctx`, in order.
    ///
    /// A failing or panicking check never stops the run; its outcome is
    /// recorded and execution moves on to the next check.
    pub async fn run<C: Sync>(suite: &Suite<C>, ctx: &C) -> RunReport {
        let mut recorder = RunRecorder::start(suite.name());
        let run_id = recorder.run_id().to_string();
        let span = tracing::info_span!("stackprobe.run", suite = %suite.name(), run_id = %run_id);

        async {
            emit_run_started(&run_id, suite.name(), suite.len());

            for named in suite.checks() {
                emit_check_started(named.name());
                let outcome = execute_check(named.name(), named.check(), ctx).await;
                emit_check_finished(
                    outcome.name(),
                    outcome.status().as_str(),
                    outcome.duration().as_millis() as u64,
                    outcome.error(),
                );
                recorder.record(outcome);
            }

            let report = recorder.finish();
            let failed = report.outcomes().iter().filter(|o| o.error().is_some()).count();
            emit_run_finished(
                &run_id,
                report.outcomes().len(),
                failed,
                report.elapsed().as_millis() as u64,
            );
            report
        }
        .instrument(span)
        .await
    }
}

/// The single boundary where check errors and panics become outcomes.
async fn execute_check<C: Sync>(name: &str, check: &dyn Check<C>, ctx: &C) -> CheckOutcome {
    let start = Instant::now();
    let result = AssertUnwindSafe(check.run(ctx)).catch_unwind().await;
    let duration = start.elapsed();

    match result {
        Ok(Ok(())) => CheckOutcome::pass(name, duration),
        Ok(Err(CheckError::Skipped(reason))) => {
            tracing::info!(check = %name, reason = %reason, "check skipped");
            CheckOutcome::skip(name, duration)
        }
        Ok(Err(err)) => CheckOutcome::fail(name, duration, err.to_string()),
        Err(payload) => CheckOutcome::fail(
            name,
            duration,
            format!("{}{}", PANIC_PREFIX, panic_message(payload.as_ref())),
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_handles_common_payloads() {
        let static_str: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(42u8);

        assert_eq!(panic_message(static_str.as_ref()), "static");
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "unknown panic payload");
    }
}
