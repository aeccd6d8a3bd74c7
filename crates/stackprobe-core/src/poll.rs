//! Convergence poller.
//!
//! Repeatedly invokes a probe against an eventually-consistent system until
//! it reports success, a fatal error, or the [`PollPolicy`] runs out of
//! attempts or time. The poller knows nothing about what is probed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, TokioClock};
use crate::error::{PollError, ResourceError};
use crate::obs::{emit_poll_attempt, emit_poll_finished};

/// Result of one probe invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult<T> {
    /// The condition holds.
    Success(T),
    /// Not yet; try again after the interval.
    Retryable(String),
    /// Retrying cannot help.
    Fatal(String),
}

impl<T> ProbeResult<T> {
    /// Not converged yet; try again after the interval.
    pub fn retryable(reason: impl Into<String>) -> Self {
        ProbeResult::Retryable(reason.into())
    }

    /// Stop polling immediately.
    pub fn fatal(error: impl Into<String>) -> Self {
        ProbeResult::Fatal(error.into())
    }
}

impl<T> From<ResourceError> for ProbeResult<T> {
    fn from(err: ResourceError) -> Self {
        if err.is_retryable() {
            ProbeResult::Retryable(err.to_string())
        } else {
            ProbeResult::Fatal(err.to_string())
        }
    }
}

/// Retry policy for one convergence wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Upper bound on probe invocations. Zero is treated as one.
    pub max_attempts: u32,
    /// Sleep between attempts.
    pub interval: Duration,
    /// Stop before starting an attempt once this much time has elapsed.
    pub overall_timeout: Option<Duration>,
}

impl PollPolicy {
    /// Policy with `max_attempts` (at least one is always made) spaced by `interval`.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            overall_timeout: None,
        }
    }

    /// Give up once `timeout` has elapsed, checked before each retry.
    pub fn with_overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = Some(timeout);
        self
    }

    fn attempt_limit(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(30, Duration::from_secs(10))
    }
}

/// How a convergence wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Converged {
        value: T,
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
        last_reason: String,
    },
    TimedOut {
        attempts: u32,
        elapsed: Duration,
        last_reason: String,
    },
    Fatal {
        attempt: u32,
        error: String,
    },
}

impl<T> PollOutcome<T> {
    /// Probe invocations consumed.
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Converged { attempts, .. }
            | PollOutcome::Exhausted { attempts, .. }
            | PollOutcome::TimedOut { attempts, .. } => *attempts,
            PollOutcome::Fatal { attempt, .. } => *attempt,
        }
    }

    /// Whether the probe reported success.
    pub fn is_converged(&self) -> bool {
        matches!(self, PollOutcome::Converged { .. })
    }

    fn kind(&self) -> &'static str {
        match self {
            PollOutcome::Converged { .. } => "converged",
            PollOutcome::Exhausted { .. } => "exhausted",
            PollOutcome::TimedOut { .. } => "timed_out",
            PollOutcome::Fatal { .. } => "fatal",
        }
    }

    /// Treat anything but convergence as an error.
    pub fn into_result(self) -> Result<T, PollError> {
        match self {
            PollOutcome::Converged { value, .. } => Ok(value),
            PollOutcome::Exhausted {
                attempts,
                last_reason,
            } => Err(PollError::Exhausted {
                attempts,
                last_reason,
            }),
            PollOutcome::TimedOut {
                attempts,
                elapsed,
                last_reason,
            } => Err(PollError::TimedOut {
                attempts,
                elapsed,
                last_reason,
            }),
            PollOutcome::Fatal { attempt, error } => Err(PollError::Fatal { attempt, error }),
        }
    }
}

/// Drives a probe under a [`PollPolicy`].
#[derive(Clone)]
pub struct Poller {
    label: String,
    clock: Arc<dyn Clock>,
}

impl Poller {
    /// Poller on real time.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_clock(label, Arc::new(TokioClock))
    }

    pub fn with_clock(label: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            label: label.into(),
            clock,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Invoke `probe` until it succeeds or the policy is exhausted.
    ///
    /// At least one attempt is always made. A `Fatal` result stops
    /// immediately; the interval is never slept after the final attempt.
    pub async fn poll<T, F, Fut>(&self, policy: &PollPolicy, mut probe: F) -> PollOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeResult<T>>,
    {
        let max_attempts = policy.attempt_limit();
        let started = self.clock.now();
        let mut last_reason = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                if let Some(limit) = policy.overall_timeout {
                    let elapsed = self.clock.now().saturating_duration_since(started);
                    if elapsed > limit {
                        let outcome = PollOutcome::TimedOut {
                            attempts: attempt - 1,
                            elapsed,
                            last_reason,
                        };
                        emit_poll_finished(&self.label, outcome.kind(), outcome.attempts());
                        return outcome;
                    }
                }
            }

            match probe().await {
                ProbeResult::Success(value) => {
                    emit_poll_finished(&self.label, "converged", attempt);
                    return PollOutcome::Converged {
                        value,
                        attempts: attempt,
                    };
                }
                ProbeResult::Fatal(error) => {
                    emit_poll_finished(&self.label, "fatal", attempt);
                    return PollOutcome::Fatal { attempt, error };
                }
                ProbeResult::Retryable(reason) => {
                    emit_poll_attempt(&self.label, attempt, max_attempts, &reason);
                    last_reason = reason;
                    if attempt < max_attempts {
                        self.clock.sleep(policy.interval).await;
                    }
                }
            }
        }

        emit_poll_finished(&self.label, "exhausted", max_attempts);
        PollOutcome::Exhausted {
            attempts: max_attempts,
            last_reason,
        }
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller").field("label", &self.label).finish()
    }
}
