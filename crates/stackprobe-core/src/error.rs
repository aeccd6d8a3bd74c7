//! Error taxonomy for stack validation runs.
//!
//! Check-level errors ([`CheckError`]) never escape the run aggregator; they
//! are converted into outcomes. Only [`HarnessError`] reaches the process
//! exit code.

use std::path::PathBuf;
use std::time::Duration;

/// Terminal failure of a convergence wait.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("condition not met after {attempts} attempt(s): {last_reason}")]
    Exhausted { attempts: u32, last_reason: String },

    #[error("timed out after {elapsed:?} ({attempts} attempt(s)): {last_reason}")]
    TimedOut {
        attempts: u32,
        elapsed: Duration,
        last_reason: String,
    },

    #[error("fatal error on attempt {attempt}: {error}")]
    Fatal { attempt: u32, error: String },
}

/// Errors raised by the provisioning collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("stack output not found: {key}")]
    OutputNotFound { key: String },

    #[error("`{command}` failed with exit code {code:?}: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("`{command}` did not succeed: {source}")]
    Retries {
        command: String,
        #[source]
        source: PollError,
    },

    #[error("failed to parse provisioner output: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by resource-description queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("client unavailable: {0}")]
    Client(String),
}

impl ResourceError {
    /// Whether retrying the same query may succeed later.
    ///
    /// Missing resources are retryable because descriptions are eventually
    /// consistent right after provisioning.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResourceError::NotFound(_) | ResourceError::Transport(_))
    }
}

/// Reasons a single check did not pass.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("{0}")]
    Assertion(String),

    #[error("skipped: {0}")]
    Skipped(String),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Errors writing report artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Harness-level failures, distinct from check failures.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("duplicate check name in suite: {0}")]
    DuplicateCheck(String),

    #[error("stack setup failed: {0}")]
    Setup(#[source] ProvisionError),

    #[error("stack teardown failed: {0}")]
    Teardown(#[source] ProvisionError),

    #[error(transparent)]
    Report(#[from] ReportError),
}
