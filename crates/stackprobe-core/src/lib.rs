//! stackprobe core library
//!
//! Validates that a provisioned stack has converged to its expected runtime
//! state and reports the run:
//! - `poll`: convergence poller with an injectable clock
//! - `check` / `run`: named checks executed sequentially with per-check
//!   panic recovery
//! - `report`: summaries plus JSON, HTML and console renderings
//! - `stack`: provisioning collaborator and scoped apply/destroy guard

pub mod check;
pub mod clock;
pub mod error;
pub mod fakes;
pub mod obs;
pub mod outcome;
pub mod poll;
pub mod report;
pub mod run;
pub mod stack;
pub mod telemetry;

pub use check::{
    check_fn, ensure, ensure_contains, ensure_eq, ensure_not_empty, fail, skip, Check, CheckResult,
    FnCheck, NamedCheck, Suite,
};
pub use clock::{Clock, ManualClock, TokioClock};
pub use error::{CheckError, HarnessError, PollError, ProvisionError, ReportError, ResourceError};
pub use outcome::{CheckOutcome, CheckStatus, RunRecorder, RunReport};
pub use poll::{PollOutcome, PollPolicy, Poller, ProbeResult};
pub use report::{
    parse_json, render, render_console, render_html, render_json, summarize, write_reports,
    FailedCheck, ReportConfig, ReportDocument, ReportFormat, Summary, DEFAULT_HTML_REPORT,
    DEFAULT_JSON_REPORT,
};
pub use run::{RunAggregator, PANIC_PREFIX};
pub use stack::{try_with_stack, with_stack, Provisioner, StackContext, StackOptions};
pub use telemetry::init_tracing;

pub use obs::RunSpan;

/// stackprobe version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
