//! Terraform-backed [`Provisioner`].
//!
//! Runs `terraform` in a working directory via `tokio::process`. `init`,
//! `apply` and `destroy` are retried through the convergence poller when
//! stderr matches one of the known transient failures; everything else
//! fails on the first attempt.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::RegexSet;
use stackprobe_core::{Clock, PollPolicy, Poller, ProbeResult, ProvisionError, Provisioner};
use tokio::process::Command;
use tracing::{debug, info};

/// Transient errors worth another `terraform` attempt.
pub const RETRYABLE_ERRORS: &[&str] = &[
    r"(?i)RequestError: send request failed",
    r"(?i)read: connection reset by peer",
    r"(?i)TLS handshake timeout",
    r"(?i)unexpected EOF",
    r"(?i)timeout while waiting for plugin to start",
    r"(?i)Failed to query available provider packages",
    r"(?i)Error installing provider",
    r"(?i)429 Too Many Requests",
    r"(?i)ThrottlingException",
    r"(?i)Error acquiring the state lock",
];

const OUTPUT_MISSING: &[&str] = &["not found", "could not be found", "No outputs found"];

#[derive(Debug)]
struct CommandOutput {
    code: Option<i32>,
    success: bool,
    stdout: String,
    stderr: String,
}

/// Drives the `terraform` CLI in one module directory.
pub struct TerraformProvisioner {
    binary: String,
    dir: PathBuf,
    region: String,
    retryable: RegexSet,
    retry_policy: PollPolicy,
    poller: Poller,
}

impl TerraformProvisioner {
    pub fn new(dir: impl Into<PathBuf>, region: impl Into<String>) -> Result<Self, ProvisionError> {
        let retryable = RegexSet::new(RETRYABLE_ERRORS)
            .map_err(|e| ProvisionError::Parse(format!("invalid retryable pattern: {}", e)))?;
        Ok(Self {
            binary: "terraform".to_string(),
            dir: dir.into(),
            region: region.into(),
            retryable,
            retry_policy: PollPolicy::new(3, Duration::from_secs(5)),
            poller: Poller::new("terraform"),
        })
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_retry_policy(mut self, policy: PollPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.poller = Poller::with_clock("terraform", clock);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether `stderr` names a transient failure.
    pub fn is_retryable(&self, stderr: &str) -> bool {
        self.retryable.is_match(stderr)
    }

    async fn exec(&self, args: &[&str]) -> Result<CommandOutput, std::io::Error> {
        debug!(dir = %self.dir.display(), args = ?args, "terraform");
        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(&self.dir)
            .env("AWS_DEFAULT_REGION", &self.region)
            .env("TF_IN_AUTOMATION", "1")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(CommandOutput {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn run_with_retries(&self, args: &[&str]) -> Result<(), ProvisionError> {
        let command = format!("terraform {}", args.join(" "));
        info!(command = %command, "running");

        self.poller
            .poll(&self.retry_policy, move || async move {
                match self.exec(args).await {
                    Ok(out) if out.success => ProbeResult::Success(()),
                    Ok(out) if self.is_retryable(&out.stderr) => {
                        ProbeResult::retryable(out.stderr.trim().to_string())
                    }
                    Ok(out) => ProbeResult::fatal(format!(
                        "exit code {:?}: {}",
                        out.code,
                        out.stderr.trim()
                    )),
                    Err(err) => ProbeResult::fatal(format!("failed to run {}: {}", self.binary, err)),
                }
            })
            .await
            .into_result()
            .map_err(|source| ProvisionError::Retries { command, source })
    }
}

#[async_trait]
impl Provisioner for TerraformProvisioner {
    async fn apply(&self) -> Result<(), ProvisionError> {
        self.run_with_retries(&["init", "-input=false"]).await?;
        self.run_with_retries(&["apply", "-auto-approve", "-input=false"])
            .await
    }

    async fn destroy(&self) -> Result<(), ProvisionError> {
        self.run_with_retries(&["destroy", "-auto-approve", "-input=false"])
            .await
    }

    async fn output(&self, key: &str) -> Result<String, ProvisionError> {
        let out = self.exec(&["output", "-json", key]).await?;
        if !out.success {
            if OUTPUT_MISSING.iter().any(|m| out.stderr.contains(m)) {
                return Err(ProvisionError::OutputNotFound {
                    key: key.to_string(),
                });
            }
            return Err(ProvisionError::CommandFailed {
                command: format!("terraform output -json {}", key),
                code: out.code,
                stderr: out.stderr.trim().to_string(),
            });
        }
        parse_output(key, &out.stdout)
    }
}

/// Decode `terraform output -json <key>`.
///
/// Strings are returned unquoted; other values keep their JSON text. A
/// `null` output counts as missing.
pub fn parse_output(key: &str, stdout: &str) -> Result<String, ProvisionError> {
    let value: serde_json::Value = serde_json::from_str(stdout.trim())
        .map_err(|e| ProvisionError::Parse(format!("output {}: {}", key, e)))?;
    match value {
        serde_json::Value::Null => Err(ProvisionError::OutputNotFound {
            key: key.to_string(),
        }),
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackprobe_core::ManualClock;

    #[test]
    fn test_parse_string_output() {
        let value = parse_output("alb_dns_name", "\"demo-123.ap-southeast-1.elb.amazonaws.com\"\n")
            .expect("string output");
        assert_eq!(value, "demo-123.ap-southeast-1.elb.amazonaws.com");
    }

    #[test]
    fn test_parse_non_string_output_keeps_json() {
        assert_eq!(parse_output("count", "2").expect("number"), "2");
        assert_eq!(
            parse_output("subnets", "[\"a\",\"b\"]").expect("list"),
            "[\"a\",\"b\"]"
        );
    }

    #[test]
    fn test_parse_null_and_garbage() {
        assert!(matches!(
            parse_output("alb_arn", "null"),
            Err(ProvisionError::OutputNotFound { key }) if key == "alb_arn"
        ));
        assert!(matches!(
            parse_output("alb_arn", "Warning: no outputs"),
            Err(ProvisionError::Parse(_))
        ));
    }

    #[test]
    fn test_retryable_patterns() {
        let tf = TerraformProvisioner::new(".", "ap-southeast-1").expect("patterns compile");
        assert!(tf.is_retryable("Error: RequestError: send request failed\ncaused by: dial tcp"));
        assert!(tf.is_retryable("net/http: TLS handshake timeout"));
        assert!(tf.is_retryable("Error: Error acquiring the state lock"));
        assert!(!tf.is_retryable("Error: creating ECS Service: InvalidParameterException"));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_without_retry() {
        let clock = Arc::new(ManualClock::new());
        let tf = TerraformProvisioner::new(".", "ap-southeast-1")
            .expect("patterns compile")
            .with_binary("/nonexistent/stackprobe-terraform")
            .with_clock(clock.clone());

        let err = tf.apply().await.expect_err("binary missing");
        assert!(matches!(err, ProvisionError::Retries { .. }));
        assert!(err.to_string().contains("terraform init -input=false"));
        assert!(clock.sleeps().is_empty());
    }
}
