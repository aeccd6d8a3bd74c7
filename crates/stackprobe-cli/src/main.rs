//! stackprobe - validate a freshly provisioned ECS Fargate stack
//!
//! Applies the Terraform module, runs the service / load balancer / task /
//! endpoint checks against it, prints a summary, optionally writes JSON and
//! HTML reports, and destroys the stack.
//!
//! ## Exit codes
//!
//! - `0`: every check passed or was skipped
//! - `1`: at least one check failed
//! - `2`: the harness itself failed (setup, teardown or report writing)

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use stackprobe_core::{
    init_tracing, render_console, try_with_stack, write_reports, PollPolicy, ReportConfig,
    ReportError, RunAggregator, RunReport, RunSpan, StackOptions, DEFAULT_HTML_REPORT,
    DEFAULT_JSON_REPORT,
};
use stackprobe_ecs::{
    ecs_suite, AwsCliInspector, EcsContext, EndpointProbe, ResourceInspector,
    TerraformProvisioner, DEFAULT_SUITE_NAME, OUTPUT_KEYS,
};
use tracing::{error, info, Level};

#[derive(Parser, Debug)]
#[command(name = "stackprobe")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Validate that a provisioned ECS Fargate stack has converged", long_about = None)]
struct Cli {
    /// Write JSON and HTML report files
    #[arg(long)]
    report: bool,

    /// JSON report path
    #[arg(long, default_value = DEFAULT_JSON_REPORT)]
    report_file: PathBuf,

    /// HTML report path
    #[arg(long, default_value = DEFAULT_HTML_REPORT)]
    html_file: PathBuf,

    /// Terraform module directory
    #[arg(long, env = "STACKPROBE_TERRAFORM_DIR", default_value = "examples/terraform-test")]
    terraform_dir: PathBuf,

    /// AWS region the stack is deployed to
    #[arg(long, env = "AWS_DEFAULT_REGION", default_value = "ap-southeast-1")]
    region: String,

    /// Suite name shown in reports
    #[arg(long, default_value = DEFAULT_SUITE_NAME)]
    suite_name: String,

    /// Attempts per convergence wait
    #[arg(long, default_value_t = 30)]
    poll_attempts: u32,

    /// Seconds between convergence attempts
    #[arg(long, default_value_t = 10)]
    poll_interval_secs: u64,

    /// Give up a convergence wait after this many seconds
    #[arg(long)]
    poll_timeout_secs: Option<u64>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    http_timeout_secs: u64,

    /// Probe this URL instead of http://<alb_dns_name>
    #[arg(long)]
    endpoint_url: Option<String>,

    /// Extra request header for the endpoint probe (repeatable)
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Leave the stack in place after the run
    #[arg(long)]
    keep_stack: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn report_config(&self) -> ReportConfig {
        ReportConfig::new(self.report, &self.report_file, &self.html_file)
    }

    fn poll_policy(&self) -> PollPolicy {
        let policy = PollPolicy::new(
            self.poll_attempts,
            Duration::from_secs(self.poll_interval_secs),
        );
        match self.poll_timeout_secs {
            Some(secs) => policy.with_overall_timeout(Duration::from_secs(secs)),
            None => policy,
        }
    }

    fn stack_options(&self) -> StackOptions {
        StackOptions::new(self.region.clone(), OUTPUT_KEYS).keep_stack(self.keep_stack)
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected NAME:VALUE, got {:?}", raw)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);
    let _span = RunSpan::enter(&cli.suite_name);

    let result = run(&cli).await;
    if let Err(err) = &result {
        error!(error = %format!("{:#}", err), "harness failed");
        eprintln!("✗ {:#}", err);
    }
    ExitCode::from(exit_code(&result))
}

/// 0 when every check passed or was skipped, 1 when any check failed, 2 when
/// the harness itself failed.
fn exit_code(result: &Result<RunReport>) -> u8 {
    match result {
        Ok(report) if report.has_failures() => 1,
        Ok(_) => 0,
        Err(_) => 2,
    }
}

async fn run(cli: &Cli) -> Result<RunReport> {
    let report_config = cli.report_config();
    let policy = cli.poll_policy();

    let provisioner = TerraformProvisioner::new(cli.terraform_dir.clone(), cli.region.clone())
        .context("Failed to configure terraform")?;
    let inspector: Arc<dyn ResourceInspector> = Arc::new(AwsCliInspector::new(cli.region.clone()));

    let mut endpoint = EndpointProbe::new(Duration::from_secs(cli.http_timeout_secs))
        .context("Failed to build HTTP client")?;
    for (name, value) in &cli.headers {
        endpoint = endpoint
            .with_header(name, value)
            .with_context(|| format!("Invalid header {}", name))?;
    }

    let suite = ecs_suite(cli.suite_name.clone())?;
    let endpoint_override = cli.endpoint_url.clone();

    info!(
        dir = %cli.terraform_dir.display(),
        region = %cli.region,
        checks = suite.len(),
        "starting stack validation"
    );

    let report = try_with_stack(&provisioner, &cli.stack_options(), |stack| async move {
        let mut ctx = EcsContext::new(stack, inspector, endpoint)
            .with_task_policy(policy.clone())
            .with_endpoint_policy(policy);
        if let Some(url) = endpoint_override {
            ctx = ctx.with_endpoint_override(url);
        }

        let report = RunAggregator::run(&suite, &ctx).await;
        println!("{}", render_console(&report));

        let written = write_reports(&report_config, &report)?;
        for path in &written {
            println!("✓ Report written to {}", path.display());
        }
        Ok::<_, ReportError>(report)
    })
    .await
    .context("Stack harness failed")?;

    Ok(report)
}
