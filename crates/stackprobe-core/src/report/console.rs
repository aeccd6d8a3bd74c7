use super::html::human_duration;
use super::summarize;
use crate::outcome::CheckStatus;
use crate::outcome::RunReport;

/// Plain-text summary for terminal output.
pub fn render_console(report: &RunReport) -> String {
    let summary = summarize(report);
    let rule = "=".repeat(60);

    let mut out = String::new();
    out.push_str(&format!("{}\n{}\n{}\n", rule, report.suite_name(), rule));
    for outcome in report.outcomes() {
        let marker = match outcome.status() {
            CheckStatus::Pass => "✓",
            CheckStatus::Fail => "✗",
            CheckStatus::Skip => "-",
        };
        out.push_str(&format!(
            "  {} {} {} ({})\n",
            marker,
            outcome.status(),
            outcome.name(),
            human_duration(outcome.duration())
        ));
        if let Some(error) = outcome.error() {
            out.push_str(&format!("      {}\n", error));
        }
    }
    out.push_str(&format!("{}\n", "-".repeat(60)));
    out.push_str(&format!(
        "Total: {}  Passed: {}  Failed: {}  Skipped: {}  Pass rate: {:.1}%  Duration: {}\n",
        summary.total,
        summary.passed,
        summary.failed,
        summary.skipped,
        summary.pass_rate * 100.0,
        human_duration(report.elapsed()),
    ));
    out
}
