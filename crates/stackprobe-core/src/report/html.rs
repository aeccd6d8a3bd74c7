use std::time::Duration;

use chrono::SecondsFormat;
use html_escape::encode_text;

use super::summarize;
use crate::outcome::{CheckStatus, RunReport};

const STYLE: &str = "body{font-family:-apple-system,Segoe UI,Helvetica,Arial,sans-serif;margin:2rem;color:#1f2328}\
h1{margin-bottom:.25rem}\
.meta{color:#59636e;margin-bottom:1.5rem}\
.totals{display:flex;gap:1rem;margin-bottom:1.5rem}\
.total{padding:.75rem 1.25rem;border-radius:6px;background:#f6f8fa;font-size:1.25rem}\
.total strong{display:block;font-size:2rem}\
.total.pass strong{color:#1a7f37}\
.total.fail strong{color:#cf222e}\
.total.skip strong{color:#9a6700}\
table{border-collapse:collapse;width:100%}\
th,td{border:1px solid #d1d9e0;padding:.5rem;text-align:left;vertical-align:top}\
th{background:#f6f8fa}\
tr.fail{background:#ffebe9}\
tr.skip{background:#fff8c5}\
.status{font-weight:bold}\
tr.pass .status{color:#1a7f37}\
tr.fail .status{color:#cf222e}\
pre{margin:0;white-space:pre-wrap;font-family:ui-monospace,Menlo,monospace}";

/// Render a self-contained HTML page for a run. Styles are inlined.
pub fn render_html(report: &RunReport) -> String {
    let summary = summarize(report);
    let suite = encode_text(report.suite_name());

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{} - Test Report</title>\n", suite));
    out.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));

    out.push_str(&format!("<h1>{}</h1>\n", suite));
    out.push_str(&format!(
        "<div class=\"meta\">Run {} &middot; started {} &middot; ended {} &middot; duration {}</div>\n",
        report.run_id(),
        report.started_at().to_rfc3339_opts(SecondsFormat::Secs, true),
        report.ended_at().to_rfc3339_opts(SecondsFormat::Secs, true),
        human_duration(report.elapsed()),
    ));

    out.push_str("<div class=\"totals\">\n");
    out.push_str(&format!(
        "<div class=\"total\"><strong>{}</strong>Total</div>\n",
        summary.total
    ));
    out.push_str(&format!(
        "<div class=\"total pass\"><strong>{}</strong>Passed</div>\n",
        summary.passed
    ));
    out.push_str(&format!(
        "<div class=\"total fail\"><strong>{}</strong>Failed</div>\n",
        summary.failed
    ));
    out.push_str(&format!(
        "<div class=\"total skip\"><strong>{}</strong>Skipped</div>\n",
        summary.skipped
    ));
    out.push_str(&format!(
        "<div class=\"total\"><strong>{:.1}%</strong>Pass rate</div>\n",
        summary.pass_rate * 100.0
    ));
    out.push_str("</div>\n");

    out.push_str("<table>\n<thead><tr><th>#</th><th>Check</th><th>Status</th><th>Duration</th><th>Error</th></tr></thead>\n<tbody>\n");
    for (idx, outcome) in report.outcomes().iter().enumerate() {
        let class = match outcome.status() {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
            CheckStatus::Skip => "skip",
        };
        let error = outcome
            .error()
            .map(|e| format!("<pre>{}</pre>", encode_text(e)))
            .unwrap_or_default();
        out.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td class=\"status\">{}</td><td>{}</td><td>{}</td></tr>\n",
            class,
            idx + 1,
            encode_text(outcome.name()),
            outcome.status(),
            human_duration(outcome.duration()),
            error,
        ));
    }
    out.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    out
}

/// Millisecond-precision human duration, e.g. `1s 250ms`.
pub(crate) fn human_duration(duration: Duration) -> String {
    let truncated = Duration::from_millis(duration.as_millis() as u64);
    humantime::format_duration(truncated).to_string()
}
