//! HTML attempt-history report.
//!
//! Produces a self-contained HTML file with all CSS/JS inlined.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;

use certexam_core::model::FinalExamAttempt;
use certexam_core::statistics::AttemptBreakdown;

use crate::json::ExamReport;

/// Escape a string for safe HTML insertion.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn minutes_seconds(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Generate an HTML report from an exam report.
pub fn generate_html(report: &ExamReport) -> String {
    let exam = &report.exam;
    let summary = &report.summary;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(
        html,
        "<title>Final exam report: {}</title>",
        html_escape(&exam.plan_id)
    );
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<header>\n");
    html.push_str("<h1>Final exam report</h1>\n");
    let _ = writeln!(
        html,
        "<p class=\"meta\">Plan: <strong>{}</strong> | level {} | {} questions in pool, {} per attempt | generated {}</p>",
        html_escape(&exam.plan_id),
        exam.config.level,
        exam.question_pool.len(),
        exam.config.questions_per_attempt,
        exam.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    html.push_str("</header>\n");

    // Summary
    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<h2>Summary</h2>\n");
    html.push_str("<table class=\"summary\">\n");
    html.push_str("<thead><tr><th>Attempts</th><th>Best score</th><th>Average</th><th>Pass rate</th><th>Status</th><th>Tab-away total</th></tr></thead>\n");
    let status = match exam.passed_at() {
        Some(at) => format!("Passed {}", at.format("%Y-%m-%d")),
        None => "Not passed".to_string(),
    };
    let _ = writeln!(
        html,
        "<tbody><tr><td>{}</td><td>{}</td><td>{:.1}</td><td>{:.1}%</td><td class=\"{}\">{}</td><td class=\"{}\">{}</td></tr></tbody>",
        summary.attempts,
        summary
            .best_score
            .map_or_else(|| "-".to_string(), |s| s.to_string()),
        summary.average_score,
        summary.pass_rate * 100.0,
        if summary.is_passed { "pass" } else { "fail" },
        status,
        if summary.total_tab_away > 0 { "flag" } else { "" },
        summary.total_tab_away,
    );
    html.push_str("</table>\n");
    if !exam.attempts().is_empty() {
        html.push_str(&generate_score_chart(
            exam.attempts(),
            exam.config.passing_score,
        ));
    }
    html.push_str("</section>\n");

    // Attempt history
    html.push_str("<section class=\"results\">\n");
    html.push_str("<h2>Attempts</h2>\n");
    html.push_str("<table class=\"results-table\" id=\"results\">\n");
    html.push_str("<thead><tr><th onclick=\"sortTable(0)\">#</th><th onclick=\"sortTable(1)\">Started</th><th onclick=\"sortTable(2)\">Score</th><th onclick=\"sortTable(3)\">Correct</th><th onclick=\"sortTable(4)\">Blank</th><th onclick=\"sortTable(5)\">Time</th><th onclick=\"sortTable(6)\">Tab-away</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for (attempt, breakdown) in exam.attempts().iter().zip(&report.breakdowns) {
        let result_class = if attempt.passed { "pass" } else { "fail" };
        let _ = writeln!(
            html,
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{}/{}</td><td>{}</td><td>{}</td><td class=\"{}\">{}</td></tr>",
            result_class,
            attempt.attempt_number,
            attempt.started_at.format("%Y-%m-%d %H:%M"),
            attempt.score,
            attempt.correct_count(),
            attempt.answers.len(),
            breakdown.blank_answers,
            minutes_seconds(attempt.total_time_seconds),
            if attempt.tab_away_count > 0 { "flag" } else { "" },
            attempt.tab_away_count,
        );
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    // Topic breakdown of the latest attempt
    if let Some((attempt, breakdown)) = exam.attempts().iter().zip(&report.breakdowns).last() {
        html.push_str(&generate_topic_table(attempt, breakdown));
    }

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("<script>\n");
    html.push_str(JS);
    html.push_str("</script>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &ExamReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)?;
    Ok(())
}

fn generate_topic_table(attempt: &FinalExamAttempt, breakdown: &AttemptBreakdown) -> String {
    let mut out = String::from("<section class=\"topics\">\n");
    let _ = writeln!(
        out,
        "<h2>Topics, attempt {}</h2>",
        attempt.attempt_number
    );
    out.push_str("<table>\n<thead><tr><th>Topic</th><th>Correct</th><th>Accuracy</th></tr></thead>\n<tbody>\n");
    for (topic, tally) in &breakdown.by_topic {
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}/{}</td><td>{:.0}%</td></tr>",
            html_escape(topic),
            tally.correct,
            tally.total,
            tally.accuracy() * 100.0
        );
    }
    out.push_str("</tbody></table>\n</section>\n");
    out
}

fn generate_score_chart(attempts: &[FinalExamAttempt], passing_score: u32) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 10;
    let label_width = 110;

    let total_height = attempts.len() * (bar_height + padding) + padding;
    let threshold_x = label_width + (passing_score as usize * max_width) / 100;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, attempt) in attempts.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let width = (attempt.score.min(100) as usize * max_width) / 100;
        let color = if attempt.passed {
            "#22c55e"
        } else if attempt.score + 10 >= passing_score {
            "#eab308"
        } else {
            "#ef4444"
        };

        let _ = writeln!(
            svg,
            "  <text x=\"{}\" y=\"{}\" font-size=\"14\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">Attempt {}</text>",
            label_width - 10,
            y + bar_height / 2,
            attempt.attempt_number
        );
        let _ = writeln!(
            svg,
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>",
            label_width, y, width, bar_height, color
        );
        let _ = writeln!(
            svg,
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{}%</text>",
            label_width + width + 8,
            y + bar_height / 2,
            attempt.score
        );
    }
    let _ = writeln!(
        svg,
        "  <line x1=\"{threshold_x}\" y1=\"0\" x2=\"{threshold_x}\" y2=\"{total_height}\" stroke=\"currentColor\" stroke-dasharray=\"4 4\"/>"
    );

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; --flag: #fef3c7; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; --flag: #78350f; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); cursor: pointer; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
td.flag { background: var(--flag); font-weight: bold; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; }
"#;

const JS: &str = r#"
function sortTable(col) {
  const table = document.getElementById('results');
  const tbody = table.querySelector('tbody');
  const rows = Array.from(tbody.querySelectorAll('tr'));
  const asc = table.dataset.sortCol == col && table.dataset.sortDir == 'asc' ? false : true;
  rows.sort((a, b) => {
    const va = a.cells[col].textContent;
    const vb = b.cells[col].textContent;
    return asc ? va.localeCompare(vb, undefined, { numeric: true }) : vb.localeCompare(va, undefined, { numeric: true });
  });
  table.dataset.sortCol = col;
  table.dataset.sortDir = asc ? 'asc' : 'desc';
  rows.forEach(r => tbody.appendChild(r));
}
"#;
