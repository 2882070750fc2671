//! # HTML Reporting Module / HTML 报告模块
//!
//! Renders a standalone HTML page with summary counts, one row per test case
//! and the captured output of failed test cases behind a toggle.
//!
//! 渲染一个独立的 HTML 页面，包含汇总计数、每个测试用例一行，以及可展开查看的失败用例输出。

use anyhow::{Context, Result};
use chrono::Local;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::path::Path;

use crate::core::models::TestResult;
use crate::infra::t;
use crate::reporting::console::skip_reason_text;

const HTML_STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2em; color: #24292f; }
h1 { margin-bottom: 0.2em; }
.generated { color: #57606a; margin-bottom: 1.5em; }
.summary-container { display: flex; gap: 1.5em; margin-bottom: 1.5em; }
.summary-item { border: 1px solid #d0d7de; border-radius: 6px; padding: 0.8em 1.2em; text-align: center; }
.summary-item .count { display: block; font-size: 1.8em; font-weight: bold; }
.passed-text { color: #1a7f37; } .failed-text { color: #cf222e; } .skipped-text { color: #6e7781; }
table { border-collapse: collapse; width: 100%; }
th, td { border-bottom: 1px solid #d0d7de; padding: 0.4em 0.6em; text-align: left; vertical-align: top; }
.status-cell { display: inline-block; border-radius: 4px; padding: 0.1em 0.5em; color: white; }
.status-Passed { background: #1a7f37; } .status-Unvalidated { background: #9a6700; }
.status-Failed, .status-Mismatch { background: #cf222e; } .status-Timeout { background: #bc4c00; }
.status-Skipped { background: #6e7781; }
.output-toggle { cursor: pointer; color: #0969da; font-size: 0.85em; }
.output-content { white-space: pre-wrap; background: #f6f8fa; padding: 0.8em; max-height: 40em; overflow: auto; }
.duration-cell { text-align: right; white-space: nowrap; }
"#;

const HTML_SCRIPT: &str = r#"
function toggleOutput(id) {
  var row = document.getElementById(id);
  row.style.display = row.style.display === 'none' ? 'table-row' : 'none';
}
"#;

fn summary_item(count: usize, label: String, class: &str) -> Markup {
    html! {
        div class="summary-item" {
            span class={ "count " (class) } { (count) }
            span class="label" { (label) }
        }
    }
}

fn result_rows(index: usize, result: &TestResult, locale: &str) -> Markup {
    let output_id = format!("output-{index}");
    let duration = result
        .get_duration()
        .map(|d| format!("{:.2}s", d.as_secs_f64()))
        .unwrap_or_else(|| "N/A".to_string());
    let note = match result {
        TestResult::Failed { reason, step, .. } => match step {
            Some(step) => format!("{} ({step})", reason.label(locale)),
            None => reason.label(locale),
        },
        TestResult::Skipped { reason, .. } => skip_reason_text(reason, locale),
        TestResult::Passed { validated: false, .. } => t!("report.not_validated", locale = locale).to_string(),
        TestResult::Passed { .. } => String::new(),
    };

    html! {
        tr {
            td { (result.case_name()) }
            td {
                div class={ "status-cell " (result.get_status_class()) } { (result.get_status_str(locale)) }
                @if result.is_failure() {
                    div class="output-toggle" onclick=(format!("toggleOutput('{output_id}')")) {
                        (t!("html_report.toggle_output", locale = locale))
                    }
                }
            }
            td { (note) }
            td class="duration-cell" { (duration) }
        }
        @if result.is_failure() {
            tr id=(output_id) style="display:none;" {
                td colspan="4" { pre class="output-content" { (result.get_output()) } }
            }
        }
    }
}

/// Renders the report page.
/// 渲染报告页面。
pub fn render_html_report(results: &[TestResult], locale: &str) -> Markup {
    let passed = results.iter().filter(|r| r.is_passed()).count();
    let failed = results.iter().filter(|r| r.is_failure()).count();
    let skipped = results.iter().filter(|r| r.is_skipped()).count();
    let generated = Local::now().format("%Y-%m-%d %H:%M:%S %Z").to_string();

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale)) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale)) }
                div class="generated" { (t!("html_report.generated", locale = locale, time = generated)) }
                div class="summary-container" {
                    (summary_item(results.len(), t!("html_report.summary.total", locale = locale).to_string(), ""))
                    (summary_item(passed, t!("html_report.summary.passed", locale = locale).to_string(), "passed-text"))
                    (summary_item(failed, t!("html_report.summary.failed", locale = locale).to_string(), "failed-text"))
                    (summary_item(skipped, t!("html_report.summary.skipped", locale = locale).to_string(), "skipped-text"))
                }
                table {
                    thead {
                        tr {
                            th { (t!("html_report.table.name", locale = locale)) }
                            th { (t!("html_report.table.status", locale = locale)) }
                            th { (t!("html_report.table.details", locale = locale)) }
                            th class="duration-cell" { (t!("html_report.table.duration", locale = locale)) }
                        }
                    }
                    tbody {
                        @for (i, result) in results.iter().enumerate() {
                            (result_rows(i, result, locale))
                        }
                    }
                }
                script { (PreEscaped(HTML_SCRIPT)) }
            }
        }
    }
}

/// Writes the HTML report to `output_path`.
///
/// # Errors / 错误
/// Returns an error if the file cannot be written.
/// 无法写入文件时返回错误。
pub fn generate_html_report(results: &[TestResult], output_path: &Path, locale: &str) -> Result<()> {
    let page = render_html_report(results, locale);
    crate::infra::fs::write_file(output_path, &page.into_string())
        .with_context(|| format!("cannot write HTML report to {}", output_path.display()))
}
