//! # Console Reporting Module / 控制台报告模块
//!
//! This module prints the end-of-run summary and the logs of failed test
//! cases to the console.
//!
//! 此模块在控制台打印运行结束时的摘要以及失败测试用例的日志。

use colored::*;

use crate::core::models::{FailureReason, SkipReason, TestResult};
use crate::infra::t;

/// Prints a formatted summary of test results to the console.
///
/// 在控制台打印格式化的测试结果摘要。
///
/// # Output Format / 输出格式
/// ```text
/// --- Test Summary ---
///   - Passed           | ocean/global_ocean/QU240/mesh                  |      1.23s
///   - Failed           | ocean/global_ocean/QU240/PHC/init              |      0.45s
///   - Skipped          | ocean/global_ocean/QU240/PHC/RK4/restart_test  |        N/A
/// ```
pub fn print_summary(results: &[TestResult], locale: &str) {
    println!("\n{}", t!("report.summary_banner", locale = locale).bold());

    for result in results {
        let status_str = result.get_status_str(locale);
        let duration_str = result
            .get_duration()
            .map(|d| format!("{:.2?}", d))
            .unwrap_or_else(|| "N/A".to_string());

        let status_colored = match result {
            TestResult::Passed { validated: true, .. } => status_str.green(),
            TestResult::Passed { validated: false, .. } => status_str.yellow(),
            TestResult::Failed { .. } => status_str.red(),
            TestResult::Skipped { .. } => status_str.dimmed(),
        };

        println!(
            "  - {:<18} | {:<50} | {:>10}",
            status_colored,
            result.case_name(),
            duration_str
        );
    }

    let passed = results.iter().filter(|r| r.is_passed()).count();
    let failed = results.iter().filter(|r| r.is_failure()).count();
    let skipped = results.iter().filter(|r| r.is_skipped()).count();
    println!(
        "\n{}",
        t!(
            "report.totals",
            locale = locale,
            total = results.len(),
            passed = passed,
            failed = failed,
            skipped = skipped
        )
    );
}

/// Prints why each failed test case failed, followed by its captured output.
///
/// 打印每个失败测试用例的失败原因及其捕获的输出。
pub fn print_failure_details(failures: &[&TestResult], locale: &str) {
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("report.failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, result) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            failures.len(),
            t!("report.failure_header", locale = locale).red(),
            result.case_name().cyan()
        );

        if let TestResult::Failed { output, reason, step, .. } = result {
            println!("{}: {}", t!("report.reason", locale = locale), reason.label(locale));
            if let Some(step) = step {
                println!("{}: {}", t!("report.step", locale = locale), step);
            }
            let log_header = match reason {
                FailureReason::Validation => t!("report.validation_log", locale = locale),
                _ => t!("report.step_log", locale = locale),
            };
            println!("\n--- {} ---\n", log_header.yellow());
            println!("{}", output);
            println!("\n{}", "-".repeat(80));
        }
    }
}

/// One-line explanation of a skip, for reports.
/// 跳过原因的单行说明，用于报告。
pub fn skip_reason_text(reason: &SkipReason, locale: &str) -> String {
    match reason {
        SkipReason::UpstreamFailed(upstream) => {
            t!("reason.upstream_failed", locale = locale, upstream = upstream).to_string()
        }
        SkipReason::Cancelled => t!("reason.cancelled", locale = locale).to_string(),
    }
}
