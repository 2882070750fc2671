//! Machine-readable run report.
//! 机器可读的运行报告。

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::Path;

use crate::core::models::TestResult;

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: DateTime<Local>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: &'a [TestResult],
}

impl<'a> JsonReport<'a> {
    pub fn new(results: &'a [TestResult]) -> Self {
        Self {
            generated_at: Local::now(),
            total: results.len(),
            passed: results.iter().filter(|r| r.is_passed()).count(),
            failed: results.iter().filter(|r| r.is_failure()).count(),
            skipped: results.iter().filter(|r| r.is_skipped()).count(),
            results,
        }
    }
}

pub fn write_json_report(results: &[TestResult], output_path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(&JsonReport::new(results)).context("cannot serialize the JSON report")?;
    crate::infra::fs::write_file(output_path, &text)
        .with_context(|| format!("cannot write JSON report to {}", output_path.display()))
}
