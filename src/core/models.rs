//! # Data Models Module / 数据模型模块
//!
//! This module defines the result types produced by the orchestrator: the
//! outcome of every test case, why it failed or was skipped, and the small
//! summary of the test case that reports need.
//!
//! 此模块定义编排器产生的结果类型：每个测试用例的结果、失败或跳过的原因，
//! 以及报告所需的测试用例摘要。

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::core::error::{Error, ErrorKind};
use crate::core::test_case::TestCase;
use crate::infra::t;

/// Enumerates the possible reasons for a test case failure.
/// This helps in categorizing errors for reporting and handling.
/// 枚举测试用例失败的可能原因。
/// 这有助于对错误进行分类，以便报告和处理。
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum FailureReason {
    /// Bad options, resources or declarations, found before any step ran.
    /// 错误的选项、资源或声明，在任何步骤运行之前发现。
    Configuration,
    /// A step's input was not there when the step was about to run.
    /// 步骤即将运行时其输入不存在。
    MissingDependency,
    /// An external program exited with an error.
    /// 外部程序以错误退出。
    Execution,
    /// A step exceeded the configured timeout.
    /// 步骤超出了配置的超时时间。
    Timeout,
    /// Output variables differed from the reference.
    /// 输出变量与参考值不同。
    Validation,
    /// File system or network trouble.
    /// 文件系统或网络问题。
    Io,
}

impl FailureReason {
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::Timeout { .. } => FailureReason::Timeout,
            other => match other.kind() {
                ErrorKind::Configuration => FailureReason::Configuration,
                ErrorKind::MissingDependency => FailureReason::MissingDependency,
                ErrorKind::Execution => FailureReason::Execution,
                ErrorKind::Io => FailureReason::Io,
            },
        }
    }

    pub fn label(&self, locale: &str) -> String {
        match self {
            FailureReason::Configuration => t!("reason.configuration", locale = locale).to_string(),
            FailureReason::MissingDependency => t!("reason.missing_dependency", locale = locale).to_string(),
            FailureReason::Execution => t!("reason.execution", locale = locale).to_string(),
            FailureReason::Timeout => t!("reason.timeout", locale = locale).to_string(),
            FailureReason::Validation => t!("reason.validation", locale = locale).to_string(),
            FailureReason::Io => t!("reason.io", locale = locale).to_string(),
        }
    }
}

/// Why a test case did not run.
/// 测试用例未运行的原因。
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub enum SkipReason {
    /// An upstream test case did not pass.
    UpstreamFailed(String),
    /// The run was interrupted.
    Cancelled,
}

/// What reports need to know about a test case.
/// 报告需要了解的测试用例信息。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseSummary {
    /// `<core>/<group>/<subdir>`
    pub id: String,
    pub test_group: String,
    pub name: String,
    pub subdir: String,
    pub steps: Vec<String>,
}

impl CaseSummary {
    pub fn of(case: &TestCase) -> Self {
        Self {
            id: case.id(),
            test_group: case.test_group().to_string(),
            name: case.name().to_string(),
            subdir: case.subdir().to_string(),
            steps: case.steps().iter().map(|s| s.name().to_string()).collect(),
        }
    }
}

/// Represents the final result of a single test case.
/// 表示单个测试用例的最终结果。
#[derive(Debug, Clone, Serialize)]
pub enum TestResult {
    /// Every step ran and validation found no mismatch.
    /// 所有步骤都已运行，且验证未发现不匹配。
    Passed {
        case: CaseSummary,
        /// Combined logs of all steps / 所有步骤的合并日志
        output: String,
        duration: Duration,
        /// `false` when there was nothing to compare against.
        /// 没有可比较的对象时为 `false`。
        validated: bool,
    },
    /// The test case failed for various reasons.
    /// 测试用例因各种原因失败。
    Failed {
        case: CaseSummary,
        output: String,
        reason: FailureReason,
        /// The step that failed, if the failure belongs to one.
        /// 失败的步骤（如果失败属于某个步骤）。
        step: Option<String>,
        duration: Duration,
    },
    /// The test case did not run.
    /// 测试用例未运行。
    Skipped { case: CaseSummary, reason: SkipReason },
}

impl TestResult {
    pub fn case(&self) -> &CaseSummary {
        match self {
            TestResult::Passed { case, .. } | TestResult::Failed { case, .. } | TestResult::Skipped { case, .. } => case,
        }
    }

    /// Checks if the test result is any kind of failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, TestResult::Failed { .. })
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, TestResult::Passed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TestResult::Skipped { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TestResult::Failed { reason, .. } if *reason == FailureReason::Timeout)
    }

    /// Gets the appropriate CSS class for the test status.
    pub fn get_status_class(&self) -> &'static str {
        match self {
            TestResult::Passed { validated: true, .. } => "status-Passed",
            TestResult::Passed { validated: false, .. } => "status-Unvalidated",
            TestResult::Failed { reason, .. } => match reason {
                FailureReason::Timeout => "status-Timeout",
                FailureReason::Validation => "status-Mismatch",
                _ => "status-Failed",
            },
            TestResult::Skipped { .. } => "status-Skipped",
        }
    }

    /// Gets the name of the test case.
    /// 获取测试用例的名称。
    pub fn case_name(&self) -> &str {
        &self.case().id
    }

    /// Gets the status of the test result as a string for display.
    /// 以字符串形式获取测试结果的状态以供显示。
    pub fn get_status_str(&self, locale: &str) -> String {
        match self {
            TestResult::Passed { validated: true, .. } => t!("report.status_passed", locale = locale).to_string(),
            TestResult::Passed { validated: false, .. } => {
                t!("report.status_passed_unvalidated", locale = locale).to_string()
            }
            TestResult::Failed { reason, .. } => match reason {
                FailureReason::Timeout => t!("report.status_timeout", locale = locale).to_string(),
                FailureReason::Validation => t!("report.status_mismatch", locale = locale).to_string(),
                _ => t!("report.status_failed", locale = locale).to_string(),
            },
            TestResult::Skipped { .. } => t!("report.status_skipped", locale = locale).to_string(),
        }
    }

    /// Gets the output of the test case. Returns an empty string if there's no output.
    /// 获取测试用例的输出。如果没有输出，则返回空字符串。
    pub fn get_output(&self) -> &str {
        match self {
            TestResult::Passed { output, .. } | TestResult::Failed { output, .. } => output,
            TestResult::Skipped { .. } => "",
        }
    }

    /// Gets the duration of the test case. Returns None if not applicable.
    /// 获取测试用例的持续时间。如果不适用，则返回 None。
    pub fn get_duration(&self) -> Option<Duration> {
        match self {
            TestResult::Passed { duration, .. } | TestResult::Failed { duration, .. } => Some(*duration),
            TestResult::Skipped { .. } => None,
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestResult::Passed { case, .. } => write!(f, "{} passed", case.id),
            TestResult::Failed { case, reason, step, .. } => match step {
                Some(step) => write!(f, "{} failed in step '{step}' ({reason:?})", case.id),
                None => write!(f, "{} failed ({reason:?})", case.id),
            },
            TestResult::Skipped { case, reason } => write!(f, "{} skipped ({reason:?})", case.id),
        }
    }
}
