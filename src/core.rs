//! # Core Module / 核心模块
//!
//! This module contains the framework itself: the configuration cascade,
//! steps with their file dependencies, test cases and test groups, dependency
//! resolution, and the planner and engine that run them.
//!
//! 此模块包含框架本身：配置级联、带文件依赖的步骤、测试用例与测试组、
//! 依赖解析，以及运行它们的计划器和引擎。

pub mod config;
pub mod error;
pub mod execution;
pub mod files;
pub mod graph;
pub mod models;
pub mod planner;
pub mod registry;
pub mod step;
pub mod templates;
pub mod test_case;
pub mod test_group;

// Re-exports
pub use config::{ConfigCascade, ConfigLayer};
pub use error::{Error, ErrorKind, Result};
pub use execution::{RunOptions, run_test_case, setup_test_case};
pub use files::{InputFile, InputSource, OutputFile};
pub use models::TestResult;
pub use registry::{CaseId, Registry};
pub use step::{Resources, Step, StepAction, Tool};
pub use test_case::{Comparison, TestCase, TestCaseHooks, TestCaseState};
pub use test_group::{CaseHandle, TestGroup};
