//! # Error Module / 错误模块
//!
//! The error taxonomy of the framework. Every failure carries the names of the
//! test group, test case or step it belongs to, so the orchestrator can point
//! at the faulty piece without re-deriving context.
//!
//! 框架的错误分类。每个错误都携带其所属的测试组、测试用例或步骤名称，
//! 以便编排器无需重新推导上下文即可定位故障。

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::files::FileDirection;
use crate::core::test_case::TestCaseState;

/// Result alias used throughout the library.
/// 库中通用的 Result 别名。
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Broad category of an [`Error`], used by reporting and by the orchestrator
/// to decide how a failure is recorded.
///
/// [`Error`] 的大类，供报告和编排器决定如何记录失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Bad options, bad resources, duplicate names. Caught before anything runs.
    /// 错误的选项、资源或重复名称。在运行任何内容之前捕获。
    Configuration,
    /// An input file that some step expects is not there.
    /// 某个步骤期望的输入文件不存在。
    MissingDependency,
    /// An external executable failed or timed out.
    /// 外部可执行文件失败或超时。
    Execution,
    /// File system or network trouble.
    /// 文件系统或网络问题。
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::MissingDependency => "missing dependency",
            ErrorKind::Execution => "execution",
            ErrorKind::Io => "io",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing config option [{section}] {key}")]
    MissingOption { section: String, key: String },

    #[error("config option [{section}] {key} = '{value}' is not a valid {expected}")]
    InvalidOption {
        section: String,
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("config layer '{layer}' is invalid: {message}")]
    InvalidLayer { layer: String, message: String },

    #[error("config is frozen, cannot add layer '{layer}'")]
    FrozenConfig { layer: String },

    #[error(
        "step '{step}' has invalid resources: ntasks={ntasks}, min_tasks={min_tasks}, openmp_threads={openmp_threads}"
    )]
    InvalidResources {
        step: String,
        ntasks: u32,
        min_tasks: u32,
        openmp_threads: u32,
    },

    #[error("step '{step}' needs at least {min_tasks} tasks but only {available} are available")]
    InsufficientResources {
        step: String,
        min_tasks: u32,
        available: u32,
    },

    #[error("step '{step}' declares {direction} file '{filename}' more than once")]
    DuplicateFile {
        step: String,
        direction: FileDirection,
        filename: String,
    },

    #[error("test case '{test_case}' already has a step named '{step}'")]
    DuplicateStep { test_case: String, step: String },

    #[error("test group '{test_group}' already has a test case '{test_case}'")]
    DuplicateTestCase { test_group: String, test_case: String },

    #[error("test group '{test_group}': work directories of '{first}' and '{second}' overlap")]
    OverlappingSubdir {
        test_group: String,
        first: String,
        second: String,
    },

    #[error("test group '{0}' is registered more than once")]
    DuplicateTestGroup(String),

    #[error("test group '{test_group}' has no test case '{test_case}'")]
    UnknownTestCase { test_group: String, test_case: String },

    #[error("'{path}' is produced by more than one step: {producers:?}")]
    AmbiguousProducer { path: PathBuf, producers: Vec<String> },

    #[error("test case '{test_case}' has a dependency cycle through step '{step}'")]
    DependencyCycle { test_case: String, step: String },

    #[error(
        "test case '{test_case}' reads '{path}' from '{producer}', which is not one of its upstream test cases"
    )]
    UndeclaredDependency {
        test_case: String,
        producer: String,
        path: PathBuf,
    },

    #[error("unknown mesh name '{0}'")]
    UnknownMesh(String),

    #[error("{context}: '{value}' must be one of {allowed:?}")]
    InvalidChoice {
        context: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("packaged resource '{package}/{name}' does not exist")]
    MissingResource { package: String, name: String },

    #[error("step '{step}' has no namelist file '{out_name}'")]
    MissingNamelist { step: String, out_name: String },

    #[error("namelist template '{template}' does not define option '{option}'")]
    UnknownNamelistOption { template: String, option: String },

    #[error("template '{template}' is malformed: {message}")]
    InvalidTemplate { template: String, message: String },

    #[error("template '{template}' has no replacement for '{token}'")]
    UnresolvedToken { template: String, token: String },

    #[error("test case '{test_case}' cannot {action} while {state}")]
    InvalidTransition {
        test_case: String,
        action: &'static str,
        state: TestCaseState,
    },

    #[error("step '{step}' is missing input '{path}'")]
    MissingDependency { step: String, path: PathBuf },

    #[error("step '{step}' failed ({status}):\n{output}")]
    StepExecution {
        step: String,
        status: String,
        output: String,
    },

    #[error("step '{step}' exceeded its timeout of {timeout:?}")]
    Timeout { step: String, timeout: Duration },

    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to download '{url}': {message}")]
    Download { url: String, message: String },
}

impl Error {
    /// Wraps an `io::Error` together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// The taxonomy bucket this error belongs to.
    /// 此错误所属的分类。
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingDependency { .. } => ErrorKind::MissingDependency,
            Error::StepExecution { .. } | Error::Timeout { .. } => ErrorKind::Execution,
            Error::Io { .. } | Error::Download { .. } => ErrorKind::Io,
            _ => ErrorKind::Configuration,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}
