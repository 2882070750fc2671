//! # File Declarations Module / 文件声明模块
//!
//! Input and output files that a step declares. Declarations are what the
//! dependency graph is built from: an input whose resolved path equals some
//! step's output makes that step a producer of the input.
//!
//! 步骤声明的输入和输出文件。依赖图正是由这些声明构建的：
//! 如果某个输入的解析路径与某个步骤的输出相同，则该步骤是此输入的生产者。

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::infra::fs::normalize;

/// Whether a file is read or written by a step.
/// 文件是被步骤读取还是写入。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileDirection {
    Input,
    Output,
}

impl fmt::Display for FileDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileDirection::Input => f.write_str("input"),
            FileDirection::Output => f.write_str("output"),
        }
    }
}

/// Where the contents of an input file come from.
/// 输入文件内容的来源。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum InputSource {
    /// Already at `<step_dir>/<filename>` when the step runs; usually a
    /// sibling's output reached through `../other_step/file`.
    /// 步骤运行时已位于 `<step_dir>/<filename>`；通常是通过 `../other_step/file` 访问的兄弟步骤输出。
    Local,
    /// A link to another path. Relative targets are relative to the work root,
    /// which is how a test case reads the outputs of another test case.
    /// 指向另一路径的链接。相对目标相对于工作根目录，测试用例由此读取其他测试用例的输出。
    Target(PathBuf),
    /// A file shipped with the framework, written into the step directory.
    /// 随框架发布的文件，写入步骤目录。
    Package { package: String, resource: String },
    /// A file from the input-data database, downloaded on demand.
    /// 来自输入数据库的文件，按需下载。
    Database { database: String, target: String },
}

/// A file a step reads.
/// 步骤读取的文件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputFile {
    /// Name of the file (or link) inside the step directory.
    pub filename: String,
    pub source: InputSource,
}

impl InputFile {
    pub fn local(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            source: InputSource::Local,
        }
    }

    pub fn link(filename: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            source: InputSource::Target(target.into()),
        }
    }

    pub fn from_package(
        filename: impl Into<String>,
        package: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            source: InputSource::Package {
                package: package.into(),
                resource: resource.into(),
            },
        }
    }

    pub fn from_database(
        filename: impl Into<String>,
        database: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            source: InputSource::Database {
                database: database.into(),
                target: target.into(),
            },
        }
    }

    /// Where the file will be inside the step directory, relative to the work root.
    /// 文件在步骤目录中的位置（相对于工作根目录）。
    pub fn link_path(&self, step_path: &Path) -> PathBuf {
        normalize(&step_path.join(&self.filename))
    }

    /// The path the contents are read from, relative to the work root unless
    /// the link target is absolute.
    ///
    /// 读取内容的路径；除非链接目标是绝对路径，否则相对于工作根目录。
    pub fn resolved_path(&self, step_path: &Path) -> PathBuf {
        match &self.source {
            InputSource::Target(target) => normalize(target),
            _ => self.link_path(step_path),
        }
    }

    /// Inputs the framework provides itself, so no step has to produce them.
    /// 由框架自身提供的输入，因此不需要任何步骤来生成。
    pub fn is_provided(&self) -> bool {
        match &self.source {
            InputSource::Package { .. } | InputSource::Database { .. } => true,
            InputSource::Target(target) => target.is_absolute(),
            InputSource::Local => false,
        }
    }
}

/// A file a step writes.
/// 步骤写入的文件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFile {
    /// Path relative to the step directory; may climb out of it (`../restarts/x`).
    pub filename: String,
}

impl OutputFile {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }

    pub fn resolved_path(&self, step_path: &Path) -> PathBuf {
        normalize(&step_path.join(&self.filename))
    }
}
