//! # File System Operations Module / 文件系统操作模块
//!
//! This module provides utilities for laying out work directories: lexical
//! path normalisation (the dependency graph compares paths that may not exist
//! yet), directory creation, file writing and links between step directories.
//!
//! 此模块提供布置工作目录的实用功能：词法路径规范化（依赖图比较的路径可能尚不存在）、
//! 目录创建、文件写入以及步骤目录之间的链接。

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::core::error::{Error, Result};

/// Normalises a path without touching the file system: drops `.` components
/// and folds `..` into the preceding component where there is one.
///
/// 在不访问文件系统的情况下规范化路径：去掉 `.` 组件，并将 `..` 与前一个组件合并（若存在）。
///
/// # Examples / 示例
/// ```
/// use compass_runner::infra::fs::normalize;
/// use std::path::Path;
///
/// assert_eq!(normalize(Path::new("a/b/../c/./d")), Path::new("a/c/d"));
/// ```
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}

/// Creates a directory and all of its parents.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| Error::io(path, e))
}

/// Writes `contents` to `path`, creating the parent directory first.
/// 将 `contents` 写入 `path`，先创建父目录。
pub fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).map_err(|e| Error::io(path, e))
}

/// Points `link` at `target`, replacing whatever `link` was before.
///
/// On unix this is a symlink, so the target may be produced later (a step
/// linking to an upstream test case that has not run yet). Elsewhere the
/// file is copied if it already exists.
///
/// 使 `link` 指向 `target`，替换 `link` 原有的内容。
/// 在 unix 上使用符号链接，因此目标可以稍后生成（例如链接到尚未运行的上游测试用例）。
/// 在其他平台上，如果文件已存在则复制。
pub fn link_or_copy(target: &Path, link: &Path) -> Result<()> {
    if let Some(parent) = link.parent() {
        ensure_dir(parent)?;
    }
    if fs::symlink_metadata(link).is_ok() {
        fs::remove_file(link).map_err(|e| Error::io(link, e))?;
    }
    debug!(link = %link.display(), target = %target.display(), "linking input");

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).map_err(|e| Error::io(link, e))
    }

    #[cfg(not(unix))]
    {
        if target.exists() {
            fs::copy(target, link)
                .map(|_| ())
                .map_err(|e| Error::io(link, e))
        } else {
            warn!(target = %target.display(), "link target does not exist yet, not copying");
            Ok(())
        }
    }
}

/// Removes a directory tree if it exists.
pub fn clean_dir(path: &Path) -> Result<()> {
    if path.exists() {
        warn!(path = %path.display(), "removing existing work directory");
        fs::remove_dir_all(path).map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

/// Checks if a path exists and is a directory.
pub fn is_directory(path: &Path) -> bool {
    path.exists() && path.is_dir()
}

/// Gets the absolute path from a potentially relative path, without requiring
/// it to exist.
///
/// 从可能为相对的路径获取绝对路径，不要求该路径存在。
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    let cwd = std::env::current_dir().map_err(|e| Error::io(path, e))?;
    Ok(normalize(&cwd.join(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keeps_leading_parent_dirs() {
        assert_eq!(normalize(Path::new("../a/../../b")), Path::new("../../b"));
    }

    #[test]
    fn test_normalize_absolute_root_absorbs_parent() {
        assert_eq!(normalize(Path::new("/../x/./y")), Path::new("/x/y"));
    }

    #[test]
    fn test_write_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.txt");
        write_file(&path, "hello").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "hello");
    }
}
