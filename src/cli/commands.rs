//! # Commands Module / 命令模块
//!
//! One module per subcommand, plus the handling of arguments that `setup`
//! and `run` share: the test case filters, the work directory and the user
//! config file.
//!
//! 每个子命令一个模块，以及 `setup` 与 `run` 共用参数的处理：
//! 测试用例过滤器、工作目录和用户配置文件。

pub mod init;
pub mod list;
pub mod run;
pub mod setup;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::ConfigLayer;
use crate::core::execution::RunOptions;
use crate::infra::fs::{absolute_path, ensure_dir};
use crate::t;

/// User config picked up from the current directory when `--config` is not given.
/// 未提供 `--config` 时从当前目录读取的用户配置文件。
pub const DEFAULT_USER_CONFIG: &str = "compass.toml";

/// Arguments shared by `setup` and `run`.
#[derive(Debug, Clone)]
pub struct SharedArgs {
    pub filters: Vec<String>,
    pub work_dir: PathBuf,
    pub config: Option<PathBuf>,
}

/// Reads the user config file, if there is one, as a single config layer.
///
/// An explicit `--config` must exist; the default `compass.toml` is optional.
///
/// 将用户配置文件（如果存在）读取为单个配置层。
/// 显式给出的 `--config` 必须存在；默认的 `compass.toml` 是可选的。
pub fn load_user_layers(config: Option<&Path>) -> Result<Vec<ConfigLayer>> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_USER_CONFIG);
            if !default.is_file() {
                return Ok(Vec::new());
            }
            default
        }
    };
    let text = fs::read_to_string(&path)
        .with_context(|| t!("config.read_failed", path = path.display()).to_string())?;
    let layer = ConfigLayer::from_toml_str(path.display().to_string(), &text)
        .with_context(|| t!("config.parse_failed", path = path.display()).to_string())?;
    println!("{}", t!("config.loaded", path = path.display()));
    Ok(vec![layer])
}

/// Builds the run options: absolute work root and user config layers.
/// 构建运行选项：绝对工作根目录与用户配置层。
pub fn run_options(args: &SharedArgs, baseline: Option<&Path>) -> Result<RunOptions> {
    let work_dir = absolute_path(&args.work_dir)?;
    ensure_dir(&work_dir)
        .with_context(|| t!("config.work_dir_failed", path = work_dir.display()).to_string())?;
    let baseline_dir = baseline.map(absolute_path).transpose()?;
    Ok(RunOptions {
        work_dir,
        user_layers: load_user_layers(args.config.as_deref())?,
        baseline_dir,
    })
}
