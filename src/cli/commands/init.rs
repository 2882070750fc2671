//! # Init Command Module / 初始化命令模块
//!
//! Writes a user config file with the machine-specific options: how parallel
//! runs are launched, how many cores to use, where input data is cached and
//! where baselines live. The file is the last config layer of every test case.
//!
//! 写入包含机器相关选项的用户配置文件：并行运行的启动方式、使用的核心数、
//! 输入数据的缓存位置以及基线所在位置。该文件是每个测试用例的最后一个配置层。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use std::path::Path;
use std::process::ExitCode;

use crate::core::config::{ConfigCascade, ConfigLayer};
use crate::t;

/// Options the wizard asks for.
/// 向导询问的选项。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSettings {
    pub launcher: String,
    pub cores: u32,
    pub database_root: String,
    pub download: bool,
    pub baseline_dir: String,
    pub step_timeout_secs: u64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            launcher: "mpirun -n {ntasks}".to_string(),
            cores: 0,
            database_root: "~/.cache/compass/databases".to_string(),
            download: true,
            baseline_dir: String::new(),
            step_timeout_secs: 0,
        }
    }
}

impl UserSettings {
    pub fn to_layer(&self) -> ConfigLayer {
        ConfigLayer::new("user")
            .with_option("parallel", "launcher", &self.launcher)
            .with_option("parallel", "cores", self.cores)
            .with_option("paths", "database_root", &self.database_root)
            .with_option("download", "enabled", self.download)
            .with_option("validation", "baseline_dir", &self.baseline_dir)
            .with_option("execution", "step_timeout_secs", self.step_timeout_secs)
    }

    /// TOML text of the user config file.
    pub fn render(&self) -> Result<String> {
        let mut cascade = ConfigCascade::new();
        cascade.add_layer(self.to_layer())?;
        let body = cascade.to_toml_string()?;
        Ok(format!(
            "# compass user config, applied after every other config layer\n\n{body}"
        ))
    }
}

fn ask(theme: &ColorfulTheme, language: &str) -> Result<UserSettings> {
    let defaults = UserSettings::default();
    let failed = || t!("init.prompt_failed", locale = language).to_string();

    let launcher: String = Input::with_theme(theme)
        .with_prompt(t!("init.prompt_launcher", locale = language))
        .default(defaults.launcher)
        .interact_text()
        .with_context(failed)?;
    let cores: u32 = Input::with_theme(theme)
        .with_prompt(t!("init.prompt_cores", locale = language))
        .default(num_cpus::get() as u32)
        .interact_text()
        .with_context(failed)?;
    let database_root: String = Input::with_theme(theme)
        .with_prompt(t!("init.prompt_database_root", locale = language))
        .default(defaults.database_root)
        .interact_text()
        .with_context(failed)?;
    let download = Confirm::with_theme(theme)
        .with_prompt(t!("init.prompt_download", locale = language))
        .default(defaults.download)
        .interact()
        .with_context(failed)?;
    let baseline_dir: String = Input::with_theme(theme)
        .with_prompt(t!("init.prompt_baseline", locale = language))
        .allow_empty(true)
        .default(defaults.baseline_dir)
        .interact_text()
        .with_context(failed)?;
    let step_timeout_secs: u64 = Input::with_theme(theme)
        .with_prompt(t!("init.prompt_timeout", locale = language))
        .default(defaults.step_timeout_secs)
        .interact_text()
        .with_context(failed)?;

    Ok(UserSettings {
        launcher,
        cores,
        database_root,
        download,
        baseline_dir,
        step_timeout_secs,
    })
}

/// Runs the wizard, or writes the defaults when `non_interactive`.
///
/// An existing file is kept unless `force` is set or the user agrees to
/// overwrite it.
///
/// 运行向导，或在 `non_interactive` 时写入默认值。
/// 除非设置了 `force` 或用户同意覆盖，否则保留已存在的文件。
pub fn execute(output: &Path, non_interactive: bool, force: bool, language: &str) -> Result<ExitCode> {
    let theme = ColorfulTheme::default();

    if output.exists() && !force {
        if non_interactive {
            println!("{}", t!("init.file_exists", locale = language, path = output.display()).red());
            println!("{}", t!("init.use_force", locale = language).yellow());
            return Ok(ExitCode::FAILURE);
        }
        let overwrite = Confirm::with_theme(&theme)
            .with_prompt(t!("init.overwrite_prompt", locale = language, path = output.display()))
            .default(false)
            .interact()
            .context(t!("init.prompt_failed", locale = language).to_string())?;
        if !overwrite {
            println!("{}", t!("init.aborted", locale = language));
            return Ok(ExitCode::SUCCESS);
        }
    }

    let settings = if non_interactive {
        UserSettings::default()
    } else {
        println!("\n{}", t!("init.welcome", locale = language).cyan().bold());
        ask(&theme, language)?
    };

    let text = settings.render()?;
    crate::infra::fs::write_file(output, &text)
        .with_context(|| t!("init.write_failed", locale = language, path = output.display()).to_string())?;

    println!("{}", t!("init.success", locale = language, path = output.display()).green());
    println!("{}", t!("init.next_steps", locale = language));
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_defaults_parse_back() {
        let text = UserSettings::default().render().unwrap();
        let layer = ConfigLayer::from_toml_str("user", &text).unwrap();
        assert_eq!(layer.get("parallel", "launcher"), Some("mpirun -n {ntasks}"));
        assert_eq!(layer.get("download", "enabled"), Some("true"));
        assert_eq!(layer.get("validation", "baseline_dir"), Some(""));
    }
}
