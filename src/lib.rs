//! # Compass Runner Library / Compass Runner 库
//!
//! This library provides a test-case orchestration framework for MPAS ocean
//! and land-ice model workflows. Test groups build families of test cases,
//! test cases are ordered collections of steps, and steps declare the files
//! that connect them.
//!
//! 此库为 MPAS 海洋与陆冰模型工作流提供测试用例编排框架。
//! 测试组构建测试用例族，测试用例是步骤的有序集合，步骤声明连接彼此的文件。
//!
//! ## Modules / 模块
//!
//! - `core` - Configuration, steps, test cases, dependency resolution and execution
//! - `infra` - Infrastructure services like command execution, file system operations and input data
//! - `reporting` - Test result reporting and visualization
//! - `cli` - Command-line interface and commands
//! - `suites` - The MPAS test groups shipped with the framework
//!
//! - `core` - 配置、步骤、测试用例、依赖解析与执行
//! - `infra` - 基础设施服务，如命令执行、文件系统操作和输入数据
//! - `reporting` - 测试结果报告和可视化
//! - `cli` - 命令行接口和命令
//! - `suites` - 随框架发布的 MPAS 测试组

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;
pub mod suites;

// Re-export commonly used items
pub use core::config;
pub use core::execution;
pub use core::models;
pub use infra::t;

/// Initializes the application's internationalization (i18n) based on the system locale.
///
/// This function detects the user's system locale and sets the appropriate
/// language for the application's user interface. It attempts to match the full
/// locale (e.g., "zh-CN"), then just the language code (e.g., "en"), and
/// finally falls back to the default language ("en").
pub fn init() {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    rust_i18n::set_locale(&match_locale(&locale));
}

/// Maps a requested locale onto one the application ships.
/// 将请求的区域设置映射到应用程序提供的区域设置。
pub fn match_locale(locale: &str) -> String {
    let available_locales = rust_i18n::available_locales!();

    // Try the full locale first (e.g., "zh-CN"), then the language part only
    // (e.g., "en" from "en-US"), finally fall back to "en".
    if available_locales.contains(&locale) {
        return locale.to_string();
    }
    locale
        .split(['-', '_'])
        .next()
        .and_then(|lang_code| available_locales.iter().find(|l| l.split('-').next() == Some(lang_code)))
        .map(|l| l.to_string())
        .unwrap_or_else(|| "en".to_string())
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
