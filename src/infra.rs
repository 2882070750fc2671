//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for the framework,
//! including command execution, work-directory handling, packaged resources,
//! the input-data database and logging.
//!
//! 此模块为框架提供基础设施服务，
//! 包括命令执行、工作目录处理、打包资源、输入数据库和日志。

pub mod command;
pub mod database;
pub mod fs;
pub mod logging;
pub mod resources;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
