//! # Test Suites Module / 测试套件模块
//!
//! The test groups shipped with the framework, one module per MPAS core.
//! 随框架发布的测试组，每个 MPAS 核心一个模块。

pub mod landice;
pub mod ocean;

use crate::core::error::Result;
use crate::core::registry::Registry;

/// Adds every shipped test group to `registry`.
/// 将所有随附的测试组添加到 `registry`。
pub fn register(registry: &mut Registry) -> Result<()> {
    landice::register(registry)?;
    ocean::register(registry)?;
    Ok(())
}
