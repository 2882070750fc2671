//! Test groups of the MPAS-Ocean core.
//! MPAS-Ocean 核心的测试组。

pub mod drying_slope;
pub mod global_ocean;
pub mod hurricane;

use crate::core::error::Result;
use crate::core::registry::Registry;

pub fn register(registry: &mut Registry) -> Result<()> {
    registry.add_test_group(drying_slope::build()?)?;
    registry.add_test_group(global_ocean::build()?)?;
    registry.add_test_group(hurricane::build()?)?;
    Ok(())
}
