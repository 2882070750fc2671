//! Test groups of MALI, the MPAS land-ice core.
//! MALI（MPAS 陆冰核心）的测试组。

pub mod greenland;
pub mod humboldt;
pub mod thwaites;

use crate::core::error::Result;
use crate::core::registry::Registry;

pub const MPAS_CORE: &str = "landice";

pub fn register(registry: &mut Registry) -> Result<()> {
    registry.add_test_group(greenland::build()?)?;
    registry.add_test_group(humboldt::build()?)?;
    registry.add_test_group(thwaites::build()?)?;
    Ok(())
}
