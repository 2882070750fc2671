//! # Hurricane Test Group / 飓风测试组
//!
//! Meshes for storm-surge simulations on the US east coast.
//! 用于美国东海岸风暴潮模拟的网格。

use std::sync::Arc;

use crate::core::config::ConfigCascade;
use crate::core::error::{Error, Result};
use crate::core::files::InputFile;
use crate::core::step::{Resources, Step, StepAction, Tool};
use crate::core::test_case::{Comparison, TestCaseHooks};
use crate::core::test_group::{CaseHandle, TestGroup};

pub const NAME: &str = "hurricane";
const PACKAGE: &str = "ocean/hurricane";

/// The Delaware-refined mesh, optionally keeping the floodplain for wetting
/// and drying (`WD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HurricaneMesh {
    pub preserve_floodplain: bool,
}

impl HurricaneMesh {
    pub fn name(&self) -> &'static str {
        if self.preserve_floodplain {
            "DEQU120at30cr10rr2WD"
        } else {
            "DEQU120at30cr10rr2"
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "DEQU120at30cr10rr2" => Ok(Self {
                preserve_floodplain: false,
            }),
            "DEQU120at30cr10rr2WD" => Ok(Self {
                preserve_floodplain: true,
            }),
            _ => Err(Error::UnknownMesh(name.to_string())),
        }
    }
}

impl TestCaseHooks for HurricaneMesh {
    fn configure(&self, config: &mut ConfigCascade) -> Result<()> {
        config.add_from_package("mesh", "mesh.toml")?;
        config.add_from_package(PACKAGE, "mesh/dequ120at30cr10rr2.toml")?;
        config.set("spherical_mesh", "preserve_floodplain", self.preserve_floodplain)?;
        Ok(())
    }
}

/// Adds `<mesh>/mesh`.
pub fn add_mesh(group: &mut TestGroup, mesh: HurricaneMesh) -> Result<CaseHandle> {
    let subdir = format!("{}/mesh", mesh.name());
    let mut case = group
        .new_case("mesh", &subdir)
        .with_description(format!("Create the {} mesh", mesh.name()))
        .with_hooks(Arc::new(mesh));
    case.add_config_file(PACKAGE, "hurricane.toml");

    let mut base_args = vec!["cell_width_function", "--mesh", "DEQU120at30cr10rr2", "--output", "base_mesh.nc"];
    if mesh.preserve_floodplain {
        base_args.push("--preserve-floodplain");
    }
    let mut base_mesh = Step::new("base_mesh", Resources::serial(), StepAction::tool(Tool::BaseMesh, base_args))?;
    base_mesh.add_output_file("base_mesh.nc")?;
    case.add_step(base_mesh)?;

    let mut cull_args = vec![
        "--input",
        "../base_mesh/base_mesh.nc",
        "--output",
        "culled_mesh.nc",
        "--inject-bathymetry",
        "earth_relief.nc",
    ];
    if mesh.preserve_floodplain {
        cull_args.push("--preserve-floodplain");
    }
    let mut cull = Step::new("cull_mesh", Resources::serial(), StepAction::tool(Tool::CullMesh, cull_args))?;
    cull.add_input_file(InputFile::local("../base_mesh/base_mesh.nc"))?;
    cull.add_input_file(InputFile::from_database(
        "earth_relief.nc",
        "bathymetry_database",
        "SRTM15_plus_earth_relief_15s.nc",
    ))?;
    cull.add_output_files(["culled_mesh.nc", "culled_graph.info"])?;
    case.add_step(cull)?;

    case.add_validation(Comparison::new(["xCell", "yCell", "zCell"], "cull_mesh/culled_mesh.nc", None));
    group.add_test_case(case)
}

pub fn build() -> Result<TestGroup> {
    let mut group = TestGroup::new("ocean", NAME).with_description("Storm surge on the US east coast");
    for name in ["DEQU120at30cr10rr2", "DEQU120at30cr10rr2WD"] {
        add_mesh(&mut group, HurricaneMesh::from_name(name)?)?;
    }
    Ok(group)
}
