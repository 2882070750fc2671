//! Initial conditions on a culled mesh, interpolated by the model in init mode.
//! 在剔除后的网格上由模型在初始化模式下插值得到的初始条件。

use std::path::PathBuf;
use std::sync::Arc;

use crate::core::error::Result;
use crate::core::files::InputFile;
use crate::core::step::{Resources, Step, StepAction};
use crate::core::test_case::Comparison;
use crate::core::test_group::{CaseHandle, TestGroup};

use super::mesh::{GlobalOceanConfig, MeshCase};
use super::{InitialCondition, PACKAGE};

#[derive(Debug, Clone)]
pub struct InitCase {
    pub initial_condition: InitialCondition,
    pub handle: CaseHandle,
    pub path: PathBuf,
}

impl InitCase {
    pub fn initial_state(&self) -> PathBuf {
        self.path.join("initial_state/initial_state.nc")
    }
}

/// Adds `<mesh>/<ic>/init` after the mesh test case.
/// 在网格测试用例之后添加 `<mesh>/<ic>/init`。
pub fn add_init(group: &mut TestGroup, mesh: &MeshCase, initial_condition: InitialCondition) -> Result<InitCase> {
    let subdir = format!("{}/{initial_condition}/init", mesh.name);
    let mut case = group
        .new_case("init", &subdir)
        .with_description(format!("{initial_condition} initial condition on the {} mesh", mesh.name))
        .with_hooks(Arc::new(GlobalOceanConfig {
            mesh: mesh.name,
            remap_topography: mesh.remap_topography,
            initial_condition: Some(initial_condition),
        }));
    case.add_config_file(PACKAGE, "global_ocean.toml");

    let mut step = Step::new("initial_state", Resources::new(4, 1, 1), StepAction::run_model("init", "mesh.nc"))?
        .with_resource_options("global_ocean", "init");
    step.add_input_file(InputFile::link("mesh.nc", mesh.culled_mesh()))?;
    if let Some(topography) = mesh.remapped_topography() {
        step.add_input_file(InputFile::link("topography.nc", topography))?;
    }
    let (temperature, salinity) = initial_condition.database_files();
    step.add_input_file(InputFile::from_database(
        "temperature.nc",
        "initial_condition_database",
        temperature,
    ))?;
    step.add_input_file(InputFile::from_database(
        "salinity.nc",
        "initial_condition_database",
        salinity,
    ))?;
    step.add_namelist_file(PACKAGE, "namelist.init", "init")?;
    step.add_streams_file(PACKAGE, "streams.init", "init")?;
    step.add_output_file("initial_state.nc")?;
    case.add_step(step)?;

    case.add_validation(Comparison::new(
        ["temperature", "salinity", "layerThickness"],
        "initial_state/initial_state.nc",
        None,
    ));

    let path = case.path();
    let handle = group.add_test_case_after(case, &[mesh.handle])?;
    Ok(InitCase {
        initial_condition,
        handle,
        path,
    })
}
