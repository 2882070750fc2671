//! Support files for E3SM from a mesh, its initial condition and the end of
//! its dynamic adjustment.
//!
//! 根据网格、其初始条件以及动力调整的最终状态生成 E3SM 支持文件。

use std::sync::Arc;

use crate::core::error::Result;
use crate::core::files::InputFile;
use crate::core::step::{Resources, Step, StepAction, Tool};
use crate::core::test_group::{CaseHandle, TestGroup};

use super::dynamic_adjustment::AdjustmentCase;
use super::init::InitCase;
use super::mesh::{GlobalOceanConfig, MeshCase};
use super::{PACKAGE, TimeIntegrator};

const NAME: &str = "files_for_e3sm";

/// Adds `<mesh>/<ic>/<time_integrator>/files_for_e3sm`.
pub fn add_files_for_e3sm(
    group: &mut TestGroup,
    mesh: &MeshCase,
    init: &InitCase,
    adjustment: &AdjustmentCase,
    data_ice_shelf_melt: Option<CaseHandle>,
) -> Result<CaseHandle> {
    let subdir = format!(
        "{}/{}/{}/{NAME}",
        mesh.name,
        init.initial_condition,
        TimeIntegrator::SplitExplicit
    );
    let mut case = group
        .new_case(NAME, &subdir)
        .with_description(format!("E3SM support files for the {} mesh", mesh.name))
        .with_hooks(Arc::new(GlobalOceanConfig {
            mesh: mesh.name,
            remap_topography: mesh.remap_topography,
            initial_condition: Some(init.initial_condition),
        }));
    case.add_config_file(PACKAGE, "global_ocean.toml");

    let mut args = vec![
        "--mesh".to_string(),
        "culled_mesh.nc".to_string(),
        "--graph".to_string(),
        "culled_graph.info".to_string(),
        "--initial-state".to_string(),
        "initial_state.nc".to_string(),
        "--mesh-name".to_string(),
        mesh.name.to_string(),
    ];
    if adjustment.final_restart.is_some() {
        args.extend(["--restart".to_string(), "restart.nc".to_string()]);
    }
    if mesh.name.ice_shelf_cavities {
        args.push("--with-ice-shelf-cavities".to_string());
    }

    let mut step = Step::new(NAME, Resources::serial(), StepAction::tool(Tool::E3smFiles, args))?;
    step.add_input_file(InputFile::link("culled_mesh.nc", mesh.culled_mesh()))?;
    step.add_input_file(InputFile::link("culled_graph.info", mesh.culled_graph()))?;
    step.add_input_file(InputFile::link("initial_state.nc", init.initial_state()))?;
    if let Some(restart) = &adjustment.final_restart {
        step.add_input_file(InputFile::link("restart.nc", restart))?;
    }
    case.add_step(step)?;

    let mut upstream = vec![mesh.handle, init.handle, adjustment.handle];
    upstream.extend(data_ice_shelf_melt);
    group.add_test_case_after(case, &upstream)
}

/// Adds the `files_for_e3sm` test case that works from an existing mesh
/// named in the user's config (`[files_for_e3sm]`).
///
/// 添加基于用户配置（`[files_for_e3sm]`）中指定的现有网格运行的 `files_for_e3sm` 测试用例。
pub fn add_standalone(group: &mut TestGroup) -> Result<CaseHandle> {
    let mut case = group
        .new_case(NAME, NAME)
        .with_description("E3SM support files from an existing mesh and initial condition");
    case.add_config_file(PACKAGE, "global_ocean.toml");
    let step = Step::new(
        NAME,
        Resources::serial(),
        StepAction::tool(Tool::E3smFiles, ["--from-config"]),
    )?;
    case.add_step(step)?;
    group.add_test_case(case)
}
