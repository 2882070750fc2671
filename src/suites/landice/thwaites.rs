//! # Thwaites Glacier Test Group / 思韦茨冰川测试组
//!
//! Mesh generation for Thwaites Glacier and an uncertainty-quantification
//! ensemble on it. Each ensemble member runs the model with its own calving
//! parameters, spread evenly over the ranges in `[thwaites_uq]`.
//!
//! 思韦茨冰川的网格生成及其上的不确定性量化集合。每个集合成员使用各自的崩解参数
//! 运行模型，这些参数均匀分布在 `[thwaites_uq]` 给出的范围内。

use crate::core::config::ConfigCascade;
use crate::core::error::Result;
use crate::core::files::InputFile;
use crate::core::step::{Resources, Step, StepAction, Tool};
use crate::core::test_group::{CaseHandle, TestGroup};

use super::MPAS_CORE;

pub const NAME: &str = "thwaites";
const PACKAGE: &str = "landice/thwaites";
const SECTION: &str = "thwaites_uq";
const MESH_FILE: &str = "thwaites_4km_mesh_20220202.nc";
const DATABASE: &str = "landice_database";

/// Calving parameters of one ensemble member.
/// 一个集合成员的崩解参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberParameters {
    pub von_mises_threshold: f64,
    pub calving_speed_limit: f64,
}

/// Midpoint of the `index`-th of `count` equal slices of `[min, max]`.
fn stratified(min: f64, max: f64, index: usize, count: usize) -> f64 {
    min + (max - min) * (index as f64 + 0.5) / count as f64
}

/// Parameters of every member. The two parameters run through their ranges
/// in opposite directions so no two members share a pair.
///
/// 所有成员的参数。两个参数以相反方向遍历各自的范围，因此没有两个成员的参数组合相同。
pub fn member_parameters(config: &ConfigCascade) -> Result<Vec<MemberParameters>> {
    let n_runs: usize = config.get(SECTION, "n_runs")?;
    let threshold_min = config.get_float(SECTION, "von_mises_threshold_min")?;
    let threshold_max = config.get_float(SECTION, "von_mises_threshold_max")?;
    let limit_min = config.get_float(SECTION, "calv_limit_min")?;
    let limit_max = config.get_float(SECTION, "calv_limit_max")?;

    Ok((0..n_runs)
        .map(|i| MemberParameters {
            von_mises_threshold: stratified(threshold_min, threshold_max, i, n_runs),
            calving_speed_limit: stratified(limit_min, limit_max, n_runs - 1 - i, n_runs),
        })
        .collect())
}

fn member_step(index: usize, parameters: MemberParameters) -> Result<Step> {
    let name = format!("run{index:03}");
    let mut step = Step::new(
        &name,
        Resources::new(36, 4, 1),
        StepAction::tool(
            Tool::EnsembleMember,
            [
                "--run-num".to_string(),
                index.to_string(),
                "--namelist".to_string(),
                "namelist.landice".to_string(),
                "--streams".to_string(),
                "streams.landice".to_string(),
            ],
        ),
    )?
    .with_resource_options(SECTION, "member");
    step.add_input_file(InputFile::from_database("thwaites.nc", DATABASE, MESH_FILE))?;
    step.add_namelist_file(PACKAGE, "namelist.landice", "landice")?;
    step.add_namelist_options(
        "landice",
        [
            (
                "config_grounded_von_Mises_threshold_stress",
                format!("{:.1}", parameters.von_mises_threshold),
            ),
            ("config_calving_speed_limit", format!("{:.2}", parameters.calving_speed_limit)),
        ],
    )?;
    step.add_streams_file(PACKAGE, "streams.landice", "landice")?;
    step.add_streams_replacements("landice", [("output_interval", "0001-00-00_00:00:00")])?;
    step.add_output_file("output.nc")?;
    Ok(step)
}

/// Adds `thwaites_uq` with one step per ensemble member.
///
/// The number of members and the parameter ranges come from the packaged
/// `thwaites.toml`, since steps are fixed before any user config is read.
///
/// 添加 `thwaites_uq`，每个集合成员一个步骤。
/// 成员数量与参数范围来自打包的 `thwaites.toml`，因为步骤在读取用户配置之前就已确定。
pub fn add_uq_ensemble(group: &mut TestGroup) -> Result<CaseHandle> {
    let mut case = group
        .new_case("thwaites_uq", "thwaites_uq")
        .with_description("Uncertainty-quantification ensemble of calving parameters on Thwaites Glacier");
    case.add_config_file(PACKAGE, "thwaites.toml");

    let mut defaults = ConfigCascade::new();
    defaults.add_from_package(PACKAGE, "thwaites.toml")?;
    for (index, parameters) in member_parameters(&defaults)?.into_iter().enumerate() {
        case.add_step(member_step(index, parameters)?)?;
    }
    group.add_test_case(case)
}

/// Adds `mesh_gen`: the variable-resolution mesh and initial condition.
/// Basal friction is optimized outside the framework.
pub fn add_mesh_gen(group: &mut TestGroup) -> Result<CaseHandle> {
    let mut case = group
        .new_case("mesh_gen", "mesh_gen")
        .with_description("Create a variable-resolution Thwaites Glacier mesh and initial condition");
    case.add_config_file(PACKAGE, "thwaites.toml");

    let mut step = Step::new(
        "mesh",
        Resources::serial(),
        StepAction::tool(
            Tool::MaliMesh,
            [
                "--name",
                "Thwaites",
                "--from-config",
                "--bedmachine",
                "bedmachine.nc",
                "--velocity",
                "velocity.nc",
                "--outline",
                "Thwaites.geojson",
            ],
        ),
    )?
    .with_resource_options(SECTION, "mesh");
    step.add_input_file(InputFile::from_database(
        "bedmachine.nc",
        DATABASE,
        "BedMachineAntarctica_2020-07-15_v02.epsg3031.nc",
    ))?;
    step.add_input_file(InputFile::from_database(
        "velocity.nc",
        DATABASE,
        "antarctica_ice_velocity_450m_v2.epsg3031.nc",
    ))?;
    step.add_input_file(InputFile::from_package("Thwaites.geojson", PACKAGE, "Thwaites.geojson"))?;
    step.add_output_files(["Thwaites.nc", "graph.info"])?;
    case.add_step(step)?;

    group.add_test_case(case)
}

pub fn build() -> Result<TestGroup> {
    let mut group = TestGroup::new(MPAS_CORE, NAME).with_description("Thwaites Glacier, West Antarctica");
    add_mesh_gen(&mut group)?;
    add_uq_ensemble(&mut group)?;
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packaged_ranges_give_twenty_members() {
        let mut config = ConfigCascade::new();
        config.add_from_package(PACKAGE, "thwaites.toml").unwrap();
        let members = member_parameters(&config).unwrap();
        assert_eq!(members.len(), 20);
        assert!((members[0].von_mises_threshold - 155.0e3).abs() < 1e-6);
        assert!((members[19].calving_speed_limit - 22.0).abs() < 1e-9);
        assert!(members.iter().all(|m| (150.0e3..=350.0e3).contains(&m.von_mises_threshold)));
    }

    #[test]
    fn test_uq_case_has_one_step_per_member() {
        let group = build().unwrap();
        let (_, case) = group.get("thwaites_uq").unwrap();
        assert_eq!(case.steps().len(), 20);
        assert!(case.step("run019").is_some());
    }

    #[test]
    fn test_mesh_gen_resolves_from_its_own_inputs() {
        let group = build().unwrap();
        let (handle, case) = group.get("mesh_gen").unwrap();
        let mesh = case.step("mesh").unwrap();
        assert_eq!(mesh.inputs().len(), 3);

        let resolved = group.resolve(handle).unwrap();
        assert_eq!(resolved.order, ["mesh"]);
        assert!(resolved.dependencies["mesh"].is_empty());
    }
}
