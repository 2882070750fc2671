//! # Humboldt Glacier Test Group / 洪堡冰川测试组
//!
//! A regional mesh of Humboldt Glacier in northern Greenland and the
//! decomposition and restart tests run on it, for each combination of mesh
//! resolution, velocity solver and calving physics.
//!
//! 格陵兰北部洪堡冰川的区域网格，以及在其上针对各种网格分辨率、
//! 速度求解器与崩解物理组合运行的分解测试和重启测试。

use std::fmt;
use std::str::FromStr;

use crate::core::error::{Error, Result};
use crate::core::files::InputFile;
use crate::core::step::{Resources, Step, StepAction, Tool};
use crate::core::test_case::{Comparison, TestCase};
use crate::core::test_group::{CaseHandle, TestGroup};

use super::MPAS_CORE;

pub const NAME: &str = "humboldt";
const PACKAGE: &str = "landice/humboldt";
const DATABASE: &str = "landice_database";

const COMPARED_VARIABLES: [&str; 2] = ["thickness", "surfaceSpeed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshType {
    Km1,
    Km3,
}

impl MeshType {
    /// Prebuilt mesh and ISMIP6 forcing file for this resolution.
    fn files(&self) -> (&'static str, &'static str) {
        match self {
            MeshType::Km1 => (
                "Humboldt_1to10km_r04_20210615.nc",
                "Humboldt_1to10km_MIROC5-rcp85_ismip-gis.nc",
            ),
            MeshType::Km3 => (
                "Humboldt_3to30km_r04_20210615.nc",
                "Humboldt_3to30km_MIROC5-rcp85_ismip6-gis.nc",
            ),
        }
    }
}

impl fmt::Display for MeshType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshType::Km1 => f.write_str("1km"),
            MeshType::Km3 => f.write_str("3km"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VeloSolver {
    Sia,
    Fo,
    None,
}

impl fmt::Display for VeloSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VeloSolver::Sia => f.write_str("sia"),
            VeloSolver::Fo => f.write_str("FO"),
            VeloSolver::None => f.write_str("none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalvingLaw {
    None,
    Floating,
    Eigencalving,
    SpecifiedCalvingVelocity,
    VonMisesStress,
    DamageCalving,
    Ismip6Retreat,
}

impl fmt::Display for CalvingLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CalvingLaw::None => "none",
            CalvingLaw::Floating => "floating",
            CalvingLaw::Eigencalving => "eigencalving",
            CalvingLaw::SpecifiedCalvingVelocity => "specified_calving_velocity",
            CalvingLaw::VonMisesStress => "von_Mises_stress",
            CalvingLaw::DamageCalving => "damagecalving",
            CalvingLaw::Ismip6Retreat => "ismip6_retreat",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Damage {
    None,
    Threshold,
}

impl fmt::Display for Damage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Damage::None => f.write_str("none"),
            Damage::Threshold => f.write_str("threshold"),
        }
    }
}

impl VeloSolver {
    pub const ALL: [VeloSolver; 3] = [VeloSolver::Sia, VeloSolver::Fo, VeloSolver::None];
}

impl CalvingLaw {
    pub const ALL: [CalvingLaw; 7] = [
        CalvingLaw::None,
        CalvingLaw::Floating,
        CalvingLaw::Eigencalving,
        CalvingLaw::SpecifiedCalvingVelocity,
        CalvingLaw::VonMisesStress,
        CalvingLaw::DamageCalving,
        CalvingLaw::Ismip6Retreat,
    ];
}

impl Damage {
    pub const ALL: [Damage; 2] = [Damage::None, Damage::Threshold];
}

/// Parses a choice by its display name, listing the allowed names on error.
/// 按显示名称解析选项，出错时列出允许的名称。
fn parse_choice<T: fmt::Display + Copy>(context: &str, value: &str, all: &[T]) -> Result<T> {
    all.iter()
        .copied()
        .find(|choice| choice.to_string() == value)
        .ok_or_else(|| Error::InvalidChoice {
            context: context.to_string(),
            value: value.to_string(),
            allowed: all.iter().map(ToString::to_string).collect(),
        })
}

impl FromStr for VeloSolver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice("velocity solver", s, &Self::ALL)
    }
}

impl FromStr for CalvingLaw {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice("calving law", s, &Self::ALL)
    }
}

impl FromStr for Damage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_choice("damage", s, &Self::ALL)
    }
}

/// Physics of one Humboldt model run.
/// 一次洪堡模型运行的物理设置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Physics {
    pub mesh_type: MeshType,
    pub velo_solver: VeloSolver,
    pub calving_law: CalvingLaw,
    pub damage: Damage,
    pub face_melt: bool,
}

impl Physics {
    pub fn new(mesh_type: MeshType, velo_solver: VeloSolver) -> Self {
        Self {
            mesh_type,
            velo_solver,
            calving_law: CalvingLaw::None,
            damage: Damage::None,
            face_melt: false,
        }
    }

    /// Full physics: von Mises calving, damage threshold calving and face melt.
    pub fn full(mesh_type: MeshType, velo_solver: VeloSolver) -> Self {
        Self {
            calving_law: CalvingLaw::VonMisesStress,
            damage: Damage::Threshold,
            face_melt: true,
            ..Self::new(mesh_type, velo_solver)
        }
    }

    /// Directory holding the test cases with these physics, e.g.
    /// `3km_FO_von_Mises_stress_damagethreshold_facemelting`.
    pub fn subdir(&self) -> String {
        let mut name = format!("{}_{}", self.mesh_type, self.velo_solver);
        if self.calving_law != CalvingLaw::None {
            name.push_str(&format!("_{}", self.calving_law));
        }
        if self.damage != Damage::None {
            name.push_str(&format!("_damage{}", self.damage));
        }
        if self.face_melt {
            name.push_str("_facemelting");
        }
        name
    }

    fn namelist_options(&self) -> Vec<(&'static str, String)> {
        let mut options = vec![
            ("config_velocity_solver", format!("'{}'", self.velo_solver)),
            ("config_calving", format!("'{}'", self.calving_law)),
        ];
        if self.damage == Damage::Threshold {
            options.extend([
                ("config_calculate_damage", ".true.".to_string()),
                ("config_damage_calving_method", "'threshold'".to_string()),
                ("config_damage_calving_threshold", "0.5".to_string()),
            ]);
        }
        if self.face_melt {
            options.push(("config_front_mass_bal_grounded", "'ismip6'".to_string()));
            if self.mesh_type == MeshType::Km3 {
                options.push(("config_dt", "'0000-06-00_00:00:00'".to_string()));
            }
        }
        options
    }
}

/// A model run on a prebuilt Humboldt mesh, once per namelist suffix.
///
/// Each suffix gets `namelist.<suffix>` and `streams.<suffix>` with the
/// options of `physics`; callers adjust individual suffixes afterwards.
///
/// 在预先构建的洪堡网格上的模型运行，每个 namelist 后缀运行一次。
/// 每个后缀都会得到带有 `physics` 选项的 `namelist.<suffix>` 和 `streams.<suffix>`；
/// 调用方随后可以调整单个后缀。
pub fn run_model_step(name: &str, physics: Physics, suffixes: &[&str], resources: Option<Resources>) -> Result<Step> {
    let (mesh_file, forcing_file) = physics.mesh_type.files();
    let action = StepAction::RunModel {
        suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
        graph_mesh: Some(mesh_file.to_string()),
    };
    let mut step = match resources {
        Some(resources) => Step::new(name, resources, action)?,
        None => Step::new(name, Resources::new(4, 1, 1), action)?.with_resource_options(NAME, "run"),
    };

    step.add_input_file(InputFile::from_database(mesh_file, DATABASE, mesh_file))?;
    step.add_input_file(InputFile::from_database(forcing_file, DATABASE, forcing_file))?;
    if physics.velo_solver == VeloSolver::Fo {
        step.add_input_file(InputFile::from_package("albany_input.yaml", PACKAGE, "albany_input.yaml"))?;
    }

    for suffix in suffixes {
        step.add_namelist_file(PACKAGE, "namelist.landice", suffix)?;
        step.add_namelist_options(suffix, physics.namelist_options())?;
        step.add_streams_file(PACKAGE, "streams.landice.template", suffix)?;
        step.add_streams_replacements(
            suffix,
            [("HUMBOLDT_INPUT_FILE", mesh_file), ("HUMBOLDT_FORCING_FILE", forcing_file)],
        )?;
    }
    step.add_output_file("output.nc")?;
    Ok(step)
}

fn add_mesh_gen(group: &mut TestGroup) -> Result<CaseHandle> {
    let mut case = group
        .new_case("mesh_gen", "mesh_gen")
        .with_description("Create a variable-resolution Humboldt Glacier mesh");
    case.add_config_file(PACKAGE, "humboldt.toml");

    let mut step = Step::new(
        "mesh",
        Resources::serial(),
        StepAction::tool(
            Tool::MaliMesh,
            [
                "--name",
                "Humboldt",
                "--from-config",
                "--bedmachine",
                "bedmachine.nc",
                "--velocity",
                "velocity.nc",
                "--outline",
                "Humboldt.geojson",
            ],
        ),
    )?;
    step.add_input_file(InputFile::from_database(
        "bedmachine.nc",
        DATABASE,
        "humboldt_1km_2020_04_20.epsg3413.icesheetonly.nc",
    ))?;
    step.add_input_file(InputFile::from_database(
        "velocity.nc",
        DATABASE,
        "greenland_2km_2020_04_20.epsg3413.nc",
    ))?;
    step.add_input_file(InputFile::from_package("Humboldt.geojson", PACKAGE, "Humboldt.geojson"))?;
    step.add_output_files(["Humboldt.nc", "graph.info"])?;
    case.add_step(step)?;

    group.add_test_case(case)
}

fn new_case(group: &TestGroup, physics: Physics, name: &str, description: String) -> TestCase {
    let subdir = format!("{}/{name}", physics.subdir());
    let mut case = group
        .new_case(name, &subdir)
        .with_description(description);
    case.add_config_file(PACKAGE, "humboldt.toml");
    case
}

/// Adds `<physics>/decomposition_test`: the same run on 1 and 4 tasks.
/// 添加 `<physics>/decomposition_test`：分别用 1 个和 4 个任务进行相同的运行。
pub fn add_decomposition_test(group: &mut TestGroup, physics: Physics) -> Result<CaseHandle> {
    let mut case = new_case(
        group,
        physics,
        "decomposition_test",
        format!("Decomposition test on the {} Humboldt mesh", physics.mesh_type),
    );
    for ntasks in [1, 4] {
        let name = format!("{ntasks}proc_run");
        let step = run_model_step(&name, physics, &["landice"], Some(Resources::new(ntasks, ntasks, 1)))?;
        case.add_step(step)?;
    }
    case.add_validation(Comparison::new(
        COMPARED_VARIABLES,
        "1proc_run/output.nc",
        Some("4proc_run/output.nc"),
    ));
    group.add_test_case(case)
}

/// Adds `<physics>/restart_test`: a two-year run against a one-year run
/// followed by a one-year restart.
///
/// 添加 `<physics>/restart_test`：两年的完整运行与一年运行加一年重启运行的对比。
pub fn add_restart_test(group: &mut TestGroup, physics: Physics) -> Result<CaseHandle> {
    let mut case = new_case(
        group,
        physics,
        "restart_test",
        format!("Restart test on the {} Humboldt mesh", physics.mesh_type),
    );

    let full = run_model_step("full_run", physics, &["landice"], None)?;
    case.add_step(full)?;

    let mut restart = run_model_step("restart_run", physics, &["landice", "landice.rst"], None)?;
    restart.add_namelist_options("landice", [("config_run_duration", "'0001-00-00_00:00:00'")])?;
    restart.add_namelist_options(
        "landice.rst",
        [
            ("config_do_restart", ".true."),
            ("config_run_duration", "'0001-00-00_00:00:00'"),
        ],
    )?;
    case.add_step(restart)?;

    case.add_validation(Comparison::new(
        COMPARED_VARIABLES,
        "full_run/output.nc",
        Some("restart_run/output.nc"),
    ));
    group.add_test_case(case)
}

pub fn build() -> Result<TestGroup> {
    let mut group = TestGroup::new(MPAS_CORE, NAME).with_description("Humboldt Glacier, northern Greenland");
    add_mesh_gen(&mut group)?;

    let mut physics = Vec::new();
    for mesh_type in [MeshType::Km1, MeshType::Km3] {
        for solver in [VeloSolver::Sia, VeloSolver::Fo] {
            physics.push(Physics::new(mesh_type, solver));
        }
    }
    physics.push(Physics::full(MeshType::Km3, VeloSolver::Fo));

    for p in physics {
        add_decomposition_test(&mut group, p)?;
        add_restart_test(&mut group, p)?;
    }
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physics_subdir() {
        assert_eq!(Physics::new(MeshType::Km1, VeloSolver::Sia).subdir(), "1km_sia");
        assert_eq!(
            Physics::full(MeshType::Km3, VeloSolver::Fo).subdir(),
            "3km_FO_von_Mises_stress_damagethreshold_facemelting"
        );
    }

    #[test]
    fn test_face_melt_shortens_time_step_on_coarse_mesh() {
        let options = Physics::full(MeshType::Km3, VeloSolver::Fo).namelist_options();
        assert!(options.iter().any(|(k, v)| *k == "config_dt" && v == "'0000-06-00_00:00:00'"));
        let options = Physics::full(MeshType::Km1, VeloSolver::Fo).namelist_options();
        assert!(!options.iter().any(|(k, _)| *k == "config_dt"));
    }

    #[test]
    fn test_choices_are_validated() {
        assert_eq!("FO".parse::<VeloSolver>().unwrap(), VeloSolver::Fo);
        assert_eq!("von_Mises_stress".parse::<CalvingLaw>().unwrap(), CalvingLaw::VonMisesStress);
        let err = "fo".parse::<VeloSolver>().unwrap_err();
        assert!(matches!(err, Error::InvalidChoice { ref allowed, .. } if allowed.len() == 3));
        assert!("damage".parse::<Damage>().is_err());
    }
}
