//! Variable-resolution mesh of the Greenland ice sheet.
//! 格陵兰冰盖的变分辨率网格。

use crate::core::error::Result;
use crate::core::files::InputFile;
use crate::core::step::{Resources, Step, StepAction, Tool};
use crate::core::test_group::{CaseHandle, TestGroup};

use super::MPAS_CORE;

pub const NAME: &str = "greenland";
const PACKAGE: &str = "landice/greenland";

fn add_mesh_gen(group: &mut TestGroup) -> Result<CaseHandle> {
    let mut case = group
        .new_case("mesh_gen", "mesh_gen")
        .with_description("Create a variable-resolution Greenland mesh from BedMachine and measures data");
    case.add_config_file(PACKAGE, "greenland.toml");

    let mut step = Step::new(
        "mesh",
        Resources::serial(),
        StepAction::tool(
            Tool::MaliMesh,
            [
                "--name",
                "GIS",
                "--from-config",
                "--bedmachine",
                "bedmachine.nc",
                "--velocity",
                "velocity.nc",
                "--outline",
                "greenland_only_outline.geojson",
            ],
        ),
    )?
    .with_resource_options("greenland", "mesh");
    step.add_input_file(InputFile::from_database(
        "bedmachine.nc",
        "landice_database",
        "greenland_1km_2020_04_20.epsg3413.icesheetonly.nc",
    ))?;
    step.add_input_file(InputFile::from_database(
        "velocity.nc",
        "landice_database",
        "greenland_2km_2020_04_20.epsg3413.nc",
    ))?;
    step.add_input_file(InputFile::from_package(
        "greenland_only_outline.geojson",
        PACKAGE,
        "greenland_only_outline.geojson",
    ))?;
    step.add_output_files(["GIS.nc", "graph.info"])?;
    case.add_step(step)?;

    group.add_test_case(case)
}

pub fn build() -> Result<TestGroup> {
    let mut group = TestGroup::new(MPAS_CORE, NAME).with_description("Greenland ice sheet");
    add_mesh_gen(&mut group)?;
    Ok(group)
}
