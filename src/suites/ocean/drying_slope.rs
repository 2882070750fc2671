//! # Drying Slope Test Group / 干涸斜坡测试组
//!
//! Wetting and drying on a planar slope, for two resolutions and two kinds
//! of vertical coordinate.
//!
//! 平面斜坡上的湿润与干涸过程，包含两种分辨率和两种垂直坐标。

use std::fmt;

use crate::core::error::Result;
use crate::core::files::InputFile;
use crate::core::step::{Resources, Step, StepAction, Tool};
use crate::core::test_case::Comparison;
use crate::core::test_group::{CaseHandle, TestGroup};

pub const NAME: &str = "drying_slope";
const PACKAGE: &str = "ocean/drying_slope";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Km0_25,
    Km1,
}

impl Resolution {
    pub const ALL: [Resolution; 2] = [Resolution::Km0_25, Resolution::Km1];

    /// Cell size in meters and number of rows along the slope.
    fn planar_mesh(&self) -> (&'static str, &'static str) {
        match self {
            Resolution::Km0_25 => ("250.0", "104"),
            Resolution::Km1 => ("1000.0", "26"),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Km0_25 => f.write_str("0.25km"),
            Resolution::Km1 => f.write_str("1km"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordType {
    Sigma,
    SingleLayer,
}

impl CoordType {
    pub const ALL: [CoordType; 2] = [CoordType::Sigma, CoordType::SingleLayer];

    fn vert_levels(&self) -> &'static str {
        match self {
            CoordType::Sigma => "10",
            CoordType::SingleLayer => "1",
        }
    }
}

impl fmt::Display for CoordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordType::Sigma => f.write_str("sigma"),
            CoordType::SingleLayer => f.write_str("single_layer"),
        }
    }
}

/// Adds `<resolution>/<coord_type>/default`.
/// 添加 `<resolution>/<coord_type>/default`。
pub fn add_default(group: &mut TestGroup, resolution: Resolution, coord_type: CoordType) -> Result<CaseHandle> {
    let subdir = format!("{resolution}/{coord_type}/default");
    let mut case = group
        .new_case("default", &subdir)
        .with_description(format!("Drying slope at {resolution} with {coord_type} coordinates"));
    case.add_config_file(PACKAGE, "drying_slope.toml");
    let case_path = case.path();

    let (dc, ny) = resolution.planar_mesh();
    let mut base_mesh = Step::new(
        "base_mesh",
        Resources::serial(),
        StepAction::tool(
            Tool::BaseMesh,
            ["planar_hex", "--nx", "6", "--ny", ny, "--dc", dc, "--output", "base_mesh.nc"],
        ),
    )?;
    base_mesh.add_output_file("base_mesh.nc")?;
    case.add_step(base_mesh)?;

    let mut init = Step::new(
        "initial_state",
        Resources::serial(),
        StepAction::run_model("init", "base_mesh.nc"),
    )?;
    init.add_input_file(InputFile::link("base_mesh.nc", case_path.join("base_mesh/base_mesh.nc")))?;
    init.add_namelist_file(PACKAGE, "namelist.init", "init")?;
    init.add_namelist_options(
        "init",
        [
            ("config_drying_slope_coord_type", format!("'{coord_type}'")),
            ("config_vert_levels", coord_type.vert_levels().to_string()),
        ],
    )?;
    init.add_streams_file(PACKAGE, "streams.init", "init")?;
    init.add_output_file("initial_state.nc")?;
    case.add_step(init)?;

    let mut forward = Step::new("forward", Resources::new(4, 1, 1), StepAction::run_model("forward", "init.nc"))?
        .with_resource_options("drying_slope", "forward");
    forward.add_input_file(InputFile::link(
        "init.nc",
        case_path.join("initial_state/initial_state.nc"),
    ))?;
    forward.add_namelist_file(PACKAGE, "namelist.forward", "forward")?;
    forward.add_streams_file(PACKAGE, "streams.forward", "forward")?;
    forward.add_streams_replacements("forward", [("output_interval", "0000_01:00:00")])?;
    forward.add_output_file("output.nc")?;
    case.add_step(forward)?;

    case.add_validation(Comparison::new(
        ["layerThickness", "normalVelocity"],
        "forward/output.nc",
        None,
    ));
    group.add_test_case(case)
}

pub fn build() -> Result<TestGroup> {
    let mut group = TestGroup::new("ocean", NAME).with_description("Wetting and drying on a planar slope");
    for resolution in Resolution::ALL {
        for coord_type in CoordType::ALL {
            add_default(&mut group, resolution, coord_type)?;
        }
    }
    Ok(group)
}
