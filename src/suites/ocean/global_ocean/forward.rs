//! Forward model runs from an initial condition and the regression tests built
//! from them.
//!
//! 从初始条件出发的前向模型运行，以及基于它们构建的回归测试。

use std::sync::Arc;

use crate::core::error::Result;
use crate::core::files::InputFile;
use crate::core::step::{Resources, Step, StepAction};
use crate::core::test_case::{Comparison, TestCase};
use crate::core::test_group::{CaseHandle, TestGroup};

use super::init::InitCase;
use super::mesh::{GlobalOceanConfig, MeshCase};
use super::{PACKAGE, TimeIntegrator};

/// Variables compared by every forward regression test.
pub const PROGNOSTIC_VARIABLES: [&str; 4] = ["temperature", "salinity", "layerThickness", "normalVelocity"];

const RESTART_TIME: &str = "0001-01-01_01:00:00";

/// The forward test cases of a mesh / initial condition / time integrator.
/// 网格 / 初始条件 / 时间积分器组合下的前向测试用例。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardTest {
    Performance,
    Restart,
    Decomp,
    Threads,
    Analysis,
    DailyOutput,
    MonthlyOutput,
    DataIceShelfMelt,
}

impl ForwardTest {
    /// Added for meshes with regression testing, after the performance test.
    pub const REGRESSION: [ForwardTest; 6] = [
        ForwardTest::Restart,
        ForwardTest::Decomp,
        ForwardTest::Threads,
        ForwardTest::Analysis,
        ForwardTest::DailyOutput,
        ForwardTest::MonthlyOutput,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ForwardTest::Performance => "performance_test",
            ForwardTest::Restart => "restart_test",
            ForwardTest::Decomp => "decomp_test",
            ForwardTest::Threads => "threads_test",
            ForwardTest::Analysis => "analysis_test",
            ForwardTest::DailyOutput => "daily_output_test",
            ForwardTest::MonthlyOutput => "monthly_output_test",
            ForwardTest::DataIceShelfMelt => "data_ice_shelf_melt",
        }
    }
}

/// Path of a restart file written at `time`, relative to a step directory.
/// 在 `time` 时刻写入的重启文件的路径（相对于步骤目录）。
pub fn restart_filename(time: &str) -> String {
    format!("../restarts/rst.{}.nc", time.replace(':', "."))
}

/// A model run from the initial state of `init`.
///
/// Without explicit `resources` the step takes `[global_ocean] forward_*`
/// from the config.
///
/// 从 `init` 的初始状态开始的一次模型运行。
/// 若未显式给出 `resources`，则从配置中的 `[global_ocean] forward_*` 读取。
pub fn forward_step(name: &str, init: &InitCase, time_integrator: TimeIntegrator, resources: Option<Resources>) -> Result<Step> {
    let mut step = match resources {
        Some(resources) => Step::new(name, resources, StepAction::run_model("forward", "init.nc"))?,
        None => Step::new(name, Resources::new(4, 1, 1), StepAction::run_model("forward", "init.nc"))?
            .with_resource_options("global_ocean", "forward"),
    };
    step.add_input_file(InputFile::link("init.nc", init.initial_state()))?;
    step.add_namelist_file(PACKAGE, "namelist.forward", "forward")?;
    step.add_namelist_options("forward", time_integrator.namelist_options())?;
    step.add_streams_file(PACKAGE, "streams.forward", "forward")?;
    step.add_streams_replacements(
        "forward",
        [("output_interval", "0000_01:00:00"), ("restart_interval", "0030_00:00:00")],
    )?;
    Ok(step)
}

fn short_run(name: &str, init: &InitCase, ti: TimeIntegrator, resources: Option<Resources>) -> Result<Step> {
    let mut step = forward_step(name, init, ti, resources)?;
    step.add_output_file("output.nc")?;
    Ok(step)
}

fn compare_steps(case: &mut TestCase, first: &str, second: &str) {
    let filename2 = format!("{second}/output.nc");
    case.add_validation(Comparison::new(
        PROGNOSTIC_VARIABLES,
        format!("{first}/output.nc"),
        Some(filename2.as_str()),
    ));
}

fn compare_with_baseline(case: &mut TestCase, step: &str) {
    case.add_validation(Comparison::new(PROGNOSTIC_VARIABLES, format!("{step}/output.nc"), None));
}

/// Adds `<mesh>/<ic>/<time_integrator>/<test>` after the mesh and init test cases.
/// 在网格与初始化测试用例之后添加 `<mesh>/<ic>/<time_integrator>/<test>`。
pub fn add_forward_test(
    group: &mut TestGroup,
    mesh: &MeshCase,
    init: &InitCase,
    time_integrator: TimeIntegrator,
    test: ForwardTest,
) -> Result<CaseHandle> {
    let name = test.name();
    let subdir = format!("{}/{}/{time_integrator}/{name}", mesh.name, init.initial_condition);
    let mut case = group
        .new_case(name, &subdir)
        .with_hooks(Arc::new(GlobalOceanConfig {
            mesh: mesh.name,
            remap_topography: mesh.remap_topography,
            initial_condition: Some(init.initial_condition),
        }));
    case.add_config_file(PACKAGE, "global_ocean.toml");
    let ti = time_integrator;

    match test {
        ForwardTest::Performance => {
            case.add_step(short_run("forward", init, ti, None)?)?;
            compare_with_baseline(&mut case, "forward");
        }
        ForwardTest::Restart => {
            let restart = restart_filename(RESTART_TIME);

            let mut full = forward_step("full_run", init, ti, None)?;
            full.add_namelist_options("forward", [("config_run_duration", "'0000_02:00:00'")])?;
            full.add_streams_replacements(
                "forward",
                [("output_interval", "0000_02:00:00"), ("restart_interval", "0000_01:00:00")],
            )?;
            full.add_output_files(["output.nc", restart.as_str()])?;
            case.add_step(full)?;

            let mut rerun = forward_step("restart_run", init, ti, None)?;
            rerun.add_namelist_options(
                "forward",
                [
                    ("config_do_restart", ".true.".to_string()),
                    ("config_start_time", format!("'{RESTART_TIME}'")),
                    ("config_run_duration", "'0000_01:00:00'".to_string()),
                ],
            )?;
            rerun.add_streams_replacements(
                "forward",
                [("output_interval", "0000_01:00:00"), ("restart_interval", "0000_01:00:00")],
            )?;
            rerun.add_input_file(InputFile::local(restart))?;
            rerun.add_output_file("output.nc")?;
            case.add_step(rerun)?;

            compare_steps(&mut case, "full_run", "restart_run");
        }
        ForwardTest::Decomp => {
            case.add_step(short_run("4proc", init, ti, Some(Resources::new(4, 4, 1)))?)?;
            case.add_step(short_run("8proc", init, ti, Some(Resources::new(8, 8, 1)))?)?;
            compare_steps(&mut case, "4proc", "8proc");
        }
        ForwardTest::Threads => {
            case.add_step(short_run("1thread", init, ti, Some(Resources::new(4, 4, 1)))?)?;
            case.add_step(short_run("2thread", init, ti, Some(Resources::new(4, 4, 2)))?)?;
            compare_steps(&mut case, "1thread", "2thread");
        }
        ForwardTest::Analysis => {
            let mut step = short_run("forward", init, ti, None)?;
            step.add_namelist_options(
                "forward",
                [
                    ("config_AM_globalStats_enable", ".true."),
                    ("config_AM_globalStats_compute_on_startup", ".true."),
                    ("config_AM_globalStats_write_on_startup", ".true."),
                    ("config_AM_mixedLayerDepths_enable", ".true."),
                ],
            )?;
            case.add_step(step)?;
            compare_with_baseline(&mut case, "forward");
        }
        ForwardTest::DailyOutput => {
            let mut step = short_run("forward", init, ti, None)?;
            step.add_namelist_options(
                "forward",
                [
                    ("config_run_duration", "'00-00-01_00:00:00'"),
                    ("config_AM_timeSeriesStatsDaily_enable", ".true."),
                ],
            )?;
            step.add_streams_replacements("forward", [("output_interval", "00-00-01_00:00:00")])?;
            case.add_step(step)?;
            compare_with_baseline(&mut case, "forward");
        }
        ForwardTest::MonthlyOutput => {
            let mut step = short_run("forward", init, ti, None)?;
            step.add_namelist_options(
                "forward",
                [
                    ("config_run_duration", "'00-01-00_00:00:00'"),
                    ("config_AM_timeSeriesStatsMonthly_enable", ".true."),
                ],
            )?;
            step.add_streams_replacements("forward", [("output_interval", "00-01-00_00:00:00")])?;
            case.add_step(step)?;
            compare_with_baseline(&mut case, "forward");
        }
        ForwardTest::DataIceShelfMelt => {
            let mut step = short_run("forward", init, ti, None)?;
            step.add_namelist_options("forward", [("config_land_ice_flux_mode", "'data'")])?;
            step.add_input_file(InputFile::from_database(
                "land_ice_melt.nc",
                "initial_condition_database",
                "prescribed_ismf_adusumilli2020.20230415.nc",
            ))?;
            case.add_step(step)?;
            compare_with_baseline(&mut case, "forward");
        }
    }

    group.add_test_case_after(case, &[mesh.handle, init.handle])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_filename_replaces_colons() {
        assert_eq!(
            restart_filename("0001-01-02_00:00:00"),
            "../restarts/rst.0001-01-02_00.00.00.nc"
        );
    }
}
