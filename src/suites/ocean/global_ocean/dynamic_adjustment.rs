//! # Dynamic Adjustment / 动力调整
//!
//! A chain of forward runs with decreasing damping, each restarting from the
//! previous one. The chains are packaged TOML schedules with named variants,
//! so choosing between alternative sequences is a matter of data.
//!
//! 一串阻尼逐渐减小的前向运行，每次都从上一次的重启文件开始。
//! 这些链是带有命名变体的打包 TOML 时间表，因此在不同序列之间选择只是数据问题。

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::error::{Error, Result};
use crate::core::files::InputFile;
use crate::core::test_case::Comparison;
use crate::core::test_group::{CaseHandle, TestGroup};
use crate::infra::resources;

use super::forward::{PROGNOSTIC_VARIABLES, forward_step, restart_filename};
use super::init::InitCase;
use super::mesh::{GlobalOceanConfig, MeshCase};
use super::{PACKAGE, TimeIntegrator};

#[derive(Debug, Clone, Deserialize)]
struct ScheduleFile {
    default_variant: String,
    time_integrators: Vec<TimeIntegrator>,
    #[serde(default)]
    shared_namelist: BTreeMap<String, String>,
    variants: BTreeMap<String, ScheduleVariant>,
}

/// One sequence of runs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScheduleVariant {
    pub restart_times: Vec<String>,
    pub steps: Vec<ScheduleStep>,
}

/// One run of a schedule. `restart_in` and `restart_out` index
/// `restart_times`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScheduleStep {
    pub name: String,
    #[serde(default)]
    pub namelist: BTreeMap<String, String>,
    #[serde(default)]
    pub streams: BTreeMap<String, String>,
    pub restart_in: Option<usize>,
    pub restart_out: Option<usize>,
    #[serde(default)]
    pub extra_outputs: Vec<String>,
}

/// A packaged schedule with one variant selected.
/// 选定了某个变体的打包时间表。
#[derive(Debug, Clone)]
pub struct Schedule {
    pub name: String,
    pub variant_name: String,
    pub time_integrators: Vec<TimeIntegrator>,
    pub shared_namelist: BTreeMap<String, String>,
    pub variant: ScheduleVariant,
}

impl Schedule {
    /// Loads `dynamic_adjustment/<name>.toml`; `variant` defaults to the
    /// schedule's `default_variant`.
    ///
    /// 加载 `dynamic_adjustment/<name>.toml`；`variant` 默认为时间表的 `default_variant`。
    pub fn load(name: &str, variant: Option<&str>) -> Result<Self> {
        let resource = format!("dynamic_adjustment/{name}.toml");
        let text = resources::read(PACKAGE, &resource)?;
        Self::parse(name, text, variant)
    }

    pub fn parse(name: &str, text: &str, variant: Option<&str>) -> Result<Self> {
        let file: ScheduleFile = toml::from_str(text).map_err(|e| Error::InvalidTemplate {
            template: format!("{PACKAGE}/dynamic_adjustment/{name}.toml"),
            message: e.to_string(),
        })?;

        let variant_name = variant.unwrap_or(&file.default_variant).to_string();
        let selected = file
            .variants
            .get(&variant_name)
            .cloned()
            .ok_or_else(|| Error::InvalidChoice {
                context: format!("dynamic adjustment schedule '{name}'"),
                value: variant_name.clone(),
                allowed: file.variants.keys().cloned().collect(),
            })?;

        let schedule = Self {
            name: name.to_string(),
            variant_name,
            time_integrators: file.time_integrators,
            shared_namelist: file.shared_namelist,
            variant: selected,
        };
        schedule.check_indices()?;
        Ok(schedule)
    }

    fn check_indices(&self) -> Result<()> {
        let count = self.variant.restart_times.len();
        for step in &self.variant.steps {
            for index in [step.restart_in, step.restart_out].into_iter().flatten() {
                if index >= count {
                    return Err(Error::InvalidChoice {
                        context: format!("restart index of step '{}' in schedule '{}'", step.name, self.name),
                        value: index.to_string(),
                        allowed: (0..count).map(|i| i.to_string()).collect(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The last restart file the schedule writes, relative to the test case.
    /// 时间表写入的最后一个重启文件（相对于测试用例）。
    pub fn final_restart(&self) -> Option<String> {
        self.variant
            .steps
            .iter()
            .rev()
            .find_map(|s| s.restart_out)
            .map(|i| format!("restarts/rst.{}.nc", self.variant.restart_times[i].replace(':', ".")))
    }
}

#[derive(Debug, Clone)]
pub struct AdjustmentCase {
    pub handle: CaseHandle,
    pub path: PathBuf,
    /// Final restart file relative to the work root, if the schedule writes one.
    pub final_restart: Option<PathBuf>,
}

/// Adds `<mesh>/<ic>/<time_integrator>/dynamic_adjustment` running `schedule`.
/// 添加运行 `schedule` 的 `<mesh>/<ic>/<time_integrator>/dynamic_adjustment`。
pub fn add_dynamic_adjustment(
    group: &mut TestGroup,
    mesh: &MeshCase,
    init: &InitCase,
    time_integrator: TimeIntegrator,
    schedule: &Schedule,
) -> Result<AdjustmentCase> {
    if !schedule.time_integrators.contains(&time_integrator) {
        return Err(Error::InvalidChoice {
            context: format!("time integrator of dynamic adjustment schedule '{}'", schedule.name),
            value: time_integrator.to_string(),
            allowed: schedule.time_integrators.iter().map(ToString::to_string).collect(),
        });
    }

    let subdir = format!("{}/{}/{time_integrator}/dynamic_adjustment", mesh.name, init.initial_condition);
    let mut case = group
        .new_case("dynamic_adjustment", &subdir)
        .with_description(format!(
            "Dynamic adjustment of the {} mesh ({} schedule, {} variant)",
            mesh.name, schedule.name, schedule.variant_name
        ))
        .with_hooks(Arc::new(GlobalOceanConfig {
            mesh: mesh.name,
            remap_topography: mesh.remap_topography,
            initial_condition: Some(init.initial_condition),
        }));
    case.add_config_file(PACKAGE, "global_ocean.toml");

    let times = &schedule.variant.restart_times;
    for entry in &schedule.variant.steps {
        let mut step = forward_step(&entry.name, init, time_integrator, None)?;
        step.add_namelist_options("forward", schedule.shared_namelist.clone())?;
        step.add_namelist_options("forward", entry.namelist.clone())?;
        step.add_streams_replacements("forward", entry.streams.clone())?;

        if let Some(i) = entry.restart_in {
            step.add_namelist_options(
                "forward",
                [
                    ("config_do_restart", ".true.".to_string()),
                    ("config_start_time", format!("'{}'", times[i])),
                ],
            )?;
            step.add_input_file(InputFile::local(restart_filename(&times[i])))?;
        }
        if let Some(i) = entry.restart_out {
            step.add_output_file(restart_filename(&times[i]))?;
        }
        step.add_output_files(entry.extra_outputs.iter().cloned())?;
        case.add_step(step)?;
    }

    if let Some(last) = schedule
        .variant
        .steps
        .iter()
        .rev()
        .find(|s| s.extra_outputs.iter().any(|f| f == "output.nc"))
    {
        case.add_validation(Comparison::new(
            PROGNOSTIC_VARIABLES,
            format!("{}/output.nc", last.name),
            None,
        ));
    }

    let path = case.path();
    let final_restart = schedule.final_restart().map(|f| path.join(f));
    let handle = group.add_test_case_after(case, &[mesh.handle, init.handle])?;
    Ok(AdjustmentCase {
        handle,
        path,
        final_restart,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEDULE: &str = r#"
default_variant = "short"
time_integrators = ["split_explicit"]

[variants.short]
restart_times = ["0001-01-02_00:00:00"]

[[variants.short.steps]]
name = "damped"
restart_out = 0

[[variants.short.steps]]
name = "simulation"
restart_in = 0
extra_outputs = ["output.nc"]
"#;

    #[test]
    fn test_parse_selects_default_variant() {
        let schedule = Schedule::parse("test", SCHEDULE, None).unwrap();
        assert_eq!(schedule.variant_name, "short");
        assert_eq!(schedule.variant.steps.len(), 2);
        assert_eq!(schedule.final_restart().as_deref(), Some("restarts/rst.0001-01-02_00.00.00.nc"));
    }

    #[test]
    fn test_parse_rejects_unknown_variant() {
        let err = Schedule::parse("test", SCHEDULE, Some("long")).unwrap_err();
        assert!(matches!(err, Error::InvalidChoice { .. }));
    }

    #[test]
    fn test_parse_rejects_restart_index_out_of_range() {
        let text = SCHEDULE.replace("restart_in = 0", "restart_in = 3");
        assert!(matches!(
            Schedule::parse("test", &text, None),
            Err(Error::InvalidChoice { .. })
        ));
    }

    #[test]
    fn test_packaged_schedules_load() {
        let qu240 = Schedule::load("qu240", None).unwrap();
        assert_eq!(qu240.time_integrators, vec![TimeIntegrator::SplitExplicit, TimeIntegrator::Rk4]);
        let backup = Schedule::load("fris01to60", Some("backup")).unwrap();
        assert_eq!(backup.variant.steps.last().map(|s| s.name.as_str()), Some("simulation"));
    }
}
