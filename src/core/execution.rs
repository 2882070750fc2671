//! # Test Execution Engine Module / 测试执行引擎模块
//!
//! This module provides the core functionality for executing test cases.
//! It handles the complete life cycle of one test case: configure, resolve,
//! set up the work directory, run the steps in dependency order and validate.
//!
//! 此模块为执行测试用例提供核心功能。
//! 它处理单个测试用例的完整生命周期：配置、解析、设置工作目录、按依赖顺序运行步骤以及验证。

use colored::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{
    core::{
        config::{ConfigCascade, ConfigLayer},
        error::{Error, Result},
        files::{InputFile, InputSource},
        graph::ResolvedSteps,
        models::{CaseSummary, FailureReason, TestResult},
        registry::{CaseId, Registry},
        step::{StepContext, Tool},
        test_case::{Comparison, ComparisonOutcome, TestCase, Validator},
        test_group::{CaseHandle, TestGroup},
    },
    infra::{
        command::{build_command, spawn_and_capture},
        database::DatabaseSettings,
        fs::{ensure_dir, link_or_copy, write_file},
        resources, t,
    },
};

/// Settings shared by every test case of a run.
/// 一次运行中所有测试用例共享的设置。
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Absolute work root; test cases live in `<work_dir>/<group>/<subdir>`.
    /// 绝对工作根目录；测试用例位于 `<work_dir>/<group>/<subdir>`。
    pub work_dir: PathBuf,
    /// Layers from the user's config file, applied last.
    /// 来自用户配置文件的层，最后应用。
    pub user_layers: Vec<ConfigLayer>,
    /// Work root of a previous run to compare against. Falls back to
    /// `[validation] baseline_dir`.
    /// 用于比较的先前运行的工作根目录。未设置时回退到 `[validation] baseline_dir`。
    pub baseline_dir: Option<PathBuf>,
}

/// A configured test case whose work directory is ready.
/// 已配置且工作目录已就绪的测试用例。
#[derive(Debug, Clone)]
pub struct PreparedCase {
    pub case: TestCase,
    pub resolved: ResolvedSteps,
    pub case_dir: PathBuf,
}

/// Configures a test case, resolves its steps and lays out its work directory:
/// the merged config, generated namelists and streams, links and packaged or
/// downloaded inputs.
///
/// 配置测试用例、解析其步骤并布置其工作目录：合并后的配置、生成的 namelist 与 streams、
/// 链接以及打包或下载的输入。
pub async fn setup_test_case(group: &TestGroup, handle: CaseHandle, options: &RunOptions) -> Result<PreparedCase> {
    let mut case = group.case(handle).clone();
    case.configure(&options.user_layers)?;
    let resolved = group.resolve(handle)?;

    let work_dir = &options.work_dir;
    let case_dir = work_dir.join(case.path());
    ensure_dir(&case_dir)?;
    let config_file = case_dir.join(case.config_filename());
    case.config().write(&config_file)?;

    let database = DatabaseSettings::from_config(case.config())?;
    for step in case.steps() {
        let step_path = case.step_path(step);
        let step_dir = work_dir.join(&step_path);
        ensure_dir(&step_dir)?;

        for (filename, contents) in step.render_files()? {
            write_file(&step_dir.join(filename), &contents)?;
        }
        for output in step.outputs() {
            if let Some(parent) = work_dir.join(output.resolved_path(&step_path)).parent() {
                ensure_dir(parent)?;
            }
        }
        for input in step.inputs() {
            let label = format!("{}/{}", case.id(), step.name());
            materialize_input(input, &step_dir, work_dir, &database, case.mpas_core(), &label).await?;
        }
        debug!(step = %step.name(), dir = %step_dir.display(), "step directory ready");
    }

    Ok(PreparedCase {
        case,
        resolved,
        case_dir,
    })
}

async fn materialize_input(
    input: &InputFile,
    step_dir: &Path,
    work_dir: &Path,
    database: &DatabaseSettings,
    mpas_core: &str,
    label: &str,
) -> Result<()> {
    let dest = step_dir.join(&input.filename);
    match &input.source {
        InputSource::Local => Ok(()),
        InputSource::Target(target) => link_or_copy(&work_dir.join(target), &dest),
        InputSource::Package { package, resource } => write_file(&dest, resources::read(package, resource)?),
        InputSource::Database { database: name, target } => {
            let cached = database.fetch(label, mpas_core, name, target).await?;
            link_or_copy(&cached, &dest)
        }
    }
}

/// Where an input must exist right before its step runs.
fn input_location(input: &InputFile, step_path: &Path, work_dir: &Path) -> PathBuf {
    match &input.source {
        InputSource::Package { .. } | InputSource::Database { .. } => work_dir.join(input.link_path(step_path)),
        _ => work_dir.join(input.resolved_path(step_path)),
    }
}

/// Runs comparisons with the configured compare tool.
/// 使用配置的比较工具执行比较。
#[derive(Debug, Clone)]
pub struct CompareTool {
    pub work_dir: PathBuf,
    pub baseline_dir: Option<PathBuf>,
}

impl Validator for CompareTool {
    async fn compare(&self, test_case: &TestCase, comparison: &Comparison) -> Result<ComparisonOutcome> {
        let case_dir = self.work_dir.join(test_case.path());
        let file1 = case_dir.join(&comparison.filename1);
        let file2 = match (&comparison.filename2, &self.baseline_dir) {
            (Some(filename2), _) => case_dir.join(filename2),
            (None, Some(baseline)) => baseline.join(test_case.path()).join(&comparison.filename1),
            (None, None) => return Ok(ComparisonOutcome::Skipped),
        };

        let mut argv = Tool::CompareVariables.command(test_case.config())?;
        argv.extend([
            "--variables".to_string(),
            comparison.variables.join(","),
            file1.display().to_string(),
            file2.display().to_string(),
        ]);
        if let Some(tolerance) = comparison.tolerance {
            argv.extend(["--tolerance".to_string(), tolerance.to_string()]);
        }

        let config_file = case_dir.join(test_case.config_filename());
        let envs = [("COMPASS_CONFIG".to_string(), config_file.display().to_string())];
        let cmd = build_command(&argv, &case_dir, &envs)?;
        let (status, output) = spawn_and_capture(cmd).await;
        match status {
            Ok(status) if status.success() => Ok(ComparisonOutcome::Matched),
            Ok(_) => Ok(ComparisonOutcome::Mismatched(format!(
                "{} differ between {} and {}\n{}",
                comparison.variables.join(", "),
                file1.display(),
                file2.display(),
                output
            ))),
            Err(e) => Err(Error::StepExecution {
                step: format!("{}/validate", test_case.id()),
                status: format!("failed to start '{}': {e}", argv[0]),
                output,
            }),
        }
    }
}

fn failed(case: CaseSummary, error: &Error, step: Option<String>, output: String, duration: Duration) -> TestResult {
    let mut text = error.to_string();
    if !output.is_empty() {
        text.push_str("\n\n");
        text.push_str(&output);
    }
    TestResult::Failed {
        case,
        output: text,
        reason: FailureReason::from_error(error),
        step,
        duration,
    }
}

/// The main entry point for running a single test case.
///
/// Errors never escape: whatever goes wrong ends up in the returned
/// [`TestResult`] so sibling test cases keep running.
///
/// 运行单个测试用例的主入口。错误不会外泄：任何问题都体现在返回的 [`TestResult`] 中，
/// 以便兄弟测试用例继续运行。
///
/// # Arguments
/// * `registry` - All test groups
/// * `id` - The test case to run
/// * `options` - Work directory, user config and baseline
pub async fn run_test_case(registry: &Registry, id: CaseId, options: &RunOptions) -> TestResult {
    let start = Instant::now();
    let group = registry.group(id.group);
    let summary = CaseSummary::of(group.case(id.case));

    println!("{}", t!("run.case_started", name = summary.id.cyan()));

    let prepared = match setup_test_case(group, id.case, options).await {
        Ok(prepared) => prepared,
        Err(e) => return failed(summary, &e, None, String::new(), start.elapsed()),
    };
    let result = run_prepared(prepared, options, summary, start).await;

    match &result {
        TestResult::Passed { case, duration, .. } => println!(
            "{}",
            t!("run.case_passed", name = case.id, duration = format!("{:.2?}", duration)).green()
        ),
        TestResult::Failed { case, reason, .. } => {
            println!("{}", t!("run.case_failed", name = case.id, reason = reason.label(&rust_i18n::locale())).red())
        }
        TestResult::Skipped { .. } => {}
    }
    result
}

/// The baseline work root: `--baseline` wins over `[validation] baseline_dir`,
/// and an empty option means none.
fn baseline_dir(options: &RunOptions, config: &ConfigCascade) -> Result<Option<PathBuf>> {
    if let Some(dir) = &options.baseline_dir {
        return Ok(Some(dir.clone()));
    }
    let dir = config.get_or("validation", "baseline_dir", String::new())?;
    if dir.trim().is_empty() {
        return Ok(None);
    }
    let expanded = shellexpand::full(&dir).map_err(|_| Error::InvalidOption {
        section: "validation".to_string(),
        key: "baseline_dir".to_string(),
        value: dir.clone(),
        expected: "directory path",
    })?;
    Ok(Some(PathBuf::from(expanded.into_owned())))
}

async fn run_prepared(prepared: PreparedCase, options: &RunOptions, summary: CaseSummary, start: Instant) -> TestResult {
    let PreparedCase {
        mut case,
        resolved,
        case_dir,
    } = prepared;
    let work_dir = &options.work_dir;
    let id = case.id();
    let mut output = String::new();

    let timeout = match case.config().get_or::<u64>("execution", "step_timeout_secs", 0) {
        Ok(0) => None,
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => return failed(summary, &e, None, output, start.elapsed()),
    };
    let baseline_dir = match baseline_dir(options, case.config()) {
        Ok(dir) => dir,
        Err(e) => return failed(summary, &e, None, output, start.elapsed()),
    };

    if let Err(e) = case.begin_steps() {
        return failed(summary, &e, None, output, start.elapsed());
    }

    let config_file = case_dir.join(case.config_filename());
    for name in &resolved.order {
        let Some(step) = case.step(name) else {
            continue;
        };
        let step_path = case.step_path(step);
        let step_dir = work_dir.join(&step_path);

        if let Some(input) = step
            .inputs()
            .iter()
            .find(|input| !input_location(input, &step_path, work_dir).exists())
        {
            let error = Error::MissingDependency {
                step: format!("{id}/{name}"),
                path: input_location(input, &step_path, work_dir),
            };
            return failed(summary, &error, Some(name.clone()), output, start.elapsed());
        }

        println!("  {}", t!("run.step_started", name = name).dimmed());
        let ctx = StepContext {
            config: case.config(),
            test_case: &id,
            step_dir: &step_dir,
            config_file: &config_file,
            timeout,
        };
        match step.run(ctx).await {
            Ok(outcome) => output.push_str(&outcome.output),
            Err(e) => {
                let log = std::fs::read_to_string(step.log_path(&step_dir)).unwrap_or_default();
                return failed(summary, &e, Some(name.clone()), log, start.elapsed());
            }
        }
    }

    if let Err(e) = case.finish_steps() {
        return failed(summary, &e, None, output, start.elapsed());
    }

    let validator = CompareTool {
        work_dir: work_dir.clone(),
        baseline_dir,
    };
    let report = match case.validate(&validator).await {
        Ok(report) => report,
        Err(e) => return failed(summary, &e, None, output, start.elapsed()),
    };
    if report.skipped > 0 {
        warn!(test_case = %id, skipped = report.skipped, "comparisons skipped without a baseline");
    }
    if !report.passed() {
        return TestResult::Failed {
            case: summary,
            output: report.mismatches.join("\n"),
            reason: FailureReason::Validation,
            step: None,
            duration: start.elapsed(),
        };
    }

    if let Err(e) = case.finish() {
        return failed(summary, &e, None, output, start.elapsed());
    }

    TestResult::Passed {
        case: summary,
        output,
        duration: start.elapsed(),
        validated: report.performed > 0,
    }
}
