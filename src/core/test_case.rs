//! # Test Case Module / 测试用例模块
//!
//! A test case is an ordered collection of steps sharing a work directory
//! subtree, its configuration cascade and a checked life cycle:
//!
//! ```text
//! constructed -> configured -> steps_running -> steps_done -> validated | validation_skipped -> done
//! ```
//!
//! 测试用例是共享一个工作目录子树的有序步骤集合，带有自己的配置级联和受检查的生命周期。

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::{ConfigCascade, ConfigLayer};
use crate::core::error::{Error, Result};
use crate::core::step::Step;

/// Where a test case is in its life cycle.
/// 测试用例在其生命周期中所处的阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TestCaseState {
    Constructed,
    Configured,
    StepsRunning,
    StepsDone,
    Validated,
    ValidationSkipped,
    Done,
}

impl fmt::Display for TestCaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TestCaseState::Constructed => "constructed",
            TestCaseState::Configured => "configured",
            TestCaseState::StepsRunning => "steps_running",
            TestCaseState::StepsDone => "steps_done",
            TestCaseState::Validated => "validated",
            TestCaseState::ValidationSkipped => "validation_skipped",
            TestCaseState::Done => "done",
        };
        f.write_str(label)
    }
}

/// Behaviour a concrete test case adds on top of its steps.
///
/// `configure` runs once, after the framework defaults and the group's
/// packaged config files are in the cascade and before the user's config
/// file, so users can still override anything it sets.
///
/// 具体测试用例在其步骤之上添加的行为。
/// `configure` 只运行一次：在框架默认值和测试组打包配置加入级联之后、
/// 用户配置文件之前，因此用户仍可覆盖它设置的任何内容。
pub trait TestCaseHooks: Send + Sync + fmt::Debug {
    fn configure(&self, _config: &mut ConfigCascade) -> Result<()> {
        Ok(())
    }
}

/// Compares variables between two output files.
///
/// Paths are relative to the test case directory. Without `filename2` the
/// same file in the baseline work directory is used, if there is one.
///
/// 比较两个输出文件之间的变量。路径相对于测试用例目录。
/// 若没有 `filename2`，则使用基线工作目录中的同名文件（如果有）。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub variables: Vec<String>,
    pub filename1: String,
    pub filename2: Option<String>,
    pub tolerance: Option<f64>,
}

impl Comparison {
    pub fn new<I, S>(variables: I, filename1: impl Into<String>, filename2: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variables: variables.into_iter().map(Into::into).collect(),
            filename1: filename1.into(),
            filename2: filename2.map(str::to_string),
            tolerance: None,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
}

/// Result of a single comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonOutcome {
    Matched,
    Mismatched(String),
    /// Nothing to compare against, e.g. no baseline.
    Skipped,
}

/// Performs comparisons for [`TestCase::validate`].
/// 为 [`TestCase::validate`] 执行比较。
pub trait Validator {
    fn compare(
        &self,
        test_case: &TestCase,
        comparison: &Comparison,
    ) -> impl Future<Output = Result<ComparisonOutcome>> + Send;
}

/// Summary of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub performed: usize,
    pub skipped: usize,
    pub mismatches: Vec<String>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// An ordered collection of steps with a shared work directory.
/// 共享工作目录的有序步骤集合。
#[derive(Debug, Clone)]
pub struct TestCase {
    mpas_core: String,
    test_group: String,
    name: String,
    subdir: String,
    description: String,
    steps: Vec<Step>,
    config_files: Vec<(String, String)>,
    hooks: Option<Arc<dyn TestCaseHooks>>,
    comparisons: Vec<Comparison>,
    config: ConfigCascade,
    state: TestCaseState,
}

impl TestCase {
    pub fn new(
        mpas_core: impl Into<String>,
        test_group: impl Into<String>,
        name: impl Into<String>,
        subdir: impl Into<String>,
    ) -> Self {
        Self {
            mpas_core: mpas_core.into(),
            test_group: test_group.into(),
            name: name.into(),
            subdir: subdir.into(),
            description: String::new(),
            steps: Vec::new(),
            config_files: Vec::new(),
            hooks: None,
            comparisons: Vec::new(),
            config: ConfigCascade::new(),
            state: TestCaseState::Constructed,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn TestCaseHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Queues a packaged config file, layered on top of the framework defaults
    /// at configure time.
    pub fn add_config_file(&mut self, package: &str, name: &str) {
        self.config_files.push((package.to_string(), name.to_string()));
    }

    pub fn add_validation(&mut self, comparison: Comparison) {
        self.comparisons.push(comparison);
    }

    /// Appends a step; its name must be new to this test case.
    /// 追加一个步骤；其名称在此测试用例中必须唯一。
    pub fn add_step(&mut self, step: Step) -> Result<()> {
        self.expect_state(TestCaseState::Constructed, "add a step")?;
        if self.step(step.name()).is_some() {
            return Err(Error::DuplicateStep {
                test_case: self.id(),
                step: step.name().to_string(),
            });
        }
        self.steps.push(step);
        Ok(())
    }

    pub fn mpas_core(&self) -> &str {
        &self.mpas_core
    }

    pub fn test_group(&self) -> &str {
        &self.test_group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subdir(&self) -> &str {
        &self.subdir
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// `<core>/<group>/<subdir>`, the identifier shown to users.
    pub fn id(&self) -> String {
        format!("{}/{}/{}", self.mpas_core, self.test_group, self.subdir)
    }

    /// Work directory relative to the work root: `<group>/<subdir>`.
    /// 相对于工作根目录的工作目录：`<group>/<subdir>`。
    pub fn path(&self) -> PathBuf {
        crate::infra::fs::normalize(&PathBuf::from(&self.test_group).join(&self.subdir))
    }

    pub fn step_path(&self, step: &Step) -> PathBuf {
        crate::infra::fs::normalize(&self.path().join(step.subdir()))
    }

    /// Name of the file the merged config is written to.
    pub fn config_filename(&self) -> String {
        format!("{}.cfg", self.name)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name() == name)
    }

    pub fn step_mut(&mut self, name: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.name() == name)
    }

    pub fn comparisons(&self) -> &[Comparison] {
        &self.comparisons
    }

    pub fn config(&self) -> &ConfigCascade {
        &self.config
    }

    pub fn state(&self) -> TestCaseState {
        self.state
    }

    fn expect_state(&self, expected: TestCaseState, action: &'static str) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidTransition {
                test_case: self.id(),
                action,
                state: self.state,
            });
        }
        Ok(())
    }

    /// Builds the cascade: framework defaults, the queued packaged files, the
    /// `configure` hook, then `user_layers`. Step resources are re-read from
    /// the result.
    ///
    /// 构建级联：框架默认值、排队的打包文件、`configure` 钩子，然后是 `user_layers`。
    /// 步骤资源随后从结果中重新读取。
    pub fn configure(&mut self, user_layers: &[ConfigLayer]) -> Result<()> {
        self.expect_state(TestCaseState::Constructed, "configure")?;

        let mut config = ConfigCascade::new();
        config.add_from_package("framework", "default.toml")?;
        for (package, name) in &self.config_files {
            config.add_from_package(package, name)?;
        }
        if let Some(hooks) = &self.hooks {
            hooks.configure(&mut config)?;
        }
        for layer in user_layers {
            config.add_layer(layer.clone())?;
        }
        for step in &mut self.steps {
            step.configure_resources(&config)?;
        }

        self.config = config;
        self.state = TestCaseState::Configured;
        Ok(())
    }

    /// Freezes the config; no layer may be added once steps run.
    /// 冻结配置；步骤运行后不能再添加任何层。
    pub fn begin_steps(&mut self) -> Result<()> {
        self.expect_state(TestCaseState::Configured, "run steps")?;
        self.config.freeze();
        self.state = TestCaseState::StepsRunning;
        Ok(())
    }

    pub fn finish_steps(&mut self) -> Result<()> {
        self.expect_state(TestCaseState::StepsRunning, "finish steps")?;
        self.state = TestCaseState::StepsDone;
        Ok(())
    }

    /// Runs every comparison. Only allowed once all steps are done.
    ///
    /// The case ends up `Validated` if at least one comparison was performed,
    /// otherwise `ValidationSkipped`. Mismatches are reported, not raised.
    ///
    /// 运行每个比较。仅在所有步骤完成后允许。
    /// 若至少执行了一次比较，则状态变为 `Validated`，否则为 `ValidationSkipped`。
    /// 不匹配会被报告而不是作为错误抛出。
    pub async fn validate<V: Validator>(&mut self, validator: &V) -> Result<ValidationReport> {
        self.expect_state(TestCaseState::StepsDone, "validate")?;

        let mut report = ValidationReport::default();
        for comparison in &self.comparisons {
            match validator.compare(self, comparison).await? {
                ComparisonOutcome::Matched => report.performed += 1,
                ComparisonOutcome::Skipped => report.skipped += 1,
                ComparisonOutcome::Mismatched(details) => {
                    report.performed += 1;
                    report.mismatches.push(details);
                }
            }
        }

        self.state = if report.performed > 0 {
            TestCaseState::Validated
        } else {
            TestCaseState::ValidationSkipped
        };
        Ok(report)
    }

    pub fn finish(&mut self) -> Result<()> {
        if !matches!(self.state, TestCaseState::Validated | TestCaseState::ValidationSkipped) {
            return Err(Error::InvalidTransition {
                test_case: self.id(),
                action: "finish",
                state: self.state,
            });
        }
        self.state = TestCaseState::Done;
        Ok(())
    }
}
