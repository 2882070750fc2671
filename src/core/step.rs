//! # Step Module / 步骤模块
//!
//! A step is the atomic unit of work inside a test case: a resource request,
//! declared input and output files, namelist and streams files generated from
//! packaged templates, and an action that runs an external program.
//!
//! 步骤是测试用例中的原子工作单元：资源请求、声明的输入和输出文件、
//! 由打包模板生成的 namelist 与 streams 文件，以及运行外部程序的动作。

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::core::config::ConfigCascade;
use crate::core::error::{Error, Result};
use crate::core::files::{FileDirection, InputFile, OutputFile};
use crate::core::templates::{Namelist, render_template};
use crate::infra::command::{build_command, launcher_prefix, spawn_and_capture, split_command_line};
use crate::infra::fs::normalize;
use crate::infra::resources;

/// Parallel resources a step asks for.
/// 步骤请求的并行资源。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resources {
    pub ntasks: u32,
    pub min_tasks: u32,
    pub openmp_threads: u32,
}

impl Resources {
    pub fn new(ntasks: u32, min_tasks: u32, openmp_threads: u32) -> Self {
        Self {
            ntasks,
            min_tasks,
            openmp_threads,
        }
    }

    /// One task, one thread.
    pub fn serial() -> Self {
        Self::new(1, 1, 1)
    }

    /// All counts positive and `min_tasks <= ntasks`.
    /// 所有计数为正且 `min_tasks <= ntasks`。
    pub fn validate(&self, step: &str) -> Result<()> {
        if self.ntasks == 0 || self.min_tasks == 0 || self.openmp_threads == 0 || self.min_tasks > self.ntasks {
            return Err(Error::InvalidResources {
                step: step.to_string(),
                ntasks: self.ntasks,
                min_tasks: self.min_tasks,
                openmp_threads: self.openmp_threads,
            });
        }
        Ok(())
    }

    /// Tasks actually used on a machine with `available` cores.
    /// 在拥有 `available` 个核心的机器上实际使用的任务数。
    pub fn effective_tasks(&self, step: &str, available: u32) -> Result<u32> {
        let ntasks = self.ntasks.min(available);
        if ntasks < self.min_tasks {
            return Err(Error::InsufficientResources {
                step: step.to_string(),
                min_tasks: self.min_tasks,
                available,
            });
        }
        Ok(ntasks)
    }
}

/// Cores usable by steps: `[parallel] cores`, where 0 means the whole machine.
/// 步骤可用的核心数：`[parallel] cores`，0 表示整台机器。
pub fn available_cores(config: &ConfigCascade) -> Result<u32> {
    let cores: u32 = config.get_or("parallel", "cores", 0)?;
    if cores == 0 {
        Ok(u32::try_from(num_cpus::get()).unwrap_or(u32::MAX))
    } else {
        Ok(cores)
    }
}

/// Opaque collaborators a step can invoke. Each is looked up in `[executables]`.
/// 步骤可以调用的外部协作程序。每个都在 `[executables]` 中查找。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tool {
    BaseMesh,
    RemapTopography,
    CullMesh,
    MaliMesh,
    GraphFile,
    Partition,
    CompareVariables,
    E3smFiles,
    EnsembleMember,
}

impl Tool {
    pub fn config_key(&self) -> &'static str {
        match self {
            Tool::BaseMesh => "base_mesh",
            Tool::RemapTopography => "remap_topography",
            Tool::CullMesh => "cull_mesh",
            Tool::MaliMesh => "mali_mesh",
            Tool::GraphFile => "graph_file",
            Tool::Partition => "partition",
            Tool::CompareVariables => "compare_variables",
            Tool::E3smFiles => "e3sm_files",
            Tool::EnsembleMember => "ensemble_member",
        }
    }

    /// The configured command line for this tool, split into words.
    pub fn command(&self, config: &ConfigCascade) -> Result<Vec<String>> {
        let line = config.get_str("executables", self.config_key())?;
        split_command_line("executables", self.config_key(), &line)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// What a step does when it runs.
/// 步骤运行时执行的动作。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StepAction {
    /// Runs the simulation once per suffix with `namelist.<suffix>` and
    /// `streams.<suffix>`. With `graph_mesh`, `graph.info` is made from that
    /// mesh first and, with more than one task, partitioned.
    RunModel {
        suffixes: Vec<String>,
        graph_mesh: Option<String>,
    },
    /// Runs one external tool with fixed arguments.
    Tool { tool: Tool, args: Vec<String> },
}

impl StepAction {
    /// Model run with the single suffix `suffix` and a graph made from `mesh`.
    pub fn run_model(suffix: &str, mesh: &str) -> Self {
        StepAction::RunModel {
            suffixes: vec![suffix.to_string()],
            graph_mesh: Some(mesh.to_string()),
        }
    }

    pub fn tool<I, S>(tool: Tool, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StepAction::Tool {
            tool,
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NamelistSpec {
    package: String,
    template: String,
    suffix: String,
    options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StreamsSpec {
    package: String,
    template: String,
    suffix: String,
    replacements: BTreeMap<String, String>,
}

/// Where in the config a step finds overrides for its resources:
/// `[section] <prefix>_ntasks`, `<prefix>_min_tasks` and `<prefix>_threads`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResourceOptions {
    section: String,
    prefix: String,
}

/// Everything a step needs from its test case while running.
/// 步骤运行时需要从其测试用例获得的一切。
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub config: &'a ConfigCascade,
    /// `<core>/<group>/<subdir>` of the owning test case.
    pub test_case: &'a str,
    pub step_dir: &'a Path,
    pub config_file: &'a Path,
    pub timeout: Option<Duration>,
}

/// What a successful run leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub ntasks: u32,
    pub output: String,
}

/// The atomic unit of work.
/// 原子工作单元。
#[derive(Debug, Clone)]
pub struct Step {
    name: String,
    subdir: String,
    resources: Resources,
    resource_options: Option<ResourceOptions>,
    inputs: Vec<InputFile>,
    outputs: Vec<OutputFile>,
    namelists: Vec<NamelistSpec>,
    streams: Vec<StreamsSpec>,
    action: StepAction,
}

impl Step {
    /// Creates a step whose work directory is named after it. Invalid
    /// resources fail here rather than at run time.
    ///
    /// 创建一个以自身名称命名工作目录的步骤。无效的资源在此处即失败，而不是在运行时。
    pub fn new(name: impl Into<String>, resources: Resources, action: StepAction) -> Result<Self> {
        let name = name.into();
        resources.validate(&name)?;
        Ok(Self {
            subdir: name.clone(),
            name,
            resources,
            resource_options: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            namelists: Vec::new(),
            streams: Vec::new(),
            action,
        })
    }

    pub fn with_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = subdir.into();
        self
    }

    /// Lets `[section] <prefix>_ntasks` (and friends) override the resources
    /// when the test case is configured.
    pub fn with_resource_options(mut self, section: &str, prefix: &str) -> Self {
        self.resource_options = Some(ResourceOptions {
            section: section.to_string(),
            prefix: prefix.to_string(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subdir(&self) -> &str {
        &self.subdir
    }

    pub fn resources(&self) -> Resources {
        self.resources
    }

    pub fn inputs(&self) -> &[InputFile] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputFile] {
        &self.outputs
    }

    pub fn action(&self) -> &StepAction {
        &self.action
    }

    /// Declares an input. Two inputs landing on the same path are an error.
    /// 声明一个输入。两个输入落在同一路径上会报错。
    pub fn add_input_file(&mut self, file: InputFile) -> Result<()> {
        let path = normalize(Path::new(&file.filename));
        if self
            .inputs
            .iter()
            .any(|existing| normalize(Path::new(&existing.filename)) == path)
        {
            return Err(self.duplicate(FileDirection::Input, &file.filename));
        }
        self.inputs.push(file);
        Ok(())
    }

    /// Declares an output. Two outputs with the same path are an error.
    /// 声明一个输出。两个相同路径的输出会报错。
    pub fn add_output_file(&mut self, filename: impl Into<String>) -> Result<()> {
        let filename = filename.into();
        let path = normalize(Path::new(&filename));
        if self
            .outputs
            .iter()
            .any(|existing| normalize(Path::new(&existing.filename)) == path)
        {
            return Err(self.duplicate(FileDirection::Output, &filename));
        }
        self.outputs.push(OutputFile::new(filename));
        Ok(())
    }

    pub fn add_output_files<I, S>(&mut self, filenames: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for filename in filenames {
            self.add_output_file(filename)?;
        }
        Ok(())
    }

    fn duplicate(&self, direction: FileDirection, filename: &str) -> Error {
        Error::DuplicateFile {
            step: self.name.clone(),
            direction,
            filename: filename.to_string(),
        }
    }

    /// Generates `namelist.<suffix>` from a packaged namelist template.
    /// 从打包的 namelist 模板生成 `namelist.<suffix>`。
    pub fn add_namelist_file(&mut self, package: &str, template: &str, suffix: &str) -> Result<()> {
        if self.namelists.iter().any(|n| n.suffix == suffix) {
            return Err(self.duplicate(FileDirection::Output, &format!("namelist.{suffix}")));
        }
        self.namelists.push(NamelistSpec {
            package: package.to_string(),
            template: template.to_string(),
            suffix: suffix.to_string(),
            options: BTreeMap::new(),
        });
        Ok(())
    }

    /// Replaces options in `namelist.<suffix>`; later calls win.
    pub fn add_namelist_options<I, K, V>(&mut self, suffix: &str, options: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let step = self.name.clone();
        let namelist = self
            .namelists
            .iter_mut()
            .find(|n| n.suffix == suffix)
            .ok_or_else(|| Error::MissingNamelist {
                step,
                out_name: format!("namelist.{suffix}"),
            })?;
        for (key, value) in options {
            namelist.options.insert(key.into(), value.into());
        }
        Ok(())
    }

    /// Generates `streams.<suffix>` from a packaged streams template.
    pub fn add_streams_file(&mut self, package: &str, template: &str, suffix: &str) -> Result<()> {
        if self.streams.iter().any(|s| s.suffix == suffix) {
            return Err(self.duplicate(FileDirection::Output, &format!("streams.{suffix}")));
        }
        self.streams.push(StreamsSpec {
            package: package.to_string(),
            template: template.to_string(),
            suffix: suffix.to_string(),
            replacements: BTreeMap::new(),
        });
        Ok(())
    }

    /// Sets `{{ token }}` replacements for `streams.<suffix>`.
    pub fn add_streams_replacements<I, K, V>(&mut self, suffix: &str, replacements: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let step = self.name.clone();
        let streams = self
            .streams
            .iter_mut()
            .find(|s| s.suffix == suffix)
            .ok_or_else(|| Error::MissingNamelist {
                step,
                out_name: format!("streams.{suffix}"),
            })?;
        for (key, value) in replacements {
            streams.replacements.insert(key.into(), value.into());
        }
        Ok(())
    }

    /// Applies config overrides of the resources, if the step has any, and
    /// re-validates them.
    ///
    /// 应用配置中对资源的覆盖（如果有），并重新验证。
    pub fn configure_resources(&mut self, config: &ConfigCascade) -> Result<()> {
        if let Some(options) = &self.resource_options {
            let key = |suffix: &str| format!("{}_{suffix}", options.prefix);
            let ntasks = config.get_or(&options.section, &key("ntasks"), self.resources.ntasks)?;
            // min_tasks follows ntasks unless it is set explicitly
            let min_tasks = config.get_or(&options.section, &key("min_tasks"), ntasks.min(self.resources.min_tasks))?;
            let openmp_threads = config.get_or(&options.section, &key("threads"), self.resources.openmp_threads)?;
            self.resources = Resources::new(ntasks, min_tasks, openmp_threads);
            debug!(step = %self.name, resources = ?self.resources, "resources from config");
        }
        self.resources.validate(&self.name)
    }

    /// Renders the namelist and streams files of this step as
    /// `(filename, contents)` pairs.
    ///
    /// 将此步骤的 namelist 和 streams 文件渲染为 `(文件名, 内容)` 对。
    pub fn render_files(&self) -> Result<Vec<(String, String)>> {
        let mut files = Vec::with_capacity(self.namelists.len() + self.streams.len());
        for spec in &self.namelists {
            let text = resources::read(&spec.package, &spec.template)?;
            let mut namelist = Namelist::parse(&format!("{}/{}", spec.package, spec.template), text)?;
            namelist.apply(&spec.options)?;
            files.push((format!("namelist.{}", spec.suffix), namelist.render()));
        }
        for spec in &self.streams {
            let text = resources::read(&spec.package, &spec.template)?;
            let rendered = render_template(&format!("{}/{}", spec.package, spec.template), text, &spec.replacements)?;
            files.push((format!("streams.{}", spec.suffix), rendered));
        }
        Ok(files)
    }

    /// The command lines this step runs with `ntasks` tasks, in order.
    /// 此步骤使用 `ntasks` 个任务时依次运行的命令行。
    pub fn commands(&self, config: &ConfigCascade, ntasks: u32) -> Result<Vec<Vec<String>>> {
        match &self.action {
            StepAction::Tool { tool, args } => {
                let mut argv = tool.command(config)?;
                argv.extend(args.iter().cloned());
                Ok(vec![argv])
            }
            StepAction::RunModel { suffixes, graph_mesh } => {
                let mut commands = Vec::new();
                if let Some(mesh) = graph_mesh {
                    let mut argv = Tool::GraphFile.command(config)?;
                    argv.extend([mesh.clone(), "graph.info".to_string()]);
                    commands.push(argv);
                    if ntasks > 1 {
                        let mut argv = Tool::Partition.command(config)?;
                        argv.extend(["graph.info".to_string(), ntasks.to_string()]);
                        commands.push(argv);
                    }
                }

                let launcher = config.get_str("parallel", "launcher")?;
                let prefix = launcher_prefix(&launcher, ntasks, self.resources.openmp_threads)?;
                let model = split_command_line("executables", "model", &config.get_str("executables", "model")?)?;
                for suffix in suffixes {
                    let mut argv = prefix.clone();
                    argv.extend(model.iter().cloned());
                    argv.extend([
                        "-n".to_string(),
                        format!("namelist.{suffix}"),
                        "-s".to_string(),
                        format!("streams.{suffix}"),
                    ]);
                    commands.push(argv);
                }
                Ok(commands)
            }
        }
    }

    /// Runs the step. Inputs are expected to be in place already.
    ///
    /// Captured output of every command goes to `<step_dir>/<name>.log`, also
    /// when a command fails or the step times out.
    ///
    /// 运行步骤。输入应已就位。
    /// 每个命令捕获的输出都写入 `<step_dir>/<name>.log`，命令失败或步骤超时时也是如此。
    pub async fn run(&self, ctx: StepContext<'_>) -> Result<StepOutcome> {
        let label = format!("{}/{}", ctx.test_case, self.name);
        let ntasks = self.resources.effective_tasks(&label, available_cores(ctx.config)?)?;
        let commands = self.commands(ctx.config, ntasks)?;
        let envs = vec![
            ("COMPASS_CONFIG".to_string(), ctx.config_file.display().to_string()),
            ("COMPASS_STEP".to_string(), self.name.clone()),
            ("COMPASS_TEST_CASE".to_string(), ctx.test_case.to_string()),
            ("OMP_NUM_THREADS".to_string(), self.resources.openmp_threads.to_string()),
        ];

        info!(step = %label, ntasks, "running step");
        let mut log = String::new();
        let work = async {
            for argv in &commands {
                let cmd = build_command(argv, ctx.step_dir, &envs)?;
                log.push_str(&format!("$ {}\n", argv.join(" ")));
                let (status, output) = spawn_and_capture(cmd).await;
                log.push_str(&output);
                match status {
                    Ok(status) if status.success() => {}
                    Ok(status) => {
                        return Err(Error::StepExecution {
                            step: label.clone(),
                            status: status.to_string(),
                            output,
                        });
                    }
                    Err(e) => {
                        return Err(Error::StepExecution {
                            step: label.clone(),
                            status: format!("failed to start '{}': {e}", argv[0]),
                            output,
                        });
                    }
                }
            }
            Ok(())
        };

        let result = match ctx.timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout {
                    step: label.clone(),
                    timeout: limit,
                }),
            },
            None => work.await,
        };

        crate::infra::fs::write_file(&self.log_path(ctx.step_dir), &log)?;
        result.map(|()| StepOutcome { ntasks, output: log })
    }

    pub fn log_path(&self, step_dir: &Path) -> PathBuf {
        step_dir.join(format!("{}.log", self.name))
    }
}
