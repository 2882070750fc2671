//! # Step Unit Tests / 步骤单元测试
//!
//! Resource requests, file declarations, generated files and the command
//! lines a step would run.
//! 资源请求、文件声明、生成的文件以及步骤将要运行的命令行。

use compass_runner::core::config::{ConfigCascade, ConfigLayer};
use compass_runner::core::error::Error;
use compass_runner::core::files::InputFile;
use compass_runner::core::step::{Resources, Step, StepAction, Tool};

const PACKAGE: &str = "ocean/drying_slope";

fn config(extra: &str) -> ConfigCascade {
    let mut config = ConfigCascade::new();
    config.add_from_package("framework", "default.toml").unwrap();
    config
        .add_layer(ConfigLayer::from_toml_str("test", extra).unwrap())
        .unwrap();
    config
}

#[test]
fn test_resources_validation() {
    assert!(Resources::new(4, 1, 1).validate("s").is_ok());
    for bad in [Resources::new(0, 0, 1), Resources::new(2, 4, 1), Resources::new(4, 1, 0)] {
        assert!(matches!(bad.validate("s"), Err(Error::InvalidResources { .. })));
    }
    assert!(Step::new("bad", Resources::new(1, 2, 1), StepAction::tool(Tool::Partition, ["x"])).is_err());
}

#[test]
fn test_effective_tasks_respect_minimum() {
    let resources = Resources::new(16, 4, 1);
    assert_eq!(resources.effective_tasks("s", 32).unwrap(), 16);
    assert_eq!(resources.effective_tasks("s", 8).unwrap(), 8);
    assert!(matches!(
        resources.effective_tasks("s", 2),
        Err(Error::InsufficientResources { available: 2, .. })
    ));
}

#[test]
fn test_duplicate_files_are_rejected() {
    let mut step = Step::new("forward", Resources::serial(), StepAction::run_model("forward", "mesh.nc")).unwrap();
    step.add_input_file(InputFile::local("mesh.nc")).unwrap();
    assert!(matches!(
        step.add_input_file(InputFile::link("./mesh.nc", "other/mesh.nc")),
        Err(Error::DuplicateFile { .. })
    ));
    step.add_output_file("output.nc").unwrap();
    assert!(matches!(step.add_output_file("output.nc"), Err(Error::DuplicateFile { .. })));
    step.add_namelist_file(PACKAGE, "namelist.forward", "forward").unwrap();
    assert!(step.add_namelist_file(PACKAGE, "namelist.forward", "forward").is_err());
}

#[test]
fn test_namelist_options_need_a_namelist() {
    let mut step = Step::new("forward", Resources::serial(), StepAction::run_model("forward", "mesh.nc")).unwrap();
    assert!(matches!(
        step.add_namelist_options("forward", [("config_dt", "'0000_00:00:10'")]),
        Err(Error::MissingNamelist { .. })
    ));
}

#[test]
fn test_render_files_applies_options_and_tokens() {
    let mut step = Step::new("forward", Resources::serial(), StepAction::run_model("forward", "mesh.nc")).unwrap();
    step.add_namelist_file(PACKAGE, "namelist.forward", "forward").unwrap();
    step.add_namelist_options("forward", [("config_dt", "'0000_00:00:10'")]).unwrap();
    step.add_streams_file(PACKAGE, "streams.forward", "forward").unwrap();
    step.add_streams_replacements("forward", [("output_interval", "0000_02:00:00")])
        .unwrap();

    let files = step.render_files().unwrap();
    let names: Vec<&str> = files.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["namelist.forward", "streams.forward"]);
    assert!(files[0].1.contains("config_dt = '0000_00:00:10'"));
    assert!(files[1].1.contains("output_interval=\"0000_02:00:00\""));
}

#[test]
fn test_unknown_namelist_option_fails_when_rendering() {
    let mut step = Step::new("forward", Resources::serial(), StepAction::run_model("forward", "mesh.nc")).unwrap();
    step.add_namelist_file(PACKAGE, "namelist.forward", "forward").unwrap();
    step.add_namelist_options("forward", [("config_not_an_option", "1")]).unwrap();
    assert!(matches!(step.render_files(), Err(Error::UnknownNamelistOption { .. })));
}

#[test]
fn test_model_commands_with_several_tasks() {
    let step = Step::new("forward", Resources::new(4, 1, 2), StepAction::run_model("forward", "init.nc")).unwrap();
    let config = config("[parallel]\nlauncher = \"srun -n {ntasks} -c {openmp_threads}\"");
    let commands = step.commands(&config, 4).unwrap();
    assert_eq!(commands.len(), 3);
    assert_eq!(commands[0], ["compass-graph-file", "init.nc", "graph.info"]);
    assert_eq!(commands[1], ["gpmetis", "graph.info", "4"]);
    assert_eq!(
        commands[2],
        ["srun", "-n", "4", "-c", "2", "ocean_model", "-n", "namelist.forward", "-s", "streams.forward"]
    );
}

#[test]
fn test_serial_model_run_skips_partitioning() {
    let step = Step::new(
        "run",
        Resources::serial(),
        StepAction::RunModel {
            suffixes: vec!["landice".to_string(), "landice.rst".to_string()],
            graph_mesh: None,
        },
    )
    .unwrap();
    let config = config("[parallel]\nlauncher = \"\"\n[executables]\nmodel = \"landice_model\"");
    let commands = step.commands(&config, 1).unwrap();
    assert_eq!(
        commands,
        vec![
            vec!["landice_model", "-n", "namelist.landice", "-s", "streams.landice"],
            vec!["landice_model", "-n", "namelist.landice.rst", "-s", "streams.landice.rst"],
        ]
    );
}

#[test]
fn test_parallel_run_without_graph_is_not_partitioned() {
    let step = Step::new(
        "run",
        Resources::new(4, 1, 1),
        StepAction::RunModel {
            suffixes: vec!["landice".to_string()],
            graph_mesh: None,
        },
    )
    .unwrap();
    let config = config("[parallel]\nlauncher = \"mpirun -n {ntasks}\"\n[executables]\nmodel = \"landice_model\"");
    let commands = step.commands(&config, 4).unwrap();
    assert_eq!(
        commands,
        vec![vec!["mpirun", "-n", "4", "landice_model", "-n", "namelist.landice", "-s", "streams.landice"]]
    );
}

#[test]
fn test_tool_command_appends_arguments() {
    let step = Step::new(
        "cull_mesh",
        Resources::serial(),
        StepAction::tool(Tool::CullMesh, ["base_mesh.nc", "culled_mesh.nc"]),
    )
    .unwrap();
    let config = config("[executables]\ncull_mesh = \"python -m cull --verbose\"");
    let commands = step.commands(&config, 1).unwrap();
    assert_eq!(commands, vec![vec!["python", "-m", "cull", "--verbose", "base_mesh.nc", "culled_mesh.nc"]]);
}

#[test]
fn test_resources_follow_config_overrides() {
    let mut step = Step::new("forward", Resources::new(4, 1, 1), StepAction::run_model("forward", "init.nc"))
        .unwrap()
        .with_resource_options("drying_slope", "forward");
    step.configure_resources(&config("[drying_slope]\nforward_ntasks = 16\nforward_threads = 2"))
        .unwrap();
    assert_eq!(step.resources(), Resources::new(16, 1, 2));

    assert!(matches!(
        step.configure_resources(&config("[drying_slope]\nforward_ntasks = 2\nforward_min_tasks = 3")),
        Err(Error::InvalidResources { .. })
    ));
}
