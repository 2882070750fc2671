//! # Execution Integration Tests / 执行集成测试
//!
//! Runs small test cases end to end against stand-in executables written as
//! shell scripts into a temporary directory.
//!
//! 针对写入临时目录的 shell 脚本替身程序，端到端地运行小型测试用例。
#![cfg(unix)]

mod common;

use std::fs;

use common::Sandbox;
use compass_runner::core::config::ConfigLayer;
use compass_runner::core::execution::{run_test_case, setup_test_case};
use compass_runner::core::files::InputFile;
use compass_runner::core::models::{FailureReason, TestResult};
use compass_runner::core::registry::{CaseId, Registry};
use compass_runner::core::step::{Resources, Step, StepAction, Tool};
use compass_runner::core::test_case::{Comparison, TestCase};
use compass_runner::core::test_group::TestGroup;
use compass_runner::infra::command::{build_command, spawn_and_capture};

fn model_run(name: &str, suffix: &str) -> Step {
    let action = StepAction::RunModel {
        suffixes: vec![suffix.to_string()],
        graph_mesh: None,
    };
    let mut run = Step::new(name, Resources::serial(), action).unwrap();
    run.add_input_file(InputFile::local("../mesh/mesh.nc")).unwrap();
    run.add_output_file("output.nc").unwrap();
    run
}

/// `mesh` touches `mesh_arg`, then one model run per suffix reads `mesh.nc`.
fn demo_case(group: &TestGroup, subdir: &str, mesh_arg: &str, suffixes: &[&str]) -> TestCase {
    let mut case = group.new_case("default", subdir);

    let mut mesh = Step::new("mesh", Resources::serial(), StepAction::tool(Tool::BaseMesh, [mesh_arg])).unwrap();
    mesh.add_output_file("mesh.nc").unwrap();
    case.add_step(mesh).unwrap();

    for suffix in suffixes {
        case.add_step(model_run(&format!("run_{suffix}"), suffix)).unwrap();
    }
    case
}

fn single_case_registry(case: TestCase) -> (Registry, CaseId) {
    let mut group = TestGroup::new("ocean", "demo");
    let handle = group.add_test_case(case).unwrap();
    let mut registry = Registry::new();
    registry.add_test_group(group).unwrap();
    (registry, CaseId { group: 0, case: handle })
}

fn failure_of(result: &TestResult) -> (FailureReason, Option<&str>) {
    match result {
        TestResult::Failed { reason, step, .. } => (*reason, step.as_deref()),
        other => panic!("expected a failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_case_without_comparisons_passes_unvalidated() {
    let sandbox = Sandbox::new();
    let group = TestGroup::new("ocean", "demo");
    let (registry, id) = single_case_registry(demo_case(&group, "plain", "mesh.nc", &["forward"]));

    let result = run_test_case(&registry, id, &sandbox.options(vec![])).await;
    match &result {
        TestResult::Passed { validated, output, .. } => {
            assert!(!validated);
            assert!(output.contains("$ "));
        }
        other => panic!("expected a pass, got {other:?}"),
    }

    let case_dir = sandbox.work_dir().join("demo/plain");
    assert!(case_dir.join("default.cfg").exists());
    assert!(case_dir.join("run_forward/output.nc").exists());
    assert!(case_dir.join("mesh/mesh.log").exists());
}

#[tokio::test]
async fn test_failing_step_stops_the_case() {
    let sandbox = Sandbox::new();
    let broken = sandbox.script("broken", "echo 'cannot build mesh' >&2; exit 3");
    let layer = ConfigLayer::new("broken").with_option("executables", "base_mesh", broken.display());
    let group = TestGroup::new("ocean", "demo");
    let (registry, id) = single_case_registry(demo_case(&group, "broken", "mesh.nc", &["forward"]));

    let result = run_test_case(&registry, id, &sandbox.options(vec![layer])).await;
    assert_eq!(failure_of(&result), (FailureReason::Execution, Some("mesh")));
    assert!(result.get_output().contains("cannot build mesh"));
    assert!(!sandbox.work_dir().join("demo/broken/run_forward/output.nc").exists());
}

#[tokio::test]
async fn test_unwritten_output_is_missing_dependency() {
    let sandbox = Sandbox::new();
    let group = TestGroup::new("ocean", "demo");
    // the mesh tool touches a different file than the one it declares
    let (registry, id) = single_case_registry(demo_case(&group, "missing", "other.nc", &["forward"]));

    let result = run_test_case(&registry, id, &sandbox.options(vec![])).await;
    assert_eq!(failure_of(&result), (FailureReason::MissingDependency, Some("run_forward")));
}

#[tokio::test]
async fn test_matching_outputs_validate() {
    let sandbox = Sandbox::new();
    let group = TestGroup::new("ocean", "demo");
    let mut case = demo_case(&group, "same", "mesh.nc", &["forward"]);
    case.add_step(model_run("rerun", "forward")).unwrap();
    case.add_validation(Comparison::new(["temperature"], "run_forward/output.nc", Some("rerun/output.nc")));
    let (registry, id) = single_case_registry(case);

    let result = run_test_case(&registry, id, &sandbox.options(vec![])).await;
    assert!(matches!(result, TestResult::Passed { validated: true, .. }), "{result:?}");
}

#[tokio::test]
async fn test_mismatched_outputs_fail_validation() {
    let sandbox = Sandbox::new();
    let group = TestGroup::new("ocean", "demo");
    let mut case = demo_case(&group, "different", "mesh.nc", &["forward", "other"]);
    case.add_validation(Comparison::new(
        ["temperature", "salinity"],
        "run_forward/output.nc",
        Some("run_other/output.nc"),
    ));
    let (registry, id) = single_case_registry(case);

    let result = run_test_case(&registry, id, &sandbox.options(vec![])).await;
    assert_eq!(failure_of(&result), (FailureReason::Validation, None));
    assert!(result.get_output().contains("temperature, salinity"));
}

#[tokio::test]
async fn test_baseline_comparison_is_skipped_without_baseline() {
    let sandbox = Sandbox::new();
    let group = TestGroup::new("ocean", "demo");
    let mut case = demo_case(&group, "baseline", "mesh.nc", &["forward"]);
    case.add_validation(Comparison::new(["temperature"], "run_forward/output.nc", None));
    let (registry, id) = single_case_registry(case);

    let result = run_test_case(&registry, id, &sandbox.options(vec![])).await;
    assert!(matches!(result, TestResult::Passed { validated: false, .. }), "{result:?}");

    // a second run compares against the first one
    let second = Sandbox::new();
    let mut options = second.options(vec![]);
    options.baseline_dir = Some(sandbox.work_dir());
    let result = run_test_case(&registry, id, &options).await;
    assert!(matches!(result, TestResult::Passed { validated: true, .. }), "{result:?}");
}

#[tokio::test]
async fn test_unusable_baseline_option_fails_the_case() {
    let sandbox = Sandbox::new();
    let layer = ConfigLayer::new("baseline").with_option(
        "validation",
        "baseline_dir",
        "$COMPASS_TEST_UNDEFINED_BASELINE_ROOT/runs",
    );
    let group = TestGroup::new("ocean", "demo");
    let mut case = demo_case(&group, "bad_baseline", "mesh.nc", &["forward"]);
    case.add_validation(Comparison::new(["temperature"], "run_forward/output.nc", None));
    let (registry, id) = single_case_registry(case);

    let result = run_test_case(&registry, id, &sandbox.options(vec![layer])).await;
    assert_eq!(failure_of(&result), (FailureReason::Configuration, None));
    assert!(result.get_output().contains("baseline_dir"));
}

#[tokio::test]
async fn test_slow_step_times_out() {
    let sandbox = Sandbox::new();
    let slow = sandbox.script("slow", "sleep 5");
    let layer = ConfigLayer::new("slow")
        .with_option("executables", "base_mesh", slow.display())
        .with_option("execution", "step_timeout_secs", 1);
    let group = TestGroup::new("ocean", "demo");
    let (registry, id) = single_case_registry(demo_case(&group, "slow", "mesh.nc", &["forward"]));

    let result = run_test_case(&registry, id, &sandbox.options(vec![layer])).await;
    assert_eq!(failure_of(&result), (FailureReason::Timeout, Some("mesh")));
    assert!(result.is_timeout());
}

#[tokio::test]
async fn test_downstream_case_reads_upstream_outputs() {
    let sandbox = Sandbox::new();
    let mut group = TestGroup::new("ocean", "demo");
    let mesh = group.add_test_case(demo_case(&group, "base", "mesh.nc", &[])).unwrap();

    let mut forward = group.new_case("forward", "forward");
    let action = StepAction::RunModel {
        suffixes: vec!["forward".to_string()],
        graph_mesh: Some("mesh.nc".to_string()),
    };
    let mut run = Step::new("run", Resources::serial(), action).unwrap();
    run.add_input_file(InputFile::link("mesh.nc", "demo/base/mesh/mesh.nc")).unwrap();
    run.add_output_file("output.nc").unwrap();
    forward.add_step(run).unwrap();
    let downstream = group.add_test_case_after(forward, &[mesh]).unwrap();

    let mut registry = Registry::new();
    registry.add_test_group(group).unwrap();
    let options = sandbox.options(vec![]);

    let upstream = run_test_case(&registry, CaseId { group: 0, case: mesh }, &options).await;
    assert!(upstream.is_passed(), "{upstream:?}");
    let result = run_test_case(&registry, CaseId { group: 0, case: downstream }, &options).await;
    assert!(result.is_passed(), "{result:?}");

    let run_dir = sandbox.work_dir().join("demo/forward/run");
    assert!(fs::symlink_metadata(run_dir.join("mesh.nc")).unwrap().file_type().is_symlink());
    assert!(run_dir.join("graph.info").exists());
}

#[tokio::test]
async fn test_setup_writes_config_and_namelists() {
    let sandbox = Sandbox::new();
    let registry = Registry::discover().unwrap();
    let group = registry.groups().iter().find(|g| g.name() == "drying_slope").unwrap();
    let handle = group.handle_of("1km/single_layer/default").unwrap();

    let prepared = setup_test_case(group, handle, &sandbox.options(vec![])).await.unwrap();
    assert_eq!(prepared.resolved.order, ["base_mesh", "initial_state", "forward"]);

    let case_dir = prepared.case_dir;
    assert_eq!(case_dir, sandbox.work_dir().join("drying_slope/1km/single_layer/default"));
    let config = fs::read_to_string(case_dir.join("default.cfg")).unwrap();
    assert!(config.contains("[drying_slope]"));

    let init = fs::read_to_string(case_dir.join("initial_state/namelist.init")).unwrap();
    assert!(init.contains("config_drying_slope_coord_type = 'single_layer'"));
    assert!(init.contains("config_vert_levels = 1"));
    let streams = fs::read_to_string(case_dir.join("forward/streams.forward")).unwrap();
    assert!(streams.contains("0000_01:00:00"));
    assert!(fs::symlink_metadata(case_dir.join("initial_state/base_mesh.nc")).is_ok());
}

#[tokio::test]
async fn test_capture_keeps_reading_after_invalid_utf8() {
    let sandbox = Sandbox::new();
    let line = "x".repeat(80);
    let noisy = sandbox.script(
        "noisy",
        &format!("printf 'start\\n\\377\\n'\ni=0\nwhile [ $i -lt 3000 ]; do echo {line}; i=$((i+1)); done\necho done-marker"),
    );
    let cmd = build_command(&[noisy.display().to_string()], sandbox.path(), &[]).unwrap();

    let (status, output) = spawn_and_capture(cmd).await;
    assert!(status.unwrap().success());
    assert!(output.starts_with("start\n\u{FFFD}\n"));
    assert_eq!(output.lines().filter(|l| *l == line).count(), 3000);
    assert!(output.ends_with("done-marker\n"));
}
