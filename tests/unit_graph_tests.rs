//! # Dependency Resolution Unit Tests / 依赖解析单元测试
//!
//! Step ordering from file declarations and checks on reads across test cases.
//! 基于文件声明的步骤排序以及跨测试用例读取的检查。

use compass_runner::core::error::Error;
use compass_runner::core::files::InputFile;
use compass_runner::core::graph::resolve_steps;
use compass_runner::core::step::{Resources, Step, StepAction, Tool};
use compass_runner::core::test_case::TestCase;
use compass_runner::core::test_group::TestGroup;

fn step(name: &str, inputs: &[InputFile], outputs: &[&str]) -> Step {
    let mut step = Step::new(name, Resources::serial(), StepAction::tool(Tool::BaseMesh, [name])).unwrap();
    for input in inputs {
        step.add_input_file(input.clone()).unwrap();
    }
    step.add_output_files(outputs.iter().copied()).unwrap();
    step
}

fn case_with(steps: Vec<Step>) -> TestCase {
    let mut case = TestCase::new("ocean", "demo", "default", "default");
    for step in steps {
        case.add_step(step).unwrap();
    }
    case
}

#[test]
fn test_consumers_follow_producers() {
    let case = case_with(vec![
        step("forward", &[InputFile::local("../init/init.nc")], &["output.nc"]),
        step("analysis", &[InputFile::local("../forward/output.nc")], &[]),
        step("init", &[InputFile::local("../mesh/mesh.nc")], &["init.nc"]),
        step("mesh", &[], &["mesh.nc"]),
    ]);
    let resolved = resolve_steps(&case).unwrap();
    assert_eq!(resolved.order, ["mesh", "init", "forward", "analysis"]);
    assert_eq!(resolved.dependencies["forward"], ["init"]);
    assert!(resolved.dependencies["mesh"].is_empty());
}

#[test]
fn test_independent_steps_keep_declared_order() {
    let case = case_with(vec![step("b", &[], &["b.nc"]), step("a", &[], &["a.nc"]), step("c", &[], &[])]);
    assert_eq!(resolve_steps(&case).unwrap().order, ["b", "a", "c"]);
}

#[test]
fn test_rewritten_file_is_read_from_closest_earlier_writer() {
    let case = case_with(vec![
        step("first", &[], &["../restarts/rst.nc"]),
        step("check", &[InputFile::local("../restarts/rst.nc")], &["check.nc"]),
        step("second", &[], &["../restarts/rst.nc"]),
        step("last", &[InputFile::local("../restarts/rst.nc")], &[]),
    ]);
    let resolved = resolve_steps(&case).unwrap();
    assert_eq!(resolved.order, ["first", "check", "second", "last"]);
    assert_eq!(resolved.dependencies["check"], ["first"]);
    assert_eq!(resolved.dependencies["last"], ["second"]);
}

#[test]
fn test_rewrite_waits_for_earlier_reader() {
    let case = case_with(vec![
        step("first", &[], &["../restarts/rst.nc"]),
        step(
            "check",
            &[InputFile::local("../restarts/rst.nc"), InputFile::local("../extra/extra.nc")],
            &[],
        ),
        step("second", &[], &["../restarts/rst.nc"]),
        step("extra", &[], &["extra.nc"]),
    ]);
    let resolved = resolve_steps(&case).unwrap();
    assert_eq!(resolved.order, ["first", "extra", "check", "second"]);
}

#[test]
fn test_reader_before_every_writer_is_ambiguous() {
    let case = case_with(vec![
        step("check", &[InputFile::local("../restarts/rst.nc")], &[]),
        step("first", &[], &["../restarts/rst.nc"]),
        step("second", &[], &["../restarts/rst.nc"]),
    ]);
    let err = resolve_steps(&case).unwrap_err();
    assert!(matches!(err, Error::AmbiguousProducer { ref producers, .. } if producers == &["first", "second"]));
}

#[test]
fn test_writers_without_readers_keep_declared_order() {
    let case = case_with(vec![
        step("first", &[], &["../restarts/rst.nc"]),
        step("second", &[], &["../restarts/rst.nc"]),
    ]);
    assert_eq!(resolve_steps(&case).unwrap().order, ["first", "second"]);
}

#[test]
fn test_unproduced_input_is_missing_dependency() {
    let case = case_with(vec![step("forward", &[InputFile::local("init.nc")], &[])]);
    assert!(matches!(resolve_steps(&case), Err(Error::MissingDependency { .. })));
}

#[test]
fn test_provided_inputs_need_no_producer() {
    let case = case_with(vec![step(
        "forward",
        &[
            InputFile::from_package("namelist.forward", "ocean/drying_slope", "namelist.forward"),
            InputFile::from_database("topography.nc", "bathymetry_database", "topo.nc"),
            InputFile::link("tables.nc", "/opt/data/tables.nc"),
        ],
        &[],
    )]);
    assert_eq!(resolve_steps(&case).unwrap().order, ["forward"]);
}

#[test]
fn test_cycle_is_reported() {
    let case = case_with(vec![
        step("a", &[InputFile::local("../b/b.nc")], &["a.nc"]),
        step("b", &[InputFile::local("../a/a.nc")], &["b.nc"]),
    ]);
    assert!(matches!(resolve_steps(&case), Err(Error::DependencyCycle { .. })));
}

#[test]
fn test_reads_across_cases_need_declared_upstream() {
    let mut group = TestGroup::new("ocean", "demo");
    let mut mesh = group.new_case("mesh", "QU240/mesh");
    mesh.add_step(step("mesh", &[], &["mesh.nc"])).unwrap();
    let mesh_handle = group.add_test_case(mesh).unwrap();

    let reader = |group: &TestGroup, subdir: &str, target: &str| {
        let mut case = group.new_case("init", subdir);
        case.add_step(step("init", &[InputFile::link("mesh.nc", target)], &["init.nc"]))
            .unwrap();
        case
    };

    let declared = reader(&group, "QU240/init", "demo/QU240/mesh/mesh/mesh.nc");
    let declared = group.add_test_case_after(declared, &[mesh_handle]).unwrap();
    let resolved = group.resolve(declared).unwrap();
    assert_eq!(resolved.external_inputs.len(), 1);

    let undeclared = reader(&group, "QU240/init_again", "demo/QU240/mesh/mesh/mesh.nc");
    let undeclared = group.add_test_case(undeclared).unwrap();
    assert!(matches!(group.resolve(undeclared), Err(Error::UndeclaredDependency { .. })));

    let wrong_file = reader(&group, "QU240/init_wrong", "demo/QU240/mesh/mesh/other.nc");
    let wrong_file = group.add_test_case_after(wrong_file, &[mesh_handle]).unwrap();
    assert!(matches!(group.resolve(wrong_file), Err(Error::MissingDependency { .. })));
}

#[test]
fn test_subdirs_must_be_unique_and_disjoint() {
    let mut group = TestGroup::new("ocean", "demo");
    group.add_test_case(group.new_case("mesh", "QU240/mesh")).unwrap();
    assert!(matches!(
        group.add_test_case(group.new_case("mesh", "QU240/mesh")),
        Err(Error::DuplicateTestCase { .. })
    ));
    assert!(matches!(
        group.add_test_case(group.new_case("inner", "QU240/mesh/inner")),
        Err(Error::OverlappingSubdir { .. })
    ));
    assert!(matches!(
        group.add_test_case(group.new_case("outer", "QU240")),
        Err(Error::OverlappingSubdir { .. })
    ));
    assert!(group.add_test_case(group.new_case("init", "QU240/init")).is_ok());
}
