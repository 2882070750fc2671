//! # Test Group Integration Tests / 测试组集成测试
//!
//! Registry discovery of the shipped test groups, the global ocean factory and
//! execution planning with upstream closure.
//! 随附测试组的注册表发现、全球海洋工厂以及带上游闭包的执行计划。

use std::collections::{BTreeMap, BTreeSet};

use compass_runner::core::error::Error;
use compass_runner::core::planner::plan_execution;
use compass_runner::core::registry::{CaseId, Registry};
use compass_runner::core::test_group::TestGroup;
use compass_runner::suites::ocean::global_ocean::dynamic_adjustment::{Schedule, add_dynamic_adjustment};
use compass_runner::suites::ocean::global_ocean::init::add_init;
use compass_runner::suites::ocean::global_ocean::mesh::add_mesh;
use compass_runner::suites::ocean::global_ocean::{
    AddTestsOptions, InitialCondition, MeshKind, MeshName, TimeIntegrator, add_tests,
};

const PERFORMANCE_TEST: &str = "ocean/global_ocean/QU240/WOA23/split_explicit/performance_test";

fn ids(registry: &Registry, cases: &[CaseId]) -> Vec<String> {
    cases.iter().map(|&id| registry.case(id).id()).collect()
}

#[test]
fn test_discovery_finds_every_group() {
    let registry = Registry::discover().unwrap();
    let counts: BTreeMap<&str, usize> = registry.groups().iter().map(|g| (g.name(), g.len())).collect();
    assert_eq!(counts["drying_slope"], 4);
    assert_eq!(counts["global_ocean"], 154);
    assert_eq!(counts["hurricane"], 2);
    assert_eq!(counts["greenland"], 1);
    assert_eq!(counts["humboldt"], 11);
    assert_eq!(counts["thwaites"], 2);
    assert_eq!(registry.len(), 174);
}

#[test]
fn test_case_ids_are_unique() {
    let registry = Registry::discover().unwrap();
    let all = registry.case_ids().unwrap();
    let unique: BTreeSet<String> = ids(&registry, &all).into_iter().collect();
    assert_eq!(unique.len(), all.len());
}

#[test]
fn test_shipped_cases_resolve() {
    let registry = Registry::discover().unwrap();
    for group in registry.groups() {
        for handle in group.handles() {
            match group.resolve(handle) {
                Ok(resolved) => assert_eq!(resolved.order.len(), group.case(handle).steps().len()),
                Err(e) => panic!("{} does not resolve: {e}", group.case(handle).id()),
            }
        }
    }
}

#[test]
fn test_fris_schedule_runs_in_declared_order() {
    let registry = Registry::discover().unwrap();
    let group = registry.groups().iter().find(|g| g.name() == "global_ocean").unwrap();
    for mesh in ["FRIS01to60", "FRISwISC01to60"] {
        let handle = group
            .handle_of(&format!("{mesh}/WOA23/split_explicit/dynamic_adjustment"))
            .unwrap();
        let resolved = group.resolve(handle).unwrap();
        let declared: Vec<&str> = group.case(handle).steps().iter().map(|s| s.name()).collect();
        assert_eq!(resolved.order, declared);
        // the final run restarts from the rewritten file, not the debug chain
        assert_eq!(resolved.dependencies["simulation"], ["damped_adjustment_5"]);
        assert_eq!(resolved.dependencies["damped_adjustment_4debuge05"], ["damped_adjustment_4debugd"]);
    }
}

#[test]
fn test_factory_output_scales_with_mesh_names() {
    let qu240 = MeshName::new(MeshKind::QU240, false).unwrap();
    let icos240 = MeshName::new(MeshKind::Icos240, false).unwrap();

    let mut single = TestGroup::new("ocean", "global_ocean");
    add_tests(&mut single, &AddTestsOptions::new(vec![qu240], "qu240")).unwrap();

    let mut pair = TestGroup::new("ocean", "global_ocean");
    add_tests(&mut pair, &AddTestsOptions::new(vec![qu240, icos240], "qu240")).unwrap();

    assert_eq!(pair.len(), 2 * single.len());
    let subdirs: BTreeSet<&str> = pair.cases().iter().map(|c| c.subdir()).collect();
    assert_eq!(subdirs.len(), pair.len());
    assert_eq!(subdirs.iter().filter(|s| s.starts_with("Icos240/")).count(), single.len());
}

#[test]
fn test_family_without_schedule_stops_at_forward_tests() {
    let mut group = TestGroup::new("ocean", "global_ocean");
    let ec = vec![
        MeshName::new(MeshKind::EC30to60, false).unwrap(),
        MeshName::new(MeshKind::EC30to60, true).unwrap(),
    ];
    add_tests(&mut group, &AddTestsOptions::without_adjustment(ec)).unwrap();

    let subdirs: Vec<&str> = group.cases().iter().map(|c| c.subdir()).collect();
    assert_eq!(
        subdirs,
        [
            "EC30to60/mesh",
            "EC30to60/WOA23/init",
            "EC30to60/WOA23/split_explicit/performance_test",
            "ECwISC30to60/mesh",
            "ECwISC30to60/WOA23/init",
            "ECwISC30to60/WOA23/split_explicit/performance_test",
            "ECwISC30to60/WOA23/split_explicit/data_ice_shelf_melt",
        ]
    );
}

#[test]
fn test_every_mesh_family_is_registered_and_configures() {
    let registry = Registry::discover().unwrap();
    let group = registry.groups().iter().find(|g| g.name() == "global_ocean").unwrap();

    let mut kinds = BTreeSet::new();
    for case in group.cases().iter().filter(|c| c.name() == "mesh") {
        let mesh: MeshName = case.subdir().trim_end_matches("/mesh").parse().unwrap();
        kinds.insert(mesh.kind);
        assert!(
            group
                .get(&format!("{mesh}/WOA23/split_explicit/performance_test"))
                .is_some(),
            "{mesh} has no performance test"
        );

        let mut case = case.clone();
        case.configure(&[]).unwrap();
        let prefix = case.config().get_str("global_ocean", "prefix").unwrap();
        assert_eq!(prefix.ends_with("wISC"), mesh.ice_shelf_cavities, "{mesh}");
    }
    assert_eq!(kinds, MeshKind::ALL.into_iter().collect::<BTreeSet<_>>());

    let (_, qu) = group.get("QU/mesh").unwrap();
    let mut qu = qu.clone();
    qu.configure(&[]).unwrap();
    assert_eq!(qu.config().get_int("global_ocean", "approx_cell_count").unwrap(), 27777);
}

#[test]
fn test_factory_adds_cases_per_mesh() {
    let mut group = TestGroup::new("ocean", "global_ocean");
    let options = AddTestsOptions::new(
        vec![
            MeshName::new(MeshKind::QU240, false).unwrap(),
            MeshName::new(MeshKind::QU240, true).unwrap(),
        ],
        "qu240",
    );
    add_tests(&mut group, &options).unwrap();

    // mesh, init, performance, dynamic adjustment and E3SM files, plus data
    // ice-shelf melt on the mesh with cavities
    assert_eq!(group.len(), 11);
    assert!(group.get("QUwISC240/WOA23/split_explicit/data_ice_shelf_melt").is_some());
    assert!(group.get("QU240/WOA23/split_explicit/data_ice_shelf_melt").is_none());

    let (files, _) = group.get("QUwISC240/WOA23/split_explicit/files_for_e3sm").unwrap();
    assert_eq!(group.upstream_closure(files).len(), 4);
    assert!(group.resolve(files).is_ok());
}

#[test]
fn test_schedule_limits_time_integrators() {
    let mut group = TestGroup::new("ocean", "global_ocean");
    let fris = MeshName::new(MeshKind::FRIS01to60, false).unwrap();
    let mesh = add_mesh(&mut group, fris, false).unwrap();
    let init = add_init(&mut group, &mesh, InitialCondition::Woa23).unwrap();
    let schedule = Schedule::load("fris01to60", None).unwrap();

    let err = add_dynamic_adjustment(&mut group, &mesh, &init, TimeIntegrator::Rk4, &schedule).unwrap_err();
    assert!(matches!(err, Error::InvalidChoice { .. }));
    assert!(add_dynamic_adjustment(&mut group, &mesh, &init, TimeIntegrator::SplitExplicit, &schedule).is_ok());
}

#[test]
fn test_plan_adds_upstream_cases() {
    let registry = Registry::discover().unwrap();
    let plan = plan_execution(&registry, &[PERFORMANCE_TEST.to_string()], None, None).unwrap();
    assert_eq!(plan.requested_count, 1);
    assert_eq!(plan.upstream_added, 2);
    assert!(!plan.is_distributed);
    assert_eq!(
        ids(&registry, &plan.cases_to_run),
        [
            "ocean/global_ocean/QU240/mesh",
            "ocean/global_ocean/QU240/WOA23/init",
            PERFORMANCE_TEST,
        ]
    );

    let levels: Vec<Vec<String>> = plan
        .levels(&registry)
        .iter()
        .map(|level| ids(&registry, level))
        .collect();
    assert_eq!(levels.len(), 3);
    assert_eq!(levels[2], [PERFORMANCE_TEST]);
}

#[test]
fn test_plan_filters_by_prefix_and_number() {
    let registry = Registry::discover().unwrap();
    let plan = plan_execution(&registry, &["ocean/drying_slope".to_string()], None, None).unwrap();
    assert_eq!(plan.cases_to_run.len(), 4);
    assert_eq!(plan.upstream_added, 0);

    let plan = plan_execution(&registry, &["landice/humboldt/mesh_gen".to_string()], None, None).unwrap();
    assert_eq!(ids(&registry, &plan.cases_to_run), ["landice/humboldt/mesh_gen"]);

    let first = registry.case(registry.case_ids().unwrap()[0]).id();
    let plan = plan_execution(&registry, &["1".to_string()], None, None).unwrap();
    assert_eq!(ids(&registry, &plan.cases_to_run), [first]);
}

#[test]
fn test_plan_rejects_unknown_filter() {
    let registry = Registry::discover().unwrap();
    assert!(plan_execution(&registry, &["ocean/no_such_group".to_string()], None, None).is_err());
    assert!(plan_execution(&registry, &[], Some(2), None).is_err());
    assert!(plan_execution(&registry, &[], Some(2), Some(2)).is_err());
}

#[test]
fn test_split_runners_keep_families_together() {
    let registry = Registry::discover().unwrap();
    let filters = ["ocean/global_ocean/QU240".to_string(), "ocean/hurricane".to_string()];
    let full = plan_execution(&registry, &filters, None, None).unwrap();

    let mut seen = BTreeSet::new();
    for index in 0..3 {
        let part = plan_execution(&registry, &filters, Some(3), Some(index)).unwrap();
        assert!(part.is_distributed);
        let members: BTreeSet<_> = part.cases_to_run.iter().copied().collect();
        for &id in &part.cases_to_run {
            for up in registry.upstream_of(id) {
                assert!(members.contains(&up), "upstream case split from its family");
            }
            assert!(seen.insert(id), "case planned on two runners");
        }
    }
    assert_eq!(seen.len(), full.cases_to_run.len());
}
