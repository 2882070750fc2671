use compass_runner::core::planner::plan_execution;
use compass_runner::core::registry::Registry;
use compass_runner::core::templates::Namelist;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const NAMELIST: &str = include_str!("../resources/ocean/global_ocean/namelist.forward");

fn bench_discover(c: &mut Criterion) {
    c.bench_function("discover_registry", |b| {
        b.iter(|| black_box(Registry::discover().unwrap().len()));
    });
}

fn bench_resolve_all(c: &mut Criterion) {
    let registry = Registry::discover().unwrap();
    c.bench_function("resolve_all_cases", |b| {
        b.iter(|| {
            for group in registry.groups() {
                for handle in group.handles() {
                    let _ = black_box(group.resolve(handle));
                }
            }
        });
    });
}

fn bench_plan(c: &mut Criterion) {
    let registry = Registry::discover().unwrap();
    let filters = vec!["ocean/global_ocean".to_string()];
    c.bench_function("plan_global_ocean", |b| {
        b.iter(|| {
            let plan = plan_execution(&registry, &filters, None, None).unwrap();
            black_box(plan.levels(&registry).len())
        });
    });
}

fn bench_namelist(c: &mut Criterion) {
    c.bench_function("parse_render_namelist", |b| {
        b.iter(|| {
            let mut namelist = Namelist::parse("namelist.forward", NAMELIST).unwrap();
            namelist.set("config_dt", "'00:10:00'").unwrap();
            black_box(namelist.render())
        });
    });
}

criterion_group!(benches, bench_discover, bench_resolve_all, bench_plan, bench_namelist);
criterion_main!(benches);
