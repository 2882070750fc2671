//! `compass list`: every test case with the number `setup` and `run` accept
//! as a filter.
//!
//! `compass list`：列出所有测试用例及其编号，该编号可作为 `setup` 和 `run` 的过滤器。

use anyhow::Result;
use colored::*;
use std::process::ExitCode;

use crate::core::registry::Registry;
use crate::core::step::StepAction;
use crate::t;

pub fn execute(verbose: bool) -> Result<ExitCode> {
    let registry = Registry::discover()?;
    println!("{}", t!("list.header", count = registry.len()).bold());

    for (i, id) in registry.case_ids()?.into_iter().enumerate() {
        let case = registry.case(id);
        println!("{:>4}: {}", i + 1, case.id());
        if !verbose {
            continue;
        }
        if !case.description().is_empty() {
            println!("        {}", case.description().dimmed());
        }
        for step in case.steps() {
            let r = step.resources();
            let action = match step.action() {
                StepAction::RunModel { suffixes, .. } => format!("model [{}]", suffixes.join(", ")),
                StepAction::Tool { tool, .. } => tool.to_string(),
            };
            println!(
                "        - {:<24} {:<20} {}",
                step.name().cyan(),
                action,
                t!(
                    "list.resources",
                    ntasks = r.ntasks,
                    min_tasks = r.min_tasks,
                    threads = r.openmp_threads
                )
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
