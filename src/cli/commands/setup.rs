//! `compass setup`: lay out work directories without running anything.
//! `compass setup`：布置工作目录而不运行任何内容。

use anyhow::Result;
use colored::*;
use std::process::ExitCode;

use crate::cli::commands::{SharedArgs, run_options};
use crate::core::execution::setup_test_case;
use crate::core::planner;
use crate::core::registry::Registry;
use crate::t;

/// Sets up the selected test cases and their upstream test cases, so that
/// links into upstream work directories point somewhere.
///
/// 设置所选测试用例及其上游测试用例，使指向上游工作目录的链接有所指向。
pub async fn execute(args: SharedArgs) -> Result<ExitCode> {
    let options = run_options(&args, None)?;
    let registry = Registry::discover()?;
    let plan = planner::plan_execution(&registry, &args.filters, None, None)?;

    println!(
        "{}",
        t!("setup.start", count = plan.cases_to_run.len(), path = options.work_dir.display()).bold()
    );

    let mut failures = 0;
    for id in &plan.cases_to_run {
        let group = registry.group(id.group);
        let case = registry.case(*id);
        match setup_test_case(group, id.case, &options).await {
            Ok(prepared) => println!(
                "  {} {} -> {}",
                "✔".green(),
                case.id(),
                prepared.case_dir.display()
            ),
            Err(e) => {
                failures += 1;
                println!("  {} {}: {}", "✘".red(), case.id(), e);
            }
        }
    }

    if failures > 0 {
        println!("\n{}", t!("setup.failed", count = failures).red().bold());
        Ok(ExitCode::FAILURE)
    } else {
        println!("\n{}", t!("setup.done").green().bold());
        Ok(ExitCode::SUCCESS)
    }
}
