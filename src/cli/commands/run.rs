//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command, which sets up and runs the
//! selected test cases level by level: every case of a level has all of its
//! upstream cases in earlier levels, so the cases of one level run in
//! parallel.
//!
//! 此模块实现 `run` 命令，逐层设置并运行所选测试用例：每一层中用例的上游用例都位于更早的层，
//! 因此同一层的用例可以并行运行。

use anyhow::Result;
use colored::*;
use futures::{StreamExt, stream};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cli::commands::{SharedArgs, run_options};
use crate::core::execution::{RunOptions, run_test_case};
use crate::core::models::{CaseSummary, FailureReason, SkipReason, TestResult};
use crate::core::planner;
use crate::core::registry::{CaseId, Registry};
use crate::reporting::{console, html, json};
use crate::t;

/// Arguments of `compass run`.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub shared: SharedArgs,
    pub jobs: Option<usize>,
    pub total_runners: Option<usize>,
    pub runner_index: Option<usize>,
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub baseline: Option<PathBuf>,
}

/// Executes the run command with the provided arguments.
///
/// # Returns
/// `ExitCode::SUCCESS` when no test case failed and the run was not
/// interrupted.
pub async fn execute(args: RunArgs, locale: &str) -> Result<ExitCode> {
    let options = Arc::new(run_options(&args.shared, args.baseline.as_deref())?);
    let registry = Arc::new(Registry::discover()?);
    let plan = planner::plan_execution(&registry, &args.shared.filters, args.total_runners, args.runner_index)?;

    println!("{}", t!("run.work_dir", path = options.work_dir.display()));
    if plan.upstream_added > 0 {
        println!(
            "{}",
            t!(
                "run.upstream_added",
                requested = plan.requested_count,
                added = plan.upstream_added
            )
            .cyan()
        );
    }
    if let (Some(total), Some(index)) = (args.total_runners, args.runner_index) {
        println!(
            "{}",
            t!(
                "run.split_runner",
                index = index + 1,
                total = total,
                count = plan.cases_to_run.len()
            )
            .bold()
        );
    }

    if plan.cases_to_run.is_empty() {
        println!("{}", t!("run.no_cases").green());
        return Ok(ExitCode::SUCCESS);
    }

    let jobs = args.jobs.unwrap_or(num_cpus::get() / 2 + 1).max(1);
    let stop_token = setup_signal_handler();
    let levels = plan.levels(&registry);
    let results = run_levels(&registry, levels, jobs, options, stop_token.clone()).await;

    console::print_summary(&results, locale);

    if let Some(path) = &args.html {
        println!("\n{}", t!("report.html_writing", path = path.display()));
        if let Err(e) = html::generate_html_report(&results, path, locale) {
            eprintln!("{} {:#}", t!("report.html_failed").red(), e);
        }
    }
    if let Some(path) = &args.json {
        println!("{}", t!("report.json_writing", path = path.display()));
        if let Err(e) = json::write_json_report(&results, path) {
            eprintln!("{} {:#}", t!("report.json_failed").red(), e);
        }
    }

    let failures: Vec<&TestResult> = results.iter().filter(|r| r.is_failure()).collect();
    if !failures.is_empty() {
        console::print_failure_details(&failures, locale);
        println!("\n{}", t!("run.some_failed", count = failures.len()).red().bold());
        Ok(ExitCode::FAILURE)
    } else if stop_token.is_cancelled() {
        println!("\n{}", t!("run.interrupted").yellow().bold());
        Ok(ExitCode::FAILURE)
    } else {
        println!("\n{}", t!("run.all_passed").green().bold());
        Ok(ExitCode::SUCCESS)
    }
}

/// Cancels the returned token on Ctrl-C.
fn setup_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("\n{}", t!("run.shutdown_signal").yellow());
                token_clone.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for Ctrl-C"),
        }
    });

    token
}

/// Why `id` cannot run, if one of its upstream cases did not pass.
fn blocked_by(registry: &Registry, id: CaseId, finished: &BTreeMap<CaseId, TestResult>) -> Option<String> {
    registry
        .upstream_of(id)
        .into_iter()
        .find(|up| finished.get(up).is_none_or(|r| !r.is_passed()))
        .map(|up| registry.case(up).id())
}

/// Runs the levels in order, returning results in plan order.
async fn run_levels(
    registry: &Arc<Registry>,
    levels: Vec<Vec<CaseId>>,
    jobs: usize,
    options: Arc<RunOptions>,
    stop_token: CancellationToken,
) -> Vec<TestResult> {
    let mut finished: BTreeMap<CaseId, TestResult> = BTreeMap::new();
    let mut order = Vec::new();

    for (depth, level) in levels.into_iter().enumerate() {
        debug!(level = depth, cases = level.len(), "starting dependency level");
        order.extend(level.iter().copied());

        let mut runnable = Vec::new();
        for id in level {
            let summary = CaseSummary::of(registry.case(id));
            if stop_token.is_cancelled() {
                finished.insert(
                    id,
                    TestResult::Skipped {
                        case: summary,
                        reason: SkipReason::Cancelled,
                    },
                );
            } else if let Some(upstream) = blocked_by(registry, id, &finished) {
                println!("{}", t!("run.case_skipped", name = summary.id, upstream = upstream).dimmed());
                finished.insert(
                    id,
                    TestResult::Skipped {
                        case: summary,
                        reason: SkipReason::UpstreamFailed(upstream),
                    },
                );
            } else {
                runnable.push(id);
            }
        }

        let level_results: Vec<(CaseId, TestResult)> = stream::iter(runnable.into_iter().map(|id| {
            let registry = Arc::clone(registry);
            let options = Arc::clone(&options);
            let stop_token = stop_token.clone();
            async move {
                let summary = CaseSummary::of(registry.case(id));
                let task_registry = Arc::clone(&registry);
                let mut handle = tokio::spawn(async move { run_test_case(&task_registry, id, &options).await });

                let result = tokio::select! {
                    biased;
                    _ = stop_token.cancelled() => {
                        handle.abort();
                        TestResult::Skipped { case: summary, reason: SkipReason::Cancelled }
                    }
                    joined = &mut handle => match joined {
                        Ok(result) => result,
                        Err(e) => TestResult::Failed {
                            case: summary,
                            output: format!("test case task ended abnormally: {e}"),
                            reason: FailureReason::Execution,
                            step: None,
                            duration: Duration::default(),
                        },
                    },
                };
                (id, result)
            }
        }))
        .buffer_unordered(jobs)
        .collect()
        .await;

        finished.extend(level_results);
    }

    order.into_iter().filter_map(|id| finished.remove(&id)).collect()
}
