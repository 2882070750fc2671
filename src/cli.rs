//! # Command-Line Interface / 命令行接口
//!
//! The `compass` command tree: `list`, `setup`, `run` and `init`. Help texts
//! are localized, so the language is picked before clap builds the commands.
//!
//! `compass` 命令树：`list`、`setup`、`run` 和 `init`。帮助文本经过本地化，
//! 因此在 clap 构建命令之前先确定语言。

pub mod commands;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf, process::ExitCode};

use crate::{infra::logging::init_logging, match_locale, t};

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` or `--lang=<VALUE>` argument.
fn pre_parse_language() -> String {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        if let Some(lang) = args.get(pos + 1) {
            return match_locale(lang);
        }
    }
    if let Some(lang) = args.iter().find_map(|arg| arg.strip_prefix("--lang=")) {
        return match_locale(lang);
    }
    // Fallback to system language detection
    match_locale(&sys_locale::get_locale().unwrap_or_else(|| "en".to_string()))
}

fn filters_arg(locale: &str) -> Arg {
    Arg::new("filters")
        .help(t!("cli.arg_filters", locale = locale).to_string())
        .value_name("FILTER")
        .num_args(0..)
        .action(ArgAction::Append)
}

fn work_dir_arg(locale: &str) -> Arg {
    Arg::new("work-dir")
        .short('w')
        .long("work-dir")
        .help(t!("cli.arg_work_dir", locale = locale).to_string())
        .value_name("WORK_DIR")
        .default_value(".")
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn config_arg(locale: &str) -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("cli.arg_config", locale = locale).to_string())
        .value_name("CONFIG")
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("compass")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.arg_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help(t!("cli.arg_verbose", locale = locale).to_string())
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(Command::new("list").about(t!("cli.cmd_list_about", locale = locale).to_string()))
        .subcommand(
            Command::new("setup")
                .about(t!("cli.cmd_setup_about", locale = locale).to_string())
                .arg(filters_arg(locale))
                .arg(work_dir_arg(locale))
                .arg(config_arg(locale)),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.cmd_run_about", locale = locale).to_string())
                .arg(filters_arg(locale))
                .arg(work_dir_arg(locale))
                .arg(config_arg(locale))
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help(t!("cli.arg_jobs", locale = locale).to_string())
                        .value_name("JOBS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("total-runners")
                        .long("total-runners")
                        .help(t!("cli.arg_total_runners", locale = locale).to_string())
                        .value_name("TOTAL_RUNNERS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("runner-index"),
                )
                .arg(
                    Arg::new("runner-index")
                        .long("runner-index")
                        .help(t!("cli.arg_runner_index", locale = locale).to_string())
                        .value_name("RUNNER_INDEX")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("total-runners"),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("cli.arg_html", locale = locale).to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help(t!("cli.arg_json", locale = locale).to_string())
                        .value_name("JSON")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("baseline")
                        .long("baseline")
                        .help(t!("cli.arg_baseline", locale = locale).to_string())
                        .value_name("BASELINE_DIR")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cli.cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("cli.arg_non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help(t!("cli.arg_output", locale = locale).to_string())
                        .value_name("OUTPUT")
                        .default_value(commands::DEFAULT_USER_CONFIG)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .help(t!("cli.arg_force", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn filters(matches: &ArgMatches) -> Vec<String> {
    matches
        .get_many::<String>("filters")
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// Parses the command line and runs the chosen subcommand.
/// 解析命令行并运行所选的子命令。
pub async fn run() -> Result<ExitCode> {
    // Pre-parse language and initialize i18n first.
    let language = pre_parse_language();
    rust_i18n::set_locale(&language);

    let matches = build_cli(&language).get_matches();
    let verbose = matches.get_flag("verbose");
    init_logging(verbose);

    match matches.subcommand() {
        Some(("list", _)) => commands::list::execute(verbose),
        Some(("setup", setup_matches)) => {
            let options = commands::SharedArgs {
                filters: filters(setup_matches),
                work_dir: setup_matches
                    .get_one::<PathBuf>("work-dir")
                    .cloned()
                    .unwrap_or_else(|| PathBuf::from(".")),
                config: setup_matches.get_one::<PathBuf>("config").cloned(),
            };
            commands::setup::execute(options).await
        }
        Some(("run", run_matches)) => {
            let shared = commands::SharedArgs {
                filters: filters(run_matches),
                work_dir: run_matches
                    .get_one::<PathBuf>("work-dir")
                    .cloned()
                    .unwrap_or_else(|| PathBuf::from(".")),
                config: run_matches.get_one::<PathBuf>("config").cloned(),
            };
            let args = commands::run::RunArgs {
                shared,
                jobs: run_matches.get_one::<usize>("jobs").copied(),
                total_runners: run_matches.get_one::<usize>("total-runners").copied(),
                runner_index: run_matches.get_one::<usize>("runner-index").copied(),
                html: run_matches.get_one::<PathBuf>("html").cloned(),
                json: run_matches.get_one::<PathBuf>("json").cloned(),
                baseline: run_matches.get_one::<PathBuf>("baseline").cloned(),
            };
            commands::run::execute(args, &language).await
        }
        Some(("init", init_matches)) => {
            let output = init_matches
                .get_one::<PathBuf>("output")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(commands::DEFAULT_USER_CONFIG));
            commands::init::execute(
                &output,
                init_matches.get_flag("non-interactive"),
                init_matches.get_flag("force"),
                &language,
            )
        }
        // `subcommand_required` makes clap print help and exit first.
        _ => Ok(ExitCode::FAILURE),
    }
}
