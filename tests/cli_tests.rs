//! # CLI Tests / 命令行测试
//!
//! Drives the `compass` binary the way a user would.
//! 以用户的方式驱动 `compass` 可执行文件。

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn compass() -> Command {
    let mut cmd = Command::cargo_bin("compass").unwrap();
    cmd.args(["--lang", "en"]);
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    compass()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list").and(predicate::str::contains("setup")))
        .stdout(predicate::str::contains("run").and(predicate::str::contains("init")));
}

#[test]
fn test_list_numbers_every_test_case() {
    compass()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("174 test cases:"))
        .stdout(predicate::str::contains("landice/greenland/mesh_gen"))
        .stdout(predicate::str::contains("ocean/global_ocean/QU240/WOA23/split_explicit/performance_test"));
}

#[test]
fn test_verbose_list_shows_steps() {
    compass()
        .args(["list", "-v"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cull_mesh"))
        .stdout(predicate::str::contains("ntasks="));
}

#[test]
fn test_init_writes_user_config_once() {
    let temp = tempdir().unwrap();
    let output = temp.path().join("compass.toml");

    compass()
        .args(["init", "--non-interactive", "-o"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("[parallel]"));
    assert!(text.contains("launcher = \"mpirun -n {ntasks}\""));

    compass()
        .args(["init", "--non-interactive", "-o"])
        .arg(&output)
        .assert()
        .failure()
        .stdout(predicate::str::contains("--force"));

    compass()
        .args(["init", "--non-interactive", "--force", "-o"])
        .arg(&output)
        .assert()
        .success();
}

#[test]
fn test_run_with_unknown_filter_fails() {
    let temp = tempdir().unwrap();
    compass()
        .current_dir(temp.path())
        .args(["run", "ocean/no_such_group", "-w"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("ocean/no_such_group"));
}

#[test]
fn test_run_requires_both_split_options() {
    compass()
        .args(["run", "--total-runners", "2"])
        .assert()
        .failure();
}

#[test]
fn test_setup_lays_out_work_directory() {
    let temp = tempdir().unwrap();
    compass()
        .current_dir(temp.path())
        .args(["setup", "ocean/drying_slope/1km/sigma/default", "-w"])
        .arg(temp.path().join("work"))
        .assert()
        .success();

    let case_dir = temp.path().join("work/drying_slope/1km/sigma/default");
    assert!(case_dir.join("default.cfg").exists());
    assert!(case_dir.join("forward/namelist.forward").exists());
    assert!(case_dir.join("initial_state/streams.init").exists());
}

#[test]
fn test_missing_explicit_config_fails() {
    let temp = tempdir().unwrap();
    compass()
        .current_dir(temp.path())
        .args(["setup", "ocean/drying_slope", "-c", "missing.toml"])
        .assert()
        .failure();
}
