// Shared test helpers for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use compass_runner::core::config::ConfigLayer;
use compass_runner::core::execution::RunOptions;
use tempfile::{TempDir, tempdir};

/// A scratch area with a `bin/` directory for stand-in executables and a
/// `work/` directory for test cases.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempdir().expect("Failed to create temporary directory");
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        fs::create_dir_all(dir.path().join("work")).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn work_dir(&self) -> PathBuf {
        self.path().join("work")
    }

    /// Writes an executable shell script to `bin/<name>` and returns its path.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path().join("bin").join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        path
    }

    /// A user layer pointing every executable at a stand-in script:
    /// tools touch their first argument, the model writes `output.nc`, and
    /// the compare tool compares the two files byte for byte.
    pub fn user_layer(&self) -> ConfigLayer {
        let touch = self.script("touch-first", r#"touch "$1""#);
        let model = self.script("model", r#"echo "model run with $2" > output.nc"#);
        let graph = self.script("graph-file", r#"touch "$2""#);
        let partition = self.script("partition", "exit 0");
        let compare = self.script("compare", r#"cmp -s "$3" "$4""#);

        ConfigLayer::new("user")
            .with_option("parallel", "launcher", "")
            .with_option("parallel", "cores", 8)
            .with_option("executables", "model", model.display())
            .with_option("executables", "base_mesh", touch.display())
            .with_option("executables", "cull_mesh", touch.display())
            .with_option("executables", "graph_file", graph.display())
            .with_option("executables", "partition", partition.display())
            .with_option("executables", "compare_variables", compare.display())
            .with_option("paths", "database_root", self.path().join("db").display())
            .with_option("download", "enabled", false)
    }

    pub fn options(&self, extra: Vec<ConfigLayer>) -> RunOptions {
        let mut user_layers = vec![self.user_layer()];
        user_layers.extend(extra);
        RunOptions {
            work_dir: self.work_dir(),
            user_layers,
            baseline_dir: None,
        }
    }
}
