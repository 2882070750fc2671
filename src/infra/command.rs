//! # Command Execution Module / 命令执行模块
//!
//! Turning configured command lines into processes: expansion and splitting
//! of command strings, the parallel launcher prefix and concurrent capture of
//! a child's stdout and stderr.
//!
//! 将配置的命令行转换为进程：命令字符串的展开与拆分、并行启动器前缀，
//! 以及并发捕获子进程的 stdout 和 stderr。

use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, error, warn};

use crate::core::error::{Error, Result};
use crate::infra::t;

/// Expands `~` and environment variables in a configured command line and
/// splits it into words the way a POSIX shell would.
///
/// `section` and `key` name the option the command came from, for errors.
///
/// 展开配置命令行中的 `~` 和环境变量，并按 POSIX shell 的方式将其拆分为单词。
/// `section` 和 `key` 指明命令来自哪个选项，用于错误报告。
pub fn split_command_line(section: &str, key: &str, command_line: &str) -> Result<Vec<String>> {
    let invalid = || Error::InvalidOption {
        section: section.to_string(),
        key: key.to_string(),
        value: command_line.to_string(),
        expected: "command line",
    };

    let expanded = shellexpand::full(command_line).map_err(|_| invalid())?;
    let words = shlex::split(&expanded).ok_or_else(invalid)?;
    if words.is_empty() {
        return Err(invalid());
    }
    Ok(words)
}

/// Builds the launcher prefix for a parallel run, e.g. `mpirun -n 4`.
/// An empty launcher means the model is started directly.
///
/// 为并行运行构建启动器前缀，例如 `mpirun -n 4`。启动器为空表示直接启动模型。
pub fn launcher_prefix(launcher: &str, ntasks: u32, openmp_threads: u32) -> Result<Vec<String>> {
    if launcher.trim().is_empty() {
        return Ok(Vec::new());
    }
    let filled = launcher
        .replace("{ntasks}", &ntasks.to_string())
        .replace("{openmp_threads}", &openmp_threads.to_string());
    split_command_line("parallel", "launcher", &filled)
}

/// Creates a `tokio` command for `argv` running in `dir` with extra environment.
/// The child is killed if the future driving it is dropped.
///
/// 为 `argv` 创建一个在 `dir` 中运行并带有额外环境变量的 `tokio` 命令。
/// 如果驱动它的 future 被丢弃，子进程将被终止。
pub fn build_command(argv: &[String], dir: &Path, envs: &[(String, String)]) -> Result<tokio::process::Command> {
    let (program, args) = argv.split_first().ok_or_else(|| Error::InvalidOption {
        section: "executables".to_string(),
        key: "<empty>".to_string(),
        value: String::new(),
        expected: "command line",
    })?;
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .current_dir(dir)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .kill_on_drop(true);
    debug!(command = %argv.join(" "), dir = %dir.display(), "prepared command");
    Ok(cmd)
}

/// Spawns a command, captures its stdout and stderr.
/// The output streams are read concurrently and combined into a single string.
///
/// # Arguments
/// * `cmd` - The `tokio::process::Command` to execute.
///
/// # Returns
/// A tuple containing:
/// - The `ExitStatus` of the process wrapped in an `io::Result`.
/// - The combined stdout and stderr as a `String`.
///
/// 派生一个命令，捕获其 stdout 和 stderr。
/// 输出流被并发读取并合并到一个字符串中。
pub async fn spawn_and_capture(
    mut cmd: tokio::process::Command,
) -> (std::io::Result<std::process::ExitStatus>, String) {
    // Configure the command to capture stdout and stderr.
    // 配置命令以捕获 stdout 和 stderr。
    let mut child = match cmd
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return (Err(e), String::new()),
    };

    let Some(stdout) = child.stdout.take() else {
        return (
            Err(std::io::Error::other(t!("command.capture_stdout_failed").to_string())),
            String::new(),
        );
    };
    let Some(stderr) = child.stderr.take() else {
        return (
            Err(std::io::Error::other(t!("command.capture_stderr_failed").to_string())),
            String::new(),
        );
    };

    // Both readers append to the same buffer so lines keep their interleaving.
    // 两个读取任务写入同一个缓冲区，以保持行的交错顺序。
    let output = Arc::new(tokio::sync::Mutex::new(String::new()));
    let stdout_handle = tokio::spawn(drain_lines(stdout, Arc::clone(&output)));
    let stderr_handle = tokio::spawn(drain_lines(stderr, Arc::clone(&output)));

    let status = child.wait().await;

    // Wait for the readers so no trailing output is lost.
    // 等待读取任务完成，以免丢失末尾的输出。
    if let Err(e) = stdout_handle.await {
        error!("failed to join stdout task: {e}");
    }
    if let Err(e) = stderr_handle.await {
        error!("failed to join stderr task: {e}");
    }

    let captured = output.lock().await.clone();
    (status, captured)
}

/// Reads `stream` to the end, appending each line to `output`.
///
/// Lines are read as bytes and decoded lossily, so a child printing invalid
/// UTF-8 keeps its pipe drained and is not killed by `SIGPIPE`.
///
/// 将 `stream` 读到末尾，并把每一行追加到 `output`。
/// 按字节读取并有损解码，因此输出非法 UTF-8 的子进程的管道仍会被读空，不会被 `SIGPIPE` 终止。
async fn drain_lines<R>(stream: R, output: Arc<tokio::sync::Mutex<String>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let mut output = output.lock().await;
                output.push_str(&String::from_utf8_lossy(&line));
                if !line.ends_with(b"\n") {
                    output.push('\n');
                }
            }
            Err(e) => {
                warn!(error = %e, "stopped reading child output");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launcher_prefix_fills_placeholders() {
        let prefix = launcher_prefix("srun -n {ntasks} -c {openmp_threads}", 8, 2).unwrap();
        assert_eq!(prefix, vec!["srun", "-n", "8", "-c", "2"]);
    }

    #[test]
    fn test_empty_launcher_has_no_prefix() {
        assert!(launcher_prefix("  ", 4, 1).unwrap().is_empty());
    }

    #[test]
    fn test_split_command_line_keeps_quoted_words() {
        let words = split_command_line("executables", "model", "model --flag 'a b'").unwrap();
        assert_eq!(words, vec!["model", "--flag", "a b"]);
    }

    #[test]
    fn test_split_command_line_rejects_unbalanced_quotes() {
        assert!(split_command_line("executables", "model", "model 'oops").is_err());
    }
}
