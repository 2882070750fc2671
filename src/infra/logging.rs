//! Diagnostic logging setup. User-facing progress goes through `println!`;
//! this is for the `tracing` events emitted by the library.
//!
//! 诊断日志初始化。面向用户的进度输出使用 `println!`；这里处理库发出的 `tracing` 事件。

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a `fmt` subscriber writing to stderr. `RUST_LOG` wins over
/// `verbose`. Calling it twice is harmless.
///
/// 安装一个写入 stderr 的 `fmt` 订阅器。`RUST_LOG` 优先于 `verbose`。重复调用无害。
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("warn,compass_runner=debug")
        } else {
            EnvFilter::new("warn,compass_runner=info")
        }
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
