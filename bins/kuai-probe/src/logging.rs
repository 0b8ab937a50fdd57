//! 日志初始化.
//!
//! - console: stderr, 默认 warn, 避免与探测结果混在一起
//! - file: 默认 info, 可通过 -v/-vv 或 KUAI_LOG 环境变量调整
//!
//! 日志文件输出到 $cwd/logs/{prefix}.{date}.log

use anyhow::Result;
use kuai::logging::{self, LoggingConfig};

/// 按 -v 次数选择文件日志级别: 0=info, 1=debug, 2+=trace
fn file_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// 按 -v 次数选择控制台日志级别
fn console_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// 初始化日志系统
pub fn init(file_prefix: &str, verbosity: u8) -> Result<()> {
    let level = std::env::var("KUAI_LOG").unwrap_or_else(|_| file_level(verbosity).to_string());
    logging::init(&LoggingConfig {
        level,
        file_prefix: file_prefix.to_string(),
        console_level: console_level(verbosity).to_string(),
        ..LoggingConfig::default()
    })
}
