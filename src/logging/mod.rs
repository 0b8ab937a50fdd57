//! 日志初始化.
//!
//! 库 crate 通过 `log` 门面输出, 这里用 `tracing-subscriber` 统一接收:
//! - console: 彩色, 级别由 `console_level` 决定
//! - file: 无色, 按天滚动, 保留 `retention_days` 个文件
//!
//! 日志文件为 `{directory}/{file_prefix}.{date}.log`.

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 文件日志级别 (EnvFilter 语法)
    pub level: String,
    pub directory: String,
    pub file_prefix: String,
    /// 控制台日志级别
    #[serde(default = "default_console_level")]
    pub console_level: String,
    /// 保留的日志文件数 (按天)
    #[serde(default = "default_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_true")]
    pub ansi: bool,
}

fn default_true() -> bool {
    true
}

fn default_console_level() -> String {
    "info".to_string()
}

fn default_retention_days() -> usize {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: "logs".to_string(),
            file_prefix: "kuai".to_string(),
            console_level: default_console_level(),
            retention_days: default_retention_days(),
            ansi: true,
        }
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 初始化全局日志
///
/// 重复初始化返回错误.
pub fn init(config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("创建日志目录失败, path={}", config.directory))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .max_log_files(config.retention_days.max(1))
        .build(&config.directory)
        .with_context(|| format!("创建日志文件失败, directory={}", config.directory))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).ok();

    let console_filter = EnvFilter::try_new(&config.console_level)
        .with_context(|| format!("无效的控制台日志级别: {}", config.console_level))?;
    let file_filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("无效的文件日志级别: {}", config.level))?;

    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .event_format(ConsoleFormatter { ansi: config.ansi })
        .with_filter(console_filter);

    let file_layer = fmt::Layer::default()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("日志系统已初始化")?;

    Ok(())
}

/// 指定日期的日志文件路径
pub fn log_file_path(directory: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    directory.join(format!("{}.{}.log", prefix, date.format("%Y-%m-%d")))
}

fn write_time(writer: &mut Writer<'_>) -> std::fmt::Result {
    let now = Local::now();
    write!(
        writer,
        "[{:02}-{:02} {:02}:{:02}:{:02}.{:03}] ",
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.timestamp_subsec_millis()
    )
}

/// Console 格式: 带时间戳、级别颜色和线程名
struct ConsoleFormatter {
    ansi: bool,
}

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        write_time(&mut writer)?;
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("-");
        if self.ansi {
            let color = match *meta.level() {
                tracing::Level::ERROR => "\x1b[31m",
                tracing::Level::WARN => "\x1b[33m",
                tracing::Level::INFO => "\x1b[32m",
                _ => "\x1b[34m",
            };
            write!(writer, "{}{:5}\x1b[0m [{}] > ", color, meta.level(), thread_name)?;
        } else {
            write!(writer, "{:5} [{}] > ", meta.level(), thread_name)?;
        }
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// File 格式: 无色, 带目标模块
struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        write_time(&mut writer)?;
        let meta = event.metadata();
        write!(writer, "{:5} {} > ", meta.level(), meta.target())?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_日志文件路径() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 6);
        match date {
            Some(date) => {
                let path = log_file_path(Path::new("logs"), "kuai-probe", date);
                assert_eq!(path, PathBuf::from("logs/kuai-probe.2026-02-06.log"));
            }
            None => panic!("测试日期初始化失败"),
        }
    }

    #[test]
    fn test_配置默认值() {
        let cfg: LoggingConfig = serde_json::from_str(
            r#"{"level": "debug", "directory": "/tmp/kuai", "file_prefix": "node"}"#,
        )
        .unwrap();
        assert_eq!(cfg.console_level, "info");
        assert_eq!(cfg.retention_days, 30);
        assert!(cfg.ansi);
        assert_eq!(LoggingConfig::default().file_prefix, "kuai");
    }
}
