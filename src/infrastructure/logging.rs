//! 日志系统配置模块
//! 支持结构化日志（JSON）与文本日志，级别可由 RUST_LOG 覆盖

use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    EnvFilter, Registry,
};

use crate::config::LoggingConfig;

/// 日志级别过滤器：`RUST_LOG` 优先，否则使用配置
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// 按格式构建 subscriber，不安装
///
/// `format` 为 `"json"` 时输出结构化日志，其余按文本输出。
pub fn build_subscriber(filter: EnvFilter, format: &str) -> Box<dyn Subscriber + Send + Sync> {
    let registry = Registry::default().with(filter);
    if format == "json" {
        Box::new(
            registry.with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            ),
        )
    } else {
        Box::new(
            registry.with(
                fmt::layer()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            ),
        )
    }
}

/// 初始化日志系统
///
/// 重复初始化返回错误而不是 panic。
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = build_subscriber(env_filter(config), &config.format);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
