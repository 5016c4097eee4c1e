//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::ChainParameters;

/// 应用配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub builder: BuilderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 内置表之外的链参数，注册表初始化时追加
    #[serde(default)]
    pub chains: Vec<ChainParameters>,
}

/// 异步构建执行器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// 同时运行的构建任务上限
    pub max_concurrent_builds: usize,
}

/// 交易构建器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// 找零粉尘阈值，低于该值的找零并入手续费
    pub dust_threshold: u64,
    /// 交易版本号
    pub tx_version: u32,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_builds: std::env::var("BUILD_MAX_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
        }
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            dust_threshold: std::env::var("BUILD_DUST_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(546),
            tx_version: std::env::var("BUILD_TX_VERSION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            runner: RunnerConfig::default(),
            builder: BuilderConfig::default(),
            logging: LoggingConfig::default(),
            chains: Vec::new(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if self.runner.max_concurrent_builds == 0 {
            anyhow::bail!("BUILD_MAX_WORKERS must be at least 1");
        }

        if !(1..=2).contains(&self.builder.tx_version) {
            anyhow::bail!("BUILD_TX_VERSION must be 1 or 2");
        }

        // 验证日志级别
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        // 验证日志格式
        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}
