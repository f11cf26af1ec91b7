//! 上下文配置
//!
//! 从 TOML 或 JSON 加载上下文标识、容器行为、日志和初始属性。

use di_abstractions::ContainerConfig;
use infrastructure_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// 应用上下文配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// 上下文标识，未配置时随机生成
    pub id: Option<String>,
    /// 应用名称
    pub application_name: String,
    /// 显示名称，未配置时由标识生成
    pub display_name: Option<String>,
    /// 容器行为
    pub container: ContainerConfig,
    /// 日志
    pub logging: LoggingSettings,
    /// 环境的初始属性
    pub properties: HashMap<String, String>,
    /// 激活的 profile
    pub active_profiles: Vec<String>,
}

/// 日志设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// 是否在构建上下文时初始化日志
    pub enabled: bool,
    /// 日志级别: trace / debug / info / warn / error
    pub level: String,
    /// `EnvFilter` 指令，设置后优先于 `level`
    pub filter: Option<String>,
    /// 是否输出 JSON
    pub json_format: bool,
    pub show_target: bool,
    pub show_thread_ids: bool,
    pub show_file: bool,
    pub show_line_number: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
            filter: None,
            json_format: false,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
        }
    }
}

impl ContextConfig {
    /// 解析 TOML 文本
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            source: Box::new(e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 解析 JSON 文本
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
            source: Box::new(e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 按扩展名加载配置文件
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        debug!("加载上下文配置文件: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.container.max_resolution_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "container.max_resolution_depth 必须大于 0".to_string(),
            });
        }
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: "id 不能为空字符串".to_string(),
                });
            }
        }
        self.logging.level()?;
        Ok(())
    }
}

impl LoggingSettings {
    /// 解析日志级别
    pub fn level(&self) -> ConfigResult<tracing::Level> {
        self.level
            .parse::<tracing::Level>()
            .map_err(|_| ConfigError::ValidationError {
                message: format!("无效的日志级别: {}", self.level),
            })
    }
}
