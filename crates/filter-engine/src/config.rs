//! 配置管理模块
//!
//! 配置文件与环境变量分层加载，所有字段都有默认值。

use crate::engine::DEFAULT_MAX_DEPTH;
use crate::observability::ObservabilityConfig;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

/// 引擎配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 过滤器树的最大嵌套深度，超过时编译失败
    pub max_depth: usize,
    pub observability: ObservabilityConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            observability: ObservabilityConfig::default(),
        }
    }
}

impl EngineConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. {CONFIG_DIR}/filter-engine.toml，目录默认为 config，文件可以不存在
    /// 2. 环境变量（FILTER_ENGINE_ 前缀，`__` 分隔层级，如
    ///    FILTER_ENGINE_OBSERVABILITY__LOG_LEVEL -> observability.log_level）
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Config::builder()
            .add_source(
                File::from(Path::new(&config_dir).join("filter-engine.toml")).required(false),
            )
            .add_source(
                Environment::with_prefix("FILTER_ENGINE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// 解析内存中的 TOML 文本，缺省字段取默认值
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
