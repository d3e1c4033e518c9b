//! 配置管理系统 (Configuration Management)
//!
//! 负责 `config.toml` 的反序列化及其层级结构映射，支持环境变量 (`SUBMUX_` 前缀)
//! 与默认值回退机制。`Config`（§3 持久化记录）与进程级设置（监听地址、存储后端
//! 选择、外部转换器回调）分层存放在同一份 `AppConfig` 中。

use std::path::Path;

use bon::Builder;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SubError};

/// 全局应用配置
#[derive(Debug, Deserialize, Builder, Clone)]
pub struct AppConfig {
    /// HTTP 监听地址
    #[serde(default = "default_bind")]
    pub bind: String,

    /// 持久化的行为选项 (§3 Config 记录)
    #[serde(default)]
    pub settings: SubSettings,

    /// 存储后端选择
    #[serde(default)]
    pub storage: StorageConfig,

    /// 外部转换器回调 (§4.7 step 6)
    #[serde(default)]
    pub external_converter: ExternalConverterConfig,
}

/// §3 `Config` 持久化记录：订阅分发相关的行为开关
#[derive(Debug, Deserialize, Serialize, Builder, Clone)]
pub struct SubSettings {
    /// 全局订阅令牌
    #[serde(default = "default_token")]
    pub mytoken: String,
    /// Profile 专属令牌
    #[serde(default = "default_token")]
    pub profile_token: String,
    /// 响应下载文件名默认值
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default)]
    pub prepend_sub_name: bool,
    #[serde(default)]
    pub dedupe: bool,
    #[serde(default = "default_notify_days")]
    pub notify_threshold_days: u32,
    #[serde(default = "default_notify_percent")]
    pub notify_threshold_percent: u32,
}

impl Default for SubSettings {
    fn default() -> Self {
        Self {
            mytoken: default_token(),
            profile_token: default_token(),
            file_name: default_file_name(),
            prepend_sub_name: false,
            dedupe: false,
            notify_threshold_days: default_notify_days(),
            notify_threshold_percent: default_notify_percent(),
        }
    }
}

/// 存储后端选择，镜像 `storage_backend_config` KV 项
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Kv,
    D1,
}

/// 外部转换器委托配置 (§4.7 step 6)
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ExternalConverterConfig {
    #[serde(default)]
    pub enabled: bool,
    pub url: Option<String>,
}

fn default_bind() -> String {
    "0.0.0.0:25500".to_string()
}
fn default_token() -> String {
    "auto".to_string()
}
fn default_file_name() -> String {
    "sub".to_string()
}
fn default_notify_days() -> u32 {
    7
}
fn default_notify_percent() -> u32 {
    90
}

impl AppConfig {
    /// 从文件系统与环境变量中加载并解析配置
    pub fn load() -> Result<Self> {
        let config_path = Path::new("config.toml");
        let builder = Config::builder();

        let builder = if config_path.exists() {
            builder.add_source(File::from(config_path))
        } else {
            builder
        };

        let builder = builder.add_source(
            Environment::with_prefix("SUBMUX")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build().map_err(SubError::Config)?;
        settings.try_deserialize().map_err(SubError::Config)
    }
}
