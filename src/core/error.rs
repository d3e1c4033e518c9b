//! 错误处理体系 (Error Handling System)
//!
//! 定义领域相关的错误类型以及全局 Result 别名。错误按 kind 而非按类型分类：
//! 解析器/发射器吞掉逐项错误，聚合驱动吞掉逐订阅错误；只有存储致命错误和
//! 发射器致命错误会被派发层转换为 HTTP 500。

use thiserror::Error;

/// 全局错误定义
#[derive(Error, Debug)]
pub enum SubError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// 单个节点/单份容器解析失败；调用方按 §7 策略吞掉并记录日志
    #[error("parse error: {0}")]
    Parse(String),

    /// 目标格式不支持该节点类型
    #[error("unsupported node type {kind} for target {target}")]
    Unsupported { kind: String, target: String },

    /// 顶层序列化失败 (YAML/JSON marshal) — 对调用方是致命的
    #[error("emitter serialization failed: {0}")]
    EmitterFatal(String),

    /// 两种存储后端均不可用
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("authentication failed: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Custom(String),
}

/// 全局 Result 别名
pub type Result<T> = std::result::Result<T, SubError>;

impl SubError {
    /// 是否应当映射为 HTTP 500 (仅存储致命/发射器致命错误，见 §7)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SubError::EmitterFatal(_) | SubError::StorageUnavailable(_)
        )
    }
}
