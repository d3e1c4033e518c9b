//! 存储接口：字符串键、JSON 值的 Key/Value 抽象，带两种实现（§4.8, §9 "Storage back-end"）。
//!
//! 配置的活动后端本身也存放在 KV 中 (`storage_backend_config`)，保证查找路径确定。

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::core::error::Result;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: String) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

pub const KEY_SUBS: &str = "sub_one_subs";
pub const KEY_PROFILES: &str = "sub_one_profiles";
pub const KEY_SETTINGS: &str = "sub_one_settings";
pub const KEY_USERS: &str = "sub_one_users";
pub const KEY_STORAGE_BACKEND: &str = "storage_backend_config";
pub const KEY_APP_SECRET: &str = "app_secret";
pub const KEY_BACKUPS: &str = "sub_one_backups";

pub fn backup_data_key(id: &str) -> String {
    format!("backup_data_{id}")
}
