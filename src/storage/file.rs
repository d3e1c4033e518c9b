//! 单文件 JSON 映射存储；tabular 适配器的具体实现（§9 "K/V and tabular"）。
//!
//! 整个键空间序列化为一个 JSON 对象，每次写操作整体重写磁盘文件，足以满足
//! 单进程部署下"重读-修改-写回"的最终一致性要求（§5 共享资源策略）。

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;

use crate::core::error::Result;

use super::Storage;

pub struct FileStorage {
    path: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl FileStorage {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = if fs::try_exists(&path).await.unwrap_or(false) {
            let raw = fs::read_to_string(&path).await?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };
        Ok(Self { path, cache: RwLock::new(cache) })
    }

    /// Writes the given snapshot to disk. Caller must hold `cache`'s write lock
    /// across the mutate-then-persist sequence so concurrent put/delete calls
    /// serialize instead of racing two independent disk writes out of order.
    async fn persist(&self, snapshot: &HashMap<String, String>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(snapshot)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, serialized).await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let mut guard = self.cache.write().await;
        guard.insert(key.to_string(), value);
        self.persist(&guard).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut guard = self.cache.write().await;
        guard.remove(key);
        self.persist(&guard).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .cache
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrips_through_disk() {
        let dir = std::env::temp_dir().join(format!("submux-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("store.json");
        let storage = FileStorage::open(&path).await.unwrap();
        storage.put("k", "v".to_string()).await.unwrap();

        let reopened = FileStorage::open(&path).await.unwrap();
        assert_eq!(reopened.get("k").await.unwrap().as_deref(), Some("v"));
        let _ = fs::remove_dir_all(&dir).await;
    }
}
