//! 进程内 K/V 存储；开发环境与测试的默认后端。

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::core::error::Result;

use super::Storage;

#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .data
            .read()
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
    async fn put_then_get_roundtrips() {
        let storage = MemoryStorage::new();
        storage.put("k", "v".to_string()).await.unwrap();
        assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let storage = MemoryStorage::new();
        storage.put("k", "v".to_string()).await.unwrap();
        storage.delete("k").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let storage = MemoryStorage::new();
        storage.put("sub_one_subs", "[]".to_string()).await.unwrap();
        storage.put("other", "[]".to_string()).await.unwrap();
        let keys = storage.list("sub_one").await.unwrap();
        assert_eq!(keys, vec!["sub_one_subs".to_string()]);
    }
}
