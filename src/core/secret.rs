//! 应用密钥的惰性生成与缓存（§5/§9 "one reader generates, all losers discard"）。
//!
//! 首个触达的请求在存储中找不到密钥时生成并持久化一份；同一进程内并发到达
//! 的其余请求等待同一个初始化 future 完成，不会各自生成、互相覆写。

use rand::RngCore;
use tokio::sync::OnceCell;

use crate::core::error::Result;
use crate::storage::{Storage, KEY_APP_SECRET};

static APP_SECRET: OnceCell<String> = OnceCell::const_new();

pub async fn get_or_create(storage: &dyn Storage) -> Result<String> {
    APP_SECRET
        .get_or_try_init(|| async { load_or_generate(storage).await })
        .await
        .map(|s| s.clone())
}

async fn load_or_generate(storage: &dyn Storage) -> Result<String> {
    if let Some(existing) = storage.get(KEY_APP_SECRET).await? {
        return Ok(existing);
    }
    let generated = generate();
    storage.put(KEY_APP_SECRET, generated.clone()).await?;
    Ok(generated)
}

fn generate() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    #[tokio::test]
    async fn generates_once_and_persists() {
        let storage = MemoryStorage::new();
        let first = load_or_generate(&storage).await.unwrap();
        let stored = storage.get(KEY_APP_SECRET).await.unwrap();
        assert_eq!(stored.as_deref(), Some(first.as_str()));
    }

    #[tokio::test]
    async fn reuses_existing_secret() {
        let storage = MemoryStorage::new();
        storage.put(KEY_APP_SECRET, "fixed-secret".to_string()).await.unwrap();
        let loaded = load_or_generate(&storage).await.unwrap();
        assert_eq!(loaded, "fixed-secret");
    }
}
