use crate::error::CacheError;
use async_trait::async_trait;
use std::time::Duration;

pub mod memory;
pub mod models;
pub mod sled_store;

/// Minimal key/value cache used to persist shard cursors.
///
/// Expired keys behave exactly like keys that were never set.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key`, clearing any previous expiry.
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Sets a time-to-live on an existing key. Returns `false` when the key
    /// does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    async fn get_or(&self, key: &str, default: Option<String>) -> Result<Option<String>, CacheError> {
        Ok(self.get(key).await?.or(default))
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.set(key, value).await?;
        self.expire(key, ttl).await?;
        Ok(())
    }
}
