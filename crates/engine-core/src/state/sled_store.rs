use crate::{
    clock::{Clock, SystemClock},
    error::CacheError,
    state::{KeyValueCache, models::CacheEntry},
};
use async_trait::async_trait;
use std::{path::Path, sync::Arc, time::Duration};
use tracing::debug;

/// On-disk cache backed by sled. Survives process restarts.
pub struct SledCache {
    db: sled::Db,
    clock: Arc<dyn Clock>,
}

impl SledCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        let db = sled::open(path)?;
        Ok(Self { db, clock })
    }

    fn load_entry(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let Some(bytes) = self.db.get(key)? else {
            return Ok(None);
        };
        let entry: CacheEntry = bincode::deserialize(&bytes)?;

        if entry.is_expired(self.clock.now()) {
            debug!(key, "Dropping expired cache entry");
            // Only remove the exact bytes we read; a concurrent `set` wins.
            let _ = self.db.compare_and_swap(key, Some(bytes), None as Option<&[u8]>)?;
            return Ok(None);
        }

        Ok(Some(entry))
    }

    fn store_entry(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        let bytes = bincode::serialize(entry)?;
        self.db.insert(key, bytes)?;
        Ok(())
    }

    pub async fn flush(&self) -> Result<(), CacheError> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueCache for SledCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.load_entry(key)?.map(|e| e.value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.store_entry(key, &CacheEntry::new(value))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        match self.load_entry(key)? {
            Some(entry) => {
                self.store_entry(key, &entry.with_ttl(self.clock.now(), ttl))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Single insert: a value is never on disk without its expiry.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.store_entry(key, &CacheEntry::new(value).with_ttl(self.clock.now(), ttl))
    }
}
