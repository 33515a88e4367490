use crate::error::StateError;
use engine_core::state::KeyValueCache;
use model::{
    core::identifiers::ShardId,
    pagination::cursor::{IteratorPosition, ShardCursor},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Namespace for cursor keys inside a shared cache.
pub const CURSOR_KEY_PREFIX: &str = "_kinesis_shard_";

const RESUME_KEY_SUFFIX: &str = "_resume";

/// Persists one cursor per (stream, shard) pair.
///
/// Next to each cursor lives a resume position: where a replacement cursor
/// must start if the stored one has been invalidated by the provider. It is
/// `AfterSequenceNumber` of the last record read, or `AtTimestamp` of when
/// the shard was first positioned at `Latest` if nothing has been read yet.
/// Both share one TTL.
#[derive(Clone)]
pub struct CursorStore {
    cache: Arc<dyn KeyValueCache>,
    ttl: Duration,
}

impl CursorStore {
    pub fn new(cache: Arc<dyn KeyValueCache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub fn cursor_key(stream_name: &str, shard_id: &ShardId) -> String {
        format!("{CURSOR_KEY_PREFIX}{stream_name}_{shard_id}")
    }

    pub fn resume_key(key: &str) -> String {
        format!("{key}{RESUME_KEY_SUFFIX}")
    }

    /// Returns the persisted cursor, or `None` when never set or expired.
    pub async fn load(&self, key: &str) -> Result<Option<ShardCursor>, StateError> {
        let value = self
            .cache
            .get_or(key, None)
            .await
            .map_err(|source| StateError::Load {
                key: key.to_string(),
                source,
            })?;

        Ok(value.filter(|v| !v.is_empty()).map(ShardCursor::from))
    }

    /// Stores the cursor and (re)starts the time-to-live of both the cursor
    /// and its resume position.
    pub async fn save(&self, key: &str, cursor: &ShardCursor) -> Result<(), StateError> {
        self.cache
            .set_with_expiry(key, cursor.as_str(), self.ttl)
            .await
            .map_err(|source| StateError::Save {
                key: key.to_string(),
                source,
            })?;

        let resume_key = Self::resume_key(key);
        self.cache
            .expire(&resume_key, self.ttl)
            .await
            .map_err(|source| StateError::Save {
                key: resume_key,
                source,
            })?;

        debug!(key, ?cursor, ttl_secs = self.ttl.as_secs(), "Persisted cursor");
        Ok(())
    }

    /// Returns the stored resume position. An unreadable value is reported and
    /// treated as absent.
    pub async fn load_resume(&self, key: &str) -> Result<Option<IteratorPosition>, StateError> {
        let resume_key = Self::resume_key(key);
        let value = self
            .cache
            .get(&resume_key)
            .await
            .map_err(|source| StateError::Load {
                key: resume_key.clone(),
                source,
            })?;

        let Some(value) = value else {
            return Ok(None);
        };
        match serde_json::from_str(&value) {
            Ok(position) => Ok(Some(position)),
            Err(err) => {
                warn!(key = %resume_key, error = %err, "Ignoring unreadable resume position");
                Ok(None)
            }
        }
    }

    pub async fn save_resume(&self, key: &str, position: &IteratorPosition) -> Result<(), StateError> {
        let resume_key = Self::resume_key(key);
        let value = serde_json::to_string(position).map_err(|source| StateError::Encode {
            key: resume_key.clone(),
            source,
        })?;

        self.cache
            .set_with_expiry(&resume_key, &value, self.ttl)
            .await
            .map_err(|source| StateError::Save {
                key: resume_key,
                source,
            })?;

        debug!(key, %position, "Persisted resume position");
        Ok(())
    }

    /// Drops the cursor and its resume position so the next cycle starts fresh.
    pub async fn clear(&self, key: &str) -> Result<(), StateError> {
        for key in [key.to_string(), Self::resume_key(key)] {
            self.cache
                .expire(&key, Duration::ZERO)
                .await
                .map_err(|source| StateError::Save { key, source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{
        clock::ManualClock,
        state::{KeyValueCache as _, memory::MemoryCache},
    };

    #[test]
    fn keys_are_namespaced_per_stream_and_shard() {
        let a = CursorStore::cursor_key("events", &ShardId::from("shardId-000000000000"));
        let b = CursorStore::cursor_key("events", &ShardId::from("shardId-000000000001"));
        let c = CursorStore::cursor_key("other", &ShardId::from("shardId-000000000000"));

        assert_eq!(a, "_kinesis_shard_events_shardId-000000000000");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn save_then_load_returns_latest_cursor() {
        let store = CursorStore::new(Arc::new(MemoryCache::new()), Duration::from_secs(120));
        let key = CursorStore::cursor_key("s", &ShardId::from("shard-0"));

        assert_eq!(store.load(&key).await.unwrap(), None);

        store.save(&key, &ShardCursor::from("it-1")).await.unwrap();
        store.save(&key, &ShardCursor::from("it-2")).await.unwrap();
        assert_eq!(store.load(&key).await.unwrap(), Some(ShardCursor::from("it-2")));
    }

    #[tokio::test]
    async fn cursor_expires_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
        let store = CursorStore::new(cache, Duration::from_secs(120));
        let key = CursorStore::cursor_key("s", &ShardId::from("shard-0"));

        store.save(&key, &ShardCursor::from("it-1")).await.unwrap();
        clock.advance(Duration::from_secs(90));
        store.save(&key, &ShardCursor::from("it-2")).await.unwrap();

        clock.advance(Duration::from_secs(90));
        assert_eq!(store.load(&key).await.unwrap(), Some(ShardCursor::from("it-2")));

        clock.advance(Duration::from_secs(30));
        assert_eq!(store.load(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn saving_a_cursor_keeps_the_resume_position_alive() {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
        let store = CursorStore::new(cache, Duration::from_secs(120));
        let key = CursorStore::cursor_key("s", &ShardId::from("shard-0"));
        let resume = IteratorPosition::after("00000000000000000007");

        store.save_resume(&key, &resume).await.unwrap();
        store.save(&key, &ShardCursor::from("it-1")).await.unwrap();

        // Idle pages only refresh the cursor; the resume position must not
        // expire ahead of it.
        for _ in 0..3 {
            clock.advance(Duration::from_secs(100));
            store.save(&key, &ShardCursor::from("it-2")).await.unwrap();
        }
        assert_eq!(store.load_resume(&key).await.unwrap(), Some(resume));

        store.clear(&key).await.unwrap();
        assert_eq!(store.load(&key).await.unwrap(), None);
        assert_eq!(store.load_resume(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreadable_resume_position_is_ignored() {
        let cache = Arc::new(MemoryCache::new());
        let store = CursorStore::new(cache.clone(), Duration::from_secs(120));
        let key = CursorStore::cursor_key("s", &ShardId::from("shard-0"));

        cache
            .set(&CursorStore::resume_key(&key), "not a position")
            .await
            .unwrap();
        assert_eq!(store.load_resume(&key).await.unwrap(), None);
    }
}
