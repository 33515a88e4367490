use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Value stored by the cache backends, with an optional absolute expiry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: String,
    /// Unix epoch milliseconds.
    pub expires_at_ms: Option<i64>,
}

impl CacheEntry {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at_ms: None,
        }
    }

    pub fn with_ttl(mut self, now: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.expires_at_ms = Some(now.timestamp_millis().saturating_add(ttl_ms));
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_ms
            .is_some_and(|at| now.timestamp_millis() >= at)
    }
}
