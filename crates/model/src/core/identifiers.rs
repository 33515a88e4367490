use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardId(Arc<str>);

impl ShardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(Arc::from(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ShardId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ShardId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single partition of a stream. Only its identity matters to the poller.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardDescriptor {
    pub shard_id: ShardId,
}

impl ShardDescriptor {
    pub fn new(shard_id: impl Into<ShardId>) -> Self {
        Self {
            shard_id: shard_id.into(),
        }
    }
}

/// Snapshot of a stream's shard set, re-fetched on every cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub stream_name: String,
    pub shards: Vec<ShardDescriptor>,
}

impl StreamDescriptor {
    pub fn new(stream_name: impl Into<String>, shards: Vec<ShardDescriptor>) -> Self {
        Self {
            stream_name: stream_name.into(),
            shards,
        }
    }

    pub fn shard_ids(&self) -> impl Iterator<Item = &ShardId> {
        self.shards.iter().map(|s| &s.shard_id)
    }
}
