use thiserror::Error;

/// Failures reported by the stream provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The cursor has been invalidated server-side and must be reissued.
    #[error("Shard iterator expired: {0}")]
    ExpiredIterator(String),

    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Read throughput exceeded: {0}")]
    Throttled(String),

    #[error("Provider returned no shard iterator for shard '{shard_id}'")]
    MissingIterator { shard_id: String },

    #[error("Provider request failed: {0}")]
    Transient(String),
}

impl ProviderError {
    pub fn is_expired(&self) -> bool {
        matches!(self, ProviderError::ExpiredIterator(_))
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Failed to encode cache entry: {0}")]
    Codec(#[from] bincode::Error),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Capture request failed: {0}")]
    Transport(String),

    #[error("Capture endpoint rejected event with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),
}
