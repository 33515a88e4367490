use engine_core::error::{CacheError, ProviderError};
use model::core::identifiers::ShardId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Record payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Record payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to load cursor '{key}': {source}")]
    Load {
        key: String,
        #[source]
        source: CacheError,
    },

    #[error("Failed to persist cursor '{key}': {source}")]
    Save {
        key: String,
        #[source]
        source: CacheError,
    },

    #[error("Failed to encode resume position '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("Provider error on shard '{shard_id}': {source}")]
    Provider {
        shard_id: ShardId,
        #[source]
        source: ProviderError,
    },

    #[error("Cursor store error: {0}")]
    State(#[from] StateError),

    #[error("Shard '{shard_id}' iterator expired {attempts} times in one cycle")]
    ReissueLimit { shard_id: ShardId, attempts: usize },
}
