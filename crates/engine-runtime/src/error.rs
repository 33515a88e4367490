use connectors::error::ConnectorError;
use engine_config::error::ConfigError;
use engine_core::error::{CacheError, ProviderError};
use model::transform::mapping::MappingError;
use thiserror::Error;

/// Top-level errors for the bridge runtime.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Initialization error.
    #[error("Initialization error: {0}")]
    InitializationError(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Listing the stream's shards failed; no shard was polled this cycle.
    #[error("Failed to describe stream '{stream}': {source}")]
    Describe {
        stream: String,
        #[source]
        source: ProviderError,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// An error occurred while joining a task.
    /// This usually indicates that the task was cancelled or panicked.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
