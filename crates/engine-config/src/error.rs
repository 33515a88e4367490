use model::transform::mapping::MappingError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating the bridge configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value '{value}' for environment variable {key}: {reason}")]
    InvalidEnv {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("cursor_ttl_secs ({ttl_secs}) must exceed poll_interval_secs ({interval_secs})")]
    TtlTooShort { ttl_secs: u64, interval_secs: u64 },

    #[error("Invalid property mappings: {0}")]
    Mapping(#[from] MappingError),
}
