use engine_config::error::ConfigError;
use engine_processing::error::{DecodeError, StateError};
use engine_runtime::error::BridgeError;
use model::transform::mapping::MappingError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    ConfigLoad(#[from] ConfigError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Failed to decode payload: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid mapping: {0}")]
    Mapping(#[from] MappingError),

    #[error("Cursor store error: {0}")]
    State(#[from] StateError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),
}
