use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    /// A required connection property was not provided.
    #[error("Missing property: {0}")]
    MissingProperty(String),

    /// The capture endpoint URL could not be parsed.
    #[error("Invalid capture endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// Failed to build the HTTP client.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}
