use serde::{Deserialize, Serialize};

/// Connection settings for the Kinesis provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KinesisSettings {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Endpoint override, e.g. a localstack URL.
    pub endpoint_url: Option<String>,
    /// Maximum records returned per page. Provider default when unset.
    pub page_limit: Option<i32>,
}

impl KinesisSettings {
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }
}
