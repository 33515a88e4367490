use crate::error::ConfigError;
use connectors::{capture::http::CaptureSettings, kinesis::settings::KinesisSettings};
use engine_core::context::bridge::PollSettings;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

pub mod env;
pub mod validator;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_DISTINCT_ID: &str = "kinesis-bridge";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_TIME_BUDGET_SECS: u64 = 60;
pub const DEFAULT_CURSOR_TTL_SECS: u64 = 120;
pub const DEFAULT_PAGE_DELAY_MS: u64 = 200;
pub const DEFAULT_MAX_EXPIRED_REISSUES: usize = 3;

/// Where captured events are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub host: String,
    pub api_key: String,
    /// Used when the mapped properties carry no `distinct_id`.
    pub distinct_id: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            api_key: String::new(),
            distinct_id: DEFAULT_DISTINCT_ID.to_string(),
        }
    }
}

/// Bridge configuration as read from a JSON file and the environment.
///
/// Every field has a default so a partial file can be completed through
/// `KINESIS_BRIDGE_*` variables; [`BridgeConfig::validate`] decides whether the
/// result is usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub stream_name: String,
    /// Dotted path to the event name inside each record.
    pub event_key: String,
    /// Comma-separated `source:destination` pairs.
    pub additional_property_mappings: String,

    pub aws_region: String,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_endpoint_url: Option<String>,
    pub page_limit: Option<i32>,

    pub capture: CaptureConfig,
    pub cache_path: Option<PathBuf>,

    pub poll_interval_secs: u64,
    pub time_budget_secs: u64,
    pub cursor_ttl_secs: u64,
    pub page_delay_ms: u64,
    pub max_expired_reissues: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            stream_name: String::new(),
            event_key: String::new(),
            additional_property_mappings: String::new(),
            aws_region: DEFAULT_REGION.to_string(),
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_endpoint_url: None,
            page_limit: None,
            capture: CaptureConfig::default(),
            cache_path: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            time_budget_secs: DEFAULT_TIME_BUDGET_SECS,
            cursor_ttl_secs: DEFAULT_CURSOR_TTL_SECS,
            page_delay_ms: DEFAULT_PAGE_DELAY_MS,
            max_expired_reissues: DEFAULT_MAX_EXPIRED_REISSUES,
        }
    }
}

impl BridgeConfig {
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_json(&content)
    }

    /// Reads the file, applies environment overrides and validates the result.
    pub fn load<P: AsRef<Path>>(
        path: P,
        vars: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            time_budget: Duration::from_secs(self.time_budget_secs),
            cursor_ttl: Duration::from_secs(self.cursor_ttl_secs),
            page_delay: Duration::from_millis(self.page_delay_ms),
            max_expired_reissues: self.max_expired_reissues,
        }
    }

    pub fn kinesis_settings(&self) -> KinesisSettings {
        KinesisSettings {
            region: self.aws_region.clone(),
            access_key_id: self.aws_access_key_id.clone(),
            secret_access_key: self.aws_secret_access_key.clone(),
            endpoint_url: self.aws_endpoint_url.clone(),
            page_limit: self.page_limit,
        }
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            host: self.capture.host.clone(),
            api_key: self.capture.api_key.clone(),
            distinct_id: self.capture.distinct_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_file_gets_defaults() {
        let config = BridgeConfig::from_json(
            r#"{
                "stream_name": "events",
                "event_key": "type",
                "capture": { "host": "http://localhost:8000", "api_key": "phc_test" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.aws_region, DEFAULT_REGION);
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.cursor_ttl_secs, 120);
        assert_eq!(config.capture.distinct_id, DEFAULT_DISTINCT_ID);

        let poll = config.poll_settings();
        assert_eq!(poll.time_budget, Duration::from_secs(60));
        assert_eq!(poll.page_delay, Duration::from_millis(200));
        assert_eq!(poll.max_expired_reissues, 3);
    }

    #[test]
    fn load_applies_env_then_validates() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "stream_name": "events", "additional_property_mappings": "a:b" }}"#
        )
        .unwrap();

        let missing_key = BridgeConfig::load(file.path(), &HashMap::new());
        assert!(matches!(missing_key, Err(ConfigError::Missing("event_key"))));

        let vars = HashMap::from([("KINESIS_BRIDGE_EVENT_KEY".to_string(), "type".to_string())]);
        let config = BridgeConfig::load(file.path(), &vars).unwrap();
        assert_eq!(config.event_key, "type");
        assert_eq!(config.stream_name, "events");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = BridgeConfig::from_file("/nonexistent/bridge.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/bridge.json"));
    }

    #[test]
    fn converts_to_connector_settings() {
        let config = BridgeConfig {
            aws_region: "eu-west-1".into(),
            aws_access_key_id: Some("AKIA".into()),
            aws_secret_access_key: Some("secret".into()),
            aws_endpoint_url: Some("http://localhost:4566".into()),
            ..BridgeConfig::default()
        };

        let kinesis = config.kinesis_settings();
        assert_eq!(kinesis.region, "eu-west-1");
        assert_eq!(kinesis.static_credentials(), Some(("AKIA", "secret")));
        assert_eq!(kinesis.endpoint_url.as_deref(), Some("http://localhost:4566"));
    }
}
