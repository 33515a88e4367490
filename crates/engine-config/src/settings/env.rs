use super::BridgeConfig;
use crate::error::ConfigError;
use std::{collections::HashMap, path::PathBuf, str::FromStr};
use tracing::{debug, warn};

pub const ENV_PREFIX: &str = "KINESIS_BRIDGE_";

impl BridgeConfig {
    /// Overrides fields from `KINESIS_BRIDGE_*` variables, e.g.
    /// `KINESIS_BRIDGE_STREAM_NAME` or `KINESIS_BRIDGE_CAPTURE_API_KEY`.
    pub fn apply_env(&mut self, vars: &HashMap<String, String>) -> Result<(), ConfigError> {
        // Sorted so that repeated loads apply overrides in the same order.
        let mut overrides: Vec<_> = vars
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .map(|field| (key.as_str(), field, value.as_str()))
            })
            .collect();
        overrides.sort_unstable();

        for (key, field, value) in overrides {
            self.apply_var(key, field, value)?;
        }
        Ok(())
    }

    fn apply_var(&mut self, key: &str, field: &str, value: &str) -> Result<(), ConfigError> {
        match field {
            "STREAM_NAME" => self.stream_name = value.to_string(),
            "EVENT_KEY" => self.event_key = value.to_string(),
            "ADDITIONAL_PROPERTY_MAPPINGS" => {
                self.additional_property_mappings = value.to_string()
            }
            "AWS_REGION" => self.aws_region = value.to_string(),
            "AWS_ACCESS_KEY_ID" => self.aws_access_key_id = non_empty(value),
            "AWS_SECRET_ACCESS_KEY" => self.aws_secret_access_key = non_empty(value),
            "AWS_ENDPOINT_URL" => self.aws_endpoint_url = non_empty(value),
            "PAGE_LIMIT" => self.page_limit = Some(parse(key, value)?),
            "CAPTURE_HOST" => self.capture.host = value.to_string(),
            "CAPTURE_API_KEY" => self.capture.api_key = value.to_string(),
            "CAPTURE_DISTINCT_ID" => self.capture.distinct_id = value.to_string(),
            "CACHE_PATH" => self.cache_path = non_empty(value).map(PathBuf::from),
            "POLL_INTERVAL_SECS" => self.poll_interval_secs = parse(key, value)?,
            "TIME_BUDGET_SECS" => self.time_budget_secs = parse(key, value)?,
            "CURSOR_TTL_SECS" => self.cursor_ttl_secs = parse(key, value)?,
            "PAGE_DELAY_MS" => self.page_delay_ms = parse(key, value)?,
            "MAX_EXPIRED_REISSUES" => self.max_expired_reissues = parse(key, value)?,
            _ => {
                warn!(key, "Ignoring unknown environment override");
                return Ok(());
            }
        }

        debug!(key, "Applied environment override");
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}
