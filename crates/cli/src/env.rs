use std::collections::HashMap;
use std::fs;
use std::path::Path;

use engine_config::settings::env::ENV_PREFIX;

use crate::error::CliError;

const REDACTED: &str = "****";

/// Process environment plus variables loaded from `.env` files. Later files
/// override earlier values.
#[derive(Debug, Clone)]
pub struct EnvManager {
    vars: HashMap<String, String>,
    sensitive_patterns: Vec<&'static str>,
}

impl EnvManager {
    pub fn new() -> Self {
        Self::from_vars(std::env::vars().collect())
    }

    fn from_vars(vars: HashMap<String, String>) -> Self {
        Self {
            vars,
            sensitive_patterns: vec!["secret", "api_key", "token", "password", "credential"],
        }
    }

    /// Load variables from a .env file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)
    }

    pub fn all(&self) -> &HashMap<String, String> {
        &self.vars
    }

    /// Bridge overrides currently set, sorted by name, with secrets masked.
    pub fn overrides(&self) -> Vec<(String, String)> {
        let mut overrides: Vec<_> = self
            .vars
            .iter()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .map(|(key, value)| {
                let shown = if self.is_sensitive(key) {
                    REDACTED.to_string()
                } else {
                    value.clone()
                };
                (key.clone(), shown)
            })
            .collect();
        overrides.sort();
        overrides
    }

    fn is_sensitive(&self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        self.sensitive_patterns.iter().any(|p| key.contains(p))
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid env file: malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Config(format!(
                    "Invalid env file: empty key at line {}",
                    line_num + 1
                )));
            }

            self.vars.insert(key.to_string(), Self::unquote_value(value));
        }

        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();
        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return value[1..value.len() - 1].to_string();
            }
        }
        value.to_string()
    }
}

impl Default for EnvManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> EnvManager {
        EnvManager::from_vars(HashMap::new())
    }

    #[test]
    fn parses_bridge_overrides() {
        let mut env = empty();
        let content = r#"
# Local stream
KINESIS_BRIDGE_STREAM_NAME=clicks
export KINESIS_BRIDGE_EVENT_KEY="payload.type"
KINESIS_BRIDGE_ADDITIONAL_PROPERTY_MAPPINGS='user.id:distinct_id, url:url'
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.all()["KINESIS_BRIDGE_STREAM_NAME"], "clicks");
        assert_eq!(env.all()["KINESIS_BRIDGE_EVENT_KEY"], "payload.type");
        assert_eq!(
            env.all()["KINESIS_BRIDGE_ADDITIONAL_PROPERTY_MAPPINGS"],
            "user.id:distinct_id, url:url"
        );
    }

    #[test]
    fn later_values_win() {
        let mut env = EnvManager::from_vars(HashMap::from([(
            "KINESIS_BRIDGE_STREAM_NAME".to_string(),
            "from-process".to_string(),
        )]));
        env.parse_env_content("KINESIS_BRIDGE_STREAM_NAME=from-file").unwrap();
        assert_eq!(env.all()["KINESIS_BRIDGE_STREAM_NAME"], "from-file");
    }

    #[test]
    fn overrides_mask_secrets() {
        let mut env = empty();
        env.parse_env_content(
            "KINESIS_BRIDGE_CAPTURE_API_KEY=phc_live\nKINESIS_BRIDGE_AWS_REGION=eu-west-1\nHOME=/root",
        )
        .unwrap();

        assert_eq!(
            env.overrides(),
            vec![
                ("KINESIS_BRIDGE_AWS_REGION".to_string(), "eu-west-1".to_string()),
                ("KINESIS_BRIDGE_CAPTURE_API_KEY".to_string(), REDACTED.to_string()),
            ]
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(empty().parse_env_content("INVALID LINE WITHOUT EQUALS").is_err());
        assert!(empty().parse_env_content("=value").is_err());
    }
}
