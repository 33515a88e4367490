use super::BridgeConfig;
use crate::error::ConfigError;
use model::transform::mapping::FieldMappingSpec;

impl BridgeConfig {
    /// Rejects configurations the bridge cannot run with.
    ///
    /// Mapping tokens are parsed strictly here: a token without a colon or
    /// with an empty side is an error, whereas the runtime mapper only warns
    /// about and skips such tokens.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream_name.trim().is_empty() {
            return Err(ConfigError::Missing("stream_name"));
        }
        self.mapping_spec()?;

        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Zero {
                field: "poll_interval_secs",
            });
        }
        if self.time_budget_secs == 0 {
            return Err(ConfigError::Zero {
                field: "time_budget_secs",
            });
        }
        if self.cursor_ttl_secs <= self.poll_interval_secs {
            return Err(ConfigError::TtlTooShort {
                ttl_secs: self.cursor_ttl_secs,
                interval_secs: self.poll_interval_secs,
            });
        }

        Ok(())
    }

    pub fn mapping_spec(&self) -> Result<FieldMappingSpec, ConfigError> {
        if self.event_key.trim().is_empty() {
            return Err(ConfigError::Missing("event_key"));
        }
        Ok(FieldMappingSpec::parse(
            &self.event_key,
            &self.additional_property_mappings,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::transform::mapping::MappingError;

    fn valid() -> BridgeConfig {
        BridgeConfig {
            stream_name: "events".into(),
            event_key: "type".into(),
            additional_property_mappings: "user.id:distinct_id, page:url".into(),
            ..BridgeConfig::default()
        }
    }

    #[test]
    fn accepts_defaults_with_required_fields() {
        valid().validate().unwrap();
        let spec = valid().mapping_spec().unwrap();
        assert_eq!(spec.properties.len(), 2);
    }

    #[test]
    fn rejects_blank_stream_and_event_key() {
        let config = BridgeConfig {
            stream_name: "  ".into(),
            ..valid()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Missing("stream_name"))));

        let config = BridgeConfig {
            event_key: String::new(),
            ..valid()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Missing("event_key"))));
    }

    #[test]
    fn rejects_ttl_not_exceeding_interval() {
        let config = BridgeConfig {
            poll_interval_secs: 120,
            cursor_ttl_secs: 120,
            ..valid()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TtlTooShort {
                ttl_secs: 120,
                interval_secs: 120
            })
        ));
    }

    #[test]
    fn rejects_zero_interval() {
        let config = BridgeConfig {
            poll_interval_secs: 0,
            ..valid()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Zero {
                field: "poll_interval_secs"
            })
        ));
    }

    #[test]
    fn rejects_malformed_mapping_tokens() {
        let config = BridgeConfig {
            additional_property_mappings: "a:b,orphan".into(),
            ..valid()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Mapping(MappingError::MissingSeparator(token))) if token == "orphan"
        ));

        let config = BridgeConfig {
            additional_property_mappings: ":dest".into(),
            ..valid()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Mapping(MappingError::EmptySegment(_)))
        ));
    }
}
