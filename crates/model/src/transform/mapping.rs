use serde_json::Value;
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("Event key path is empty")]
    EmptyEventKey,

    #[error("Mapping token '{0}' is missing the ':' separator")]
    MissingSeparator(String),

    #[error("Mapping token '{0}' has an empty source path or destination key")]
    EmptySegment(String),
}

/// Dot-separated path into a decoded payload (e.g. `props.user.email`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    pub segments: Vec<String>,
}

impl FieldPath {
    pub fn from_string(path: &str) -> Self {
        Self {
            segments: path.split('.').map(|s| s.to_string()).collect(),
        }
    }

    /// Walks the payload one key at a time.
    ///
    /// Objects are indexed by key and arrays by numeric segment. Anything else,
    /// including a missing key, resolves to `None`.
    pub fn resolve<'a>(&self, payload: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(payload, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }
}

impl FromStr for FieldPath {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MappingError::EmptyEventKey);
        }
        Ok(Self::from_string(s))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// One `sourcePath:destinationKey` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMapping {
    pub source: FieldPath,
    pub destination: String,
}

impl FromStr for PropertyMapping {
    type Err = MappingError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let (source, destination) = token
            .split_once(':')
            .ok_or_else(|| MappingError::MissingSeparator(token.to_string()))?;

        let (source, destination) = (source.trim(), destination.trim());
        if source.is_empty() || destination.is_empty() {
            return Err(MappingError::EmptySegment(token.to_string()));
        }

        Ok(PropertyMapping {
            source: FieldPath::from_string(source),
            destination: destination.to_string(),
        })
    }
}

/// Parsed mapping configuration: where the event name lives and which
/// payload fields become event properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMappingSpec {
    pub event_key: FieldPath,
    pub properties: Vec<PropertyMapping>,
}

impl FieldMappingSpec {
    /// Strict parse: any malformed token fails the whole spec.
    pub fn parse(event_key: &str, mappings: &str) -> Result<Self, MappingError> {
        let event_key = event_key.parse::<FieldPath>()?;
        let properties = tokens(mappings)
            .map(str::parse)
            .collect::<Result<Vec<PropertyMapping>, _>>()?;

        Ok(Self {
            event_key,
            properties,
        })
    }

    /// Lenient parse: malformed tokens are returned alongside the usable spec
    /// so the caller can report them.
    pub fn parse_lenient(
        event_key: &str,
        mappings: &str,
    ) -> Result<(Self, Vec<MappingError>), MappingError> {
        let event_key = event_key.parse::<FieldPath>()?;
        let mut properties = Vec::new();
        let mut rejected = Vec::new();

        for token in tokens(mappings) {
            match token.parse::<PropertyMapping>() {
                Ok(mapping) => properties.push(mapping),
                Err(err) => rejected.push(err),
            }
        }

        Ok((
            Self {
                event_key,
                properties,
            },
            rejected,
        ))
    }
}

fn tokens(mappings: &str) -> impl Iterator<Item = &str> {
    mappings.split(',').map(str::trim).filter(|t| !t.is_empty())
}
