use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Event handed to the capture sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEvent {
    pub event: String,
    pub properties: BTreeMap<String, String>,
}

impl OutputEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
