use model::{
    events::capture::OutputEvent,
    transform::mapping::{FieldMappingSpec, MappingError},
};
use serde_json::Value;
use tracing::warn;

/// Turns decoded payloads into capture events according to a
/// [`FieldMappingSpec`].
#[derive(Debug, Clone)]
pub struct EventMapper {
    spec: FieldMappingSpec,
}

impl EventMapper {
    pub fn new(spec: FieldMappingSpec) -> Self {
        Self { spec }
    }

    /// Builds a mapper from raw configuration strings. Malformed property
    /// tokens are reported and dropped; only an unusable event key fails.
    pub fn from_config(event_key: &str, mappings: &str) -> Result<Self, MappingError> {
        let (spec, rejected) = FieldMappingSpec::parse_lenient(event_key, mappings)?;
        for err in &rejected {
            warn!(error = %err, "Ignoring property mapping");
        }
        Ok(Self::new(spec))
    }

    /// Returns `None` when the event key does not resolve to a truthy value.
    /// Individual properties that are missing or not strings are skipped.
    pub fn map(&self, payload: &Value) -> Option<OutputEvent> {
        let event_key = &self.spec.event_key;
        let event = match event_key.resolve(payload) {
            Some(value) if is_truthy(value) => event_name(value),
            _ => {
                warn!(path = %event_key, "Event key not found in record");
                return None;
            }
        };

        let mut output = OutputEvent::new(event);
        for mapping in &self.spec.properties {
            match mapping.source.resolve(payload) {
                Some(Value::String(s)) => {
                    output.properties.insert(mapping.destination.clone(), s.clone());
                }
                Some(other) => {
                    warn!(
                        path = %mapping.source,
                        kind = value_kind(other),
                        "Property value is not a string; skipping"
                    );
                }
                None => {
                    warn!(path = %mapping.source, "Property not found in record; skipping");
                }
            }
        }

        Some(output)
    }
}

/// One-shot form of [`EventMapper::map`] taking the raw configuration strings.
pub fn map_event(payload: &Value, event_key: &str, mappings: &str) -> Option<OutputEvent> {
    match EventMapper::from_config(event_key, mappings) {
        Ok(mapper) => mapper.map(payload),
        Err(err) => {
            warn!(error = %err, "Invalid event key");
            None
        }
    }
}

/// JavaScript truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy;
/// every object and array is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// Non-string event names are accepted as-is, rendered as compact JSON.
fn event_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    fn payload() -> Value {
        json!({"event": "kinesis test", "props": {"foo": "bar"}})
    }

    #[test]
    fn maps_event_and_properties() {
        let event = map_event(&payload(), "event", "props.foo:foo").unwrap();
        assert_eq!(event, OutputEvent::new("kinesis test").with_property("foo", "bar"));
    }

    #[traced_test]
    #[test]
    fn wrong_source_path_yields_empty_properties() {
        let event = map_event(&payload(), "event", "props.bar:foo").unwrap();
        assert_eq!(event.event, "kinesis test");
        assert!(event.properties.is_empty());
        assert!(logs_contain("Property not found in record"));
    }

    #[traced_test]
    #[test]
    fn wrong_event_key_yields_none() {
        assert_eq!(map_event(&payload(), "wrong_event_key", "props.foo:foo"), None);
        assert!(logs_contain("Event key not found in record"));
    }

    #[test]
    fn non_string_properties_are_skipped() {
        let doc = json!({"event": "e", "props": {"n": 3, "o": {"a": "b"}, "s": "ok"}});
        let event = map_event(&doc, "event", "props.n:n,props.o:o,props.s:s").unwrap();
        assert_eq!(event.properties.len(), 1);
        assert_eq!(event.property("s"), Some("ok"));
        assert!(!event.properties.contains_key("n"));
        assert!(!event.properties.contains_key("o"));
    }

    #[test]
    fn falsy_event_values_are_not_events() {
        for value in [json!(null), json!(false), json!(0), json!("")] {
            let doc = json!({"event": value});
            assert_eq!(map_event(&doc, "event", ""), None, "value {value}");
        }
    }

    #[test]
    fn non_string_event_name_is_accepted() {
        let doc = json!({"meta": {"kind": {"name": "x"}}});
        let event = map_event(&doc, "meta.kind", "").unwrap();
        assert_eq!(event.event, r#"{"name":"x"}"#);

        let doc = json!({"code": 42});
        assert_eq!(map_event(&doc, "code", "").unwrap().event, "42");
    }

    #[test]
    fn token_without_colon_never_creates_undefined_key() {
        let event = map_event(&payload(), "event", "props.foo,props.foo:foo").unwrap();
        assert_eq!(event.properties.len(), 1);
        assert!(!event.properties.contains_key("undefined"));
    }

    #[test]
    fn nested_event_key_resolves() {
        let doc = json!({"meta": {"type": "signup"}, "user": {"email": "a@b.c"}});
        let event = map_event(&doc, "meta.type", "user.email:email").unwrap();
        assert_eq!(event.event, "signup");
        assert_eq!(event.property("email"), Some("a@b.c"));
    }
}
