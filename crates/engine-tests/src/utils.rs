#![allow(dead_code)]

use connectors::memory::stream::InMemoryStream;
use engine_processing::producer::poller::{ShardOutcome, StopReason};
use serde_json::{Value, json};

/// Payload in the shape the bridge expects: an event name plus nested props.
pub fn event_payload(event: &str, foo: &str, user_id: &str) -> Value {
    json!({
        "event": event,
        "props": { "foo": foo, "user": { "id": user_id } }
    })
}

/// Appends `count` events named `<prefix>-<n>` and returns their names.
pub fn put_events(stream: &InMemoryStream, shard: &str, prefix: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|n| {
            let name = format!("{prefix}-{n}");
            stream.put_json(shard, &event_payload(&name, "bar", "user-1"));
            name
        })
        .collect()
}

pub fn outcome_for<'a>(outcomes: &'a [ShardOutcome], shard: &str) -> &'a ShardOutcome {
    outcomes
        .iter()
        .find(|o| o.shard_id.as_str() == shard)
        .unwrap_or_else(|| panic!("no outcome for shard {shard}"))
}

pub fn assert_stopped(outcome: &ShardOutcome, expected: StopReason) {
    assert_eq!(
        outcome.stop, expected,
        "shard {} stopped with {}",
        outcome.shard_id, outcome.stop
    );
}
