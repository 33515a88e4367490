use crate::pagination::cursor::ShardCursor;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured form of a record payload.
pub type DecodedPayload = serde_json::Value;

/// A record as returned by the stream provider, payload still undecoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub data: Bytes,
    pub sequence_number: String,
    pub partition_key: String,
    pub arrived_at: Option<DateTime<Utc>>,
}

impl RawRecord {
    pub fn new(data: impl Into<Bytes>, sequence_number: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            sequence_number: sequence_number.into(),
            partition_key: String::new(),
            arrived_at: None,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// One page returned by a records fetch.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<RawRecord>,

    /// Cursor for the following page. `None` once the shard has been closed
    /// and fully read.
    pub next_cursor: Option<ShardCursor>,

    pub millis_behind_latest: Option<i64>,
}

impl RecordPage {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last_sequence_number(&self) -> Option<&str> {
        self.records.last().map(|r| r.sequence_number.as_str())
    }
}
