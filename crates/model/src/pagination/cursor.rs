use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque read position within a single shard.
///
/// The token is issued by the stream provider and is only meaningful for the
/// (stream, shard) pair it was issued for.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct ShardCursor(String);

impl ShardCursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for ShardCursor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ShardCursor {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// Provider tokens are long base64 blobs; keep log lines readable.
impl fmt::Debug for ShardCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 16;
        if self.0.len() <= PREVIEW {
            write!(f, "ShardCursor({})", self.0)
        } else {
            let cut = self
                .0
                .char_indices()
                .nth(PREVIEW)
                .map(|(i, _)| i)
                .unwrap_or(self.0.len());
            write!(f, "ShardCursor({}…)", &self.0[..cut])
        }
    }
}

impl fmt::Display for ShardCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a freshly issued cursor should point.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum IteratorPosition {
    /// Just after the most recent record; history is skipped.
    Latest,

    /// Oldest untrimmed record in the shard.
    TrimHorizon,

    /// The record with this sequence number.
    AtSequenceNumber(String),

    /// Right after the record with this sequence number.
    AfterSequenceNumber(String),

    /// First record that arrived at or after this instant.
    AtTimestamp(DateTime<Utc>),
}

impl IteratorPosition {
    pub fn after(sequence_number: impl Into<String>) -> Self {
        IteratorPosition::AfterSequenceNumber(sequence_number.into())
    }

    pub fn sequence_number(&self) -> Option<&str> {
        match self {
            IteratorPosition::AtSequenceNumber(seq)
            | IteratorPosition::AfterSequenceNumber(seq) => Some(seq),
            IteratorPosition::Latest
            | IteratorPosition::TrimHorizon
            | IteratorPosition::AtTimestamp(_) => None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            IteratorPosition::AtTimestamp(at) => Some(*at),
            _ => None,
        }
    }
}

impl fmt::Display for IteratorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IteratorPosition::Latest => write!(f, "LATEST"),
            IteratorPosition::TrimHorizon => write!(f, "TRIM_HORIZON"),
            IteratorPosition::AtSequenceNumber(seq) => write!(f, "AT_SEQUENCE_NUMBER({seq})"),
            IteratorPosition::AfterSequenceNumber(seq) => {
                write!(f, "AFTER_SEQUENCE_NUMBER({seq})")
            }
            IteratorPosition::AtTimestamp(at) => {
                write!(f, "AT_TIMESTAMP({})", at.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
        }
    }
}
