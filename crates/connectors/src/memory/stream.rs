//! In-process sharded stream with Kinesis-like iterator semantics.
//!
//! Iterator tokens encode `shard/offset/generation`. Bumping a shard's
//! generation invalidates every token issued before it, which is how
//! server-side iterator expiry is modelled.

use async_trait::async_trait;
use bytes::Bytes;
use engine_core::{
    clock::{Clock, SystemClock},
    connectors::stream::StreamProvider,
    error::ProviderError,
};
use model::{
    core::identifiers::{ShardDescriptor, ShardId, StreamDescriptor},
    pagination::cursor::{IteratorPosition, ShardCursor},
    records::record::{RawRecord, RecordPage},
};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Default)]
struct ShardLog {
    records: Vec<RawRecord>,
    generation: u64,
    closed: bool,
    scheduled_failure: Option<ScheduledFailure>,
}

#[derive(Debug)]
struct ScheduledFailure {
    successes_left: usize,
    error: ProviderError,
}

#[derive(Debug, Default)]
struct StreamState {
    shards: BTreeMap<ShardId, ShardLog>,
    describe_failure: Option<String>,
}

pub struct InMemoryStream {
    name: String,
    page_size: usize,
    clock: Arc<dyn Clock>,
    state: Mutex<StreamState>,
}

impl InMemoryStream {
    pub fn new(name: impl Into<String>, shard_ids: &[&str]) -> Self {
        let shards = shard_ids
            .iter()
            .map(|id| (ShardId::from(*id), ShardLog::default()))
            .collect();
        Self {
            name: name.into(),
            page_size: DEFAULT_PAGE_SIZE,
            clock: Arc::new(SystemClock),
            state: Mutex::new(StreamState {
                shards,
                describe_failure: None,
            }),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Stamps record arrival times from `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_shard(&self, shard_id: &str) {
        self.lock()
            .shards
            .entry(ShardId::from(shard_id))
            .or_default();
    }

    /// Appends a record and returns its sequence number.
    pub fn put_record(&self, shard_id: &str, data: impl Into<Bytes>) -> String {
        let mut state = self.lock();
        let log = state.shards.entry(ShardId::from(shard_id)).or_default();
        let sequence_number = format!("{:020}", log.records.len());
        let mut record = RawRecord::new(data, sequence_number.clone());
        record.partition_key = shard_id.to_string();
        record.arrived_at = Some(self.clock.now());
        log.records.push(record);
        sequence_number
    }

    pub fn put_json(&self, shard_id: &str, value: &serde_json::Value) -> String {
        self.put_record(shard_id, value.to_string().into_bytes())
    }

    /// Invalidates every iterator issued so far for the shard.
    pub fn expire_iterators(&self, shard_id: &str) {
        if let Some(log) = self.lock().shards.get_mut(&ShardId::from(shard_id)) {
            log.generation += 1;
        }
    }

    /// Marks the shard as closed: once fully read, no next cursor is returned.
    pub fn close_shard(&self, shard_id: &str) {
        if let Some(log) = self.lock().shards.get_mut(&ShardId::from(shard_id)) {
            log.closed = true;
        }
    }

    /// Makes the next `get_records` call on the shard fail with `err`.
    pub fn fail_next_fetch(&self, shard_id: &str, err: ProviderError) {
        self.fail_fetch_after(shard_id, 0, err);
    }

    /// Lets `successes` fetches through, then fails the following one with
    /// `err`. An expiry error also invalidates all outstanding iterators.
    pub fn fail_fetch_after(&self, shard_id: &str, successes: usize, err: ProviderError) {
        if let Some(log) = self.lock().shards.get_mut(&ShardId::from(shard_id)) {
            log.scheduled_failure = Some(ScheduledFailure {
                successes_left: successes,
                error: err,
            });
        }
    }

    pub fn fail_describe(&self, reason: Option<&str>) {
        self.lock().describe_failure = reason.map(str::to_string);
    }

    fn token(shard_id: &ShardId, offset: usize, generation: u64) -> ShardCursor {
        ShardCursor::new(format!("{shard_id}/{offset}/{generation}"))
    }

    fn parse_token(cursor: &ShardCursor) -> Option<(ShardId, usize, u64)> {
        let mut parts = cursor.as_str().rsplitn(3, '/');
        let generation = parts.next()?.parse().ok()?;
        let offset = parts.next()?.parse().ok()?;
        let shard = parts.next()?;
        Some((ShardId::from(shard), offset, generation))
    }
}

#[async_trait]
impl StreamProvider for InMemoryStream {
    async fn describe_stream(&self, stream_name: &str) -> Result<StreamDescriptor, ProviderError> {
        if stream_name != self.name {
            return Err(ProviderError::StreamNotFound(stream_name.to_string()));
        }

        let state = self.lock();
        if let Some(reason) = &state.describe_failure {
            return Err(ProviderError::Transient(reason.clone()));
        }

        let shards = state
            .shards
            .keys()
            .map(|id| ShardDescriptor::new(id.clone()))
            .collect();
        Ok(StreamDescriptor::new(stream_name, shards))
    }

    async fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &ShardId,
        position: &IteratorPosition,
    ) -> Result<ShardCursor, ProviderError> {
        if stream_name != self.name {
            return Err(ProviderError::StreamNotFound(stream_name.to_string()));
        }

        let state = self.lock();
        let log = state
            .shards
            .get(shard_id)
            .ok_or_else(|| ProviderError::StreamNotFound(format!("{stream_name}/{shard_id}")))?;

        let offset = match position {
            IteratorPosition::Latest => log.records.len(),
            IteratorPosition::TrimHorizon => 0,
            IteratorPosition::AtSequenceNumber(seq) | IteratorPosition::AfterSequenceNumber(seq) => {
                let index = seq
                    .parse::<usize>()
                    .map_err(|_| ProviderError::Transient(format!("invalid sequence number '{seq}'")))?;
                let index = if matches!(position, IteratorPosition::AfterSequenceNumber(_)) {
                    index + 1
                } else {
                    index
                };
                index.min(log.records.len())
            }
            IteratorPosition::AtTimestamp(at) => log
                .records
                .iter()
                .position(|r| r.arrived_at.is_some_and(|arrived| arrived >= *at))
                .unwrap_or(log.records.len()),
        };

        Ok(Self::token(shard_id, offset, log.generation))
    }

    async fn get_records(&self, cursor: &ShardCursor) -> Result<RecordPage, ProviderError> {
        let (shard_id, offset, generation) = Self::parse_token(cursor)
            .ok_or_else(|| ProviderError::Transient(format!("malformed iterator {cursor:?}")))?;

        let mut state = self.lock();
        let log = state
            .shards
            .get_mut(&shard_id)
            .ok_or_else(|| ProviderError::StreamNotFound(shard_id.to_string()))?;

        match log.scheduled_failure.take() {
            Some(ScheduledFailure {
                successes_left: 0,
                error,
            }) => {
                if error.is_expired() {
                    log.generation += 1;
                }
                return Err(error);
            }
            Some(mut pending) => {
                pending.successes_left -= 1;
                log.scheduled_failure = Some(pending);
            }
            None => {}
        }

        if generation != log.generation {
            return Err(ProviderError::ExpiredIterator(format!(
                "iterator for {shard_id} issued at generation {generation}"
            )));
        }

        let end = (offset + self.page_size).min(log.records.len());
        let records = log.records[offset.min(end)..end].to_vec();
        let next_cursor = if log.closed && end >= log.records.len() {
            None
        } else {
            Some(Self::token(&shard_id, end, log.generation))
        };

        Ok(RecordPage {
            millis_behind_latest: Some(0),
            records,
            next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::clock::ManualClock;
    use std::time::Duration;

    #[tokio::test]
    async fn latest_iterator_skips_history() {
        let stream = InMemoryStream::new("s", &["shard-0"]);
        stream.put_record("shard-0", "old");

        let shard = ShardId::from("shard-0");
        let cursor = stream
            .get_shard_iterator("s", &shard, &IteratorPosition::Latest)
            .await
            .unwrap();
        stream.put_record("shard-0", "new");

        let page = stream.get_records(&cursor).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].data.as_ref(), b"new");
        assert!(page.next_cursor.is_some());
    }

    #[tokio::test]
    async fn expired_generation_is_rejected() {
        let stream = InMemoryStream::new("s", &["shard-0"]);
        let shard = ShardId::from("shard-0");
        let cursor = stream
            .get_shard_iterator("s", &shard, &IteratorPosition::TrimHorizon)
            .await
            .unwrap();

        stream.expire_iterators("shard-0");
        let err = stream.get_records(&cursor).await.unwrap_err();
        assert!(err.is_expired());
    }

    #[tokio::test]
    async fn after_sequence_number_resumes_past_record() {
        let stream = InMemoryStream::new("s", &["shard-0"]);
        let first = stream.put_record("shard-0", "a");
        stream.put_record("shard-0", "b");

        let cursor = stream
            .get_shard_iterator(
                "s",
                &ShardId::from("shard-0"),
                &IteratorPosition::AfterSequenceNumber(first),
            )
            .await
            .unwrap();
        let page = stream.get_records(&cursor).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].data.as_ref(), b"b");
    }

    #[tokio::test]
    async fn at_timestamp_starts_at_first_later_arrival() {
        let clock = Arc::new(ManualClock::default());
        let stream = InMemoryStream::new("s", &["shard-0"]).with_clock(clock.clone());
        stream.put_record("shard-0", "before");
        clock.advance(Duration::from_secs(10));
        let checkpoint = clock.now();
        stream.put_record("shard-0", "at");
        clock.advance(Duration::from_secs(10));
        stream.put_record("shard-0", "after");

        let cursor = stream
            .get_shard_iterator(
                "s",
                &ShardId::from("shard-0"),
                &IteratorPosition::AtTimestamp(checkpoint),
            )
            .await
            .unwrap();
        let page = stream.get_records(&cursor).await.unwrap();
        let data: Vec<_> = page.records.iter().map(|r| r.data.as_ref()).collect();
        assert_eq!(data, vec![b"at".as_ref(), b"after".as_ref()]);
    }

    #[tokio::test]
    async fn scheduled_expiry_invalidates_iterators() {
        let stream = InMemoryStream::new("s", &["shard-0"]);
        let shard = ShardId::from("shard-0");
        let cursor = stream
            .get_shard_iterator("s", &shard, &IteratorPosition::TrimHorizon)
            .await
            .unwrap();

        stream.fail_fetch_after(
            "shard-0",
            1,
            ProviderError::ExpiredIterator("expired".into()),
        );
        let next = stream.get_records(&cursor).await.unwrap().next_cursor.unwrap();
        assert!(stream.get_records(&next).await.unwrap_err().is_expired());
        assert!(stream.get_records(&next).await.unwrap_err().is_expired());
    }

    #[tokio::test]
    async fn closed_shard_ends_without_next_cursor() {
        let stream = InMemoryStream::new("s", &["shard-0"]).with_page_size(1);
        stream.put_record("shard-0", "a");
        stream.close_shard("shard-0");

        let cursor = stream
            .get_shard_iterator("s", &ShardId::from("shard-0"), &IteratorPosition::TrimHorizon)
            .await
            .unwrap();
        let page = stream.get_records(&cursor).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert!(page.next_cursor.is_none());
    }
}
