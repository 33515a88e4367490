use crate::{
    decoder,
    error::PollerError,
    state_manager::CursorStore,
    transform::mapping::EventMapper,
};
use chrono::{DateTime, Utc};
use engine_core::context::bridge::BridgeContext;
use model::{
    core::identifiers::{ShardDescriptor, ShardId},
    pagination::cursor::{IteratorPosition, ShardCursor},
    records::record::RawRecord,
};
use std::{fmt, sync::Arc};
use tracing::{debug, debug_span, error, info, warn};

/// Why a shard stopped polling for the current cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The cycle's time budget ran out; the next cycle resumes from the
    /// persisted cursor.
    BudgetExhausted,
    /// The shard is closed and fully read.
    ShardClosed,
    Cancelled,
    Failed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::BudgetExhausted => write!(f, "time budget exhausted"),
            StopReason::ShardClosed => write!(f, "shard closed"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Summary of one shard's poll within a cycle.
#[derive(Debug, Clone)]
pub struct ShardOutcome {
    pub shard_id: ShardId,
    pub pages: usize,
    pub records: usize,
    pub events: usize,
    pub reissues: usize,
    /// Last cursor persisted during this run.
    pub last_cursor: Option<ShardCursor>,
    pub stop: StopReason,
}

impl ShardOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.stop, StopReason::Failed(_))
    }
}

#[derive(Debug, Default)]
struct Progress {
    pages: usize,
    records: usize,
    events: usize,
    reissues: usize,
    /// Where a replacement cursor starts if the current one expires.
    resume: Option<IteratorPosition>,
    last_cursor: Option<ShardCursor>,
}

impl Progress {
    fn finish(self, shard_id: ShardId, stop: StopReason) -> ShardOutcome {
        ShardOutcome {
            shard_id,
            pages: self.pages,
            records: self.records,
            events: self.events,
            reissues: self.reissues,
            last_cursor: self.last_cursor,
            stop,
        }
    }
}

enum PollState {
    NoCursor,
    HasCursor(ShardCursor),
    Fetching(ShardCursor),
    Expired,
    Done(StopReason),
}

/// Drains one shard for at most one time budget, checkpointing after every
/// page.
pub struct ShardPoller {
    ctx: Arc<BridgeContext>,
    mapper: Arc<EventMapper>,
    cursors: CursorStore,
    shard_id: ShardId,
    key: String,
}

impl ShardPoller {
    pub fn new(ctx: Arc<BridgeContext>, mapper: Arc<EventMapper>, shard: &ShardDescriptor) -> Self {
        let cursors = CursorStore::new(ctx.cache.clone(), ctx.settings.cursor_ttl);
        let key = CursorStore::cursor_key(&ctx.stream_name, &shard.shard_id);
        Self {
            ctx,
            mapper,
            cursors,
            shard_id: shard.shard_id.clone(),
            key,
        }
    }

    /// Runs the poll state machine until it reaches `Done`. Never fails: every
    /// error is reported and folded into the returned outcome.
    pub async fn run(&self, started_at: DateTime<Utc>) -> ShardOutcome {
        let mut progress = Progress::default();
        let mut state = PollState::NoCursor;

        loop {
            state = match state {
                PollState::NoCursor => match self.enter(&mut progress).await {
                    Ok(cursor) => PollState::HasCursor(cursor),
                    Err(err) => self.fail(err),
                },
                PollState::HasCursor(cursor) => {
                    if self.ctx.cancel.is_cancelled() {
                        info!(shard_id = %self.shard_id, "Cancellation requested. Stopping shard poll.");
                        PollState::Done(StopReason::Cancelled)
                    } else {
                        PollState::Fetching(cursor)
                    }
                }
                PollState::Fetching(cursor) => self.fetch(&cursor, started_at, &mut progress).await,
                PollState::Expired => self.reissue(&mut progress).await,
                PollState::Done(stop) => {
                    let outcome = progress.finish(self.shard_id.clone(), stop);
                    debug!(
                        shard_id = %outcome.shard_id,
                        pages = outcome.pages,
                        records = outcome.records,
                        events = outcome.events,
                        stop = %outcome.stop,
                        "Shard poll finished"
                    );
                    return outcome;
                }
            };
        }
    }

    async fn enter(&self, progress: &mut Progress) -> Result<ShardCursor, PollerError> {
        match self.cursors.load(&self.key).await? {
            Some(cursor) => {
                progress.resume = self.cursors.load_resume(&self.key).await?;
                debug!(
                    shard_id = %self.shard_id,
                    ?cursor,
                    resume = ?progress.resume,
                    "Resuming from persisted cursor"
                );
                Ok(cursor)
            }
            None => self.issue(&IteratorPosition::Latest, progress).await,
        }
    }

    /// Requests a cursor at `position` and persists it together with the
    /// position a later reissue must start from.
    async fn issue(
        &self,
        position: &IteratorPosition,
        progress: &mut Progress,
    ) -> Result<ShardCursor, PollerError> {
        // Taken before the request so nothing arriving meanwhile is skipped.
        let resume = match position {
            IteratorPosition::Latest => IteratorPosition::AtTimestamp(self.ctx.clock.now()),
            other => other.clone(),
        };

        let cursor = self
            .ctx
            .provider
            .get_shard_iterator(&self.ctx.stream_name, &self.shard_id, position)
            .await
            .map_err(|source| PollerError::Provider {
                shard_id: self.shard_id.clone(),
                source,
            })?;

        self.cursors.save_resume(&self.key, &resume).await?;
        self.cursors.save(&self.key, &cursor).await?;
        progress.resume = Some(resume);
        info!(shard_id = %self.shard_id, %position, "Issued new shard iterator");
        Ok(cursor)
    }

    async fn fetch(
        &self,
        cursor: &ShardCursor,
        started_at: DateTime<Utc>,
        progress: &mut Progress,
    ) -> PollState {
        let page = match self.ctx.provider.get_records(cursor).await {
            Ok(page) => page,
            Err(err) if err.is_expired() => {
                warn!(shard_id = %self.shard_id, error = %err, "Shard iterator expired");
                return PollState::Expired;
            }
            Err(source) => {
                return self.fail(PollerError::Provider {
                    shard_id: self.shard_id.clone(),
                    source,
                });
            }
        };

        progress.pages += 1;
        self.ctx.metrics.increment_pages(1);
        if page.is_empty() {
            debug!(shard_id = %self.shard_id, "No records");
        } else {
            debug!(
                shard_id = %self.shard_id,
                records = page.records.len(),
                millis_behind_latest = ?page.millis_behind_latest,
                "Fetched records"
            );
            self.process_records(&page.records, progress).await;
        }
        let resume = page.last_sequence_number().map(IteratorPosition::after);

        let Some(next) = page.next_cursor else {
            info!(shard_id = %self.shard_id, "Shard closed and fully read");
            if let Err(err) = self.cursors.clear(&self.key).await {
                warn!(shard_id = %self.shard_id, error = %err, "Failed to clear cursor of closed shard");
            }
            return PollState::Done(StopReason::ShardClosed);
        };

        // Checkpoint before anything else so a crash can only replay this page.
        if let Some(resume) = resume {
            if let Err(err) = self.cursors.save_resume(&self.key, &resume).await {
                return self.fail(err.into());
            }
            progress.resume = Some(resume);
        }
        if let Err(err) = self.cursors.save(&self.key, &next).await {
            return self.fail(err.into());
        }
        progress.last_cursor = Some(next.clone());

        if self.budget_exhausted(started_at) {
            debug!(shard_id = %self.shard_id, "Time budget exhausted");
            return PollState::Done(StopReason::BudgetExhausted);
        }

        self.ctx.clock.sleep(self.ctx.settings.page_delay).await;
        PollState::HasCursor(next)
    }

    async fn reissue(&self, progress: &mut Progress) -> PollState {
        progress.reissues += 1;
        self.ctx.metrics.increment_reissues(1);

        let limit = self.ctx.settings.max_expired_reissues;
        if progress.reissues > limit {
            return self.fail(PollerError::ReissueLimit {
                shard_id: self.shard_id.clone(),
                attempts: progress.reissues,
            });
        }

        let position = match progress.resume.clone() {
            Some(position) => position,
            None => {
                warn!(
                    shard_id = %self.shard_id,
                    "No resume position recorded; reissuing at LATEST"
                );
                IteratorPosition::Latest
            }
        };
        match self.issue(&position, progress).await {
            Ok(cursor) => {
                progress.last_cursor = Some(cursor.clone());
                PollState::HasCursor(cursor)
            }
            Err(err) => self.fail(err),
        }
    }

    async fn process_records(&self, records: &[RawRecord], progress: &mut Progress) {
        let metrics = &self.ctx.metrics;

        for record in records {
            progress.records += 1;
            metrics.increment_records(1);
            metrics.increment_bytes(record.size_bytes() as u64);

            let decoded = debug_span!(
                "record",
                shard_id = %self.shard_id,
                sequence_number = %record.sequence_number
            )
            .in_scope(|| decoder::decode(&record.data));
            let Some(payload) = decoded else {
                metrics.increment_decode_failures(1);
                continue;
            };

            let Some(event) = self.mapper.map(&payload) else {
                metrics.increment_mapping_misses(1);
                continue;
            };

            match self.ctx.sink.capture(&event).await {
                Ok(()) => {
                    progress.events += 1;
                    metrics.increment_captured(1);
                }
                Err(err) => {
                    warn!(
                        shard_id = %self.shard_id,
                        sequence_number = %record.sequence_number,
                        event = %event.event,
                        error = %err,
                        "Failed to capture event"
                    );
                    metrics.increment_sink_failures(1);
                }
            }
        }
    }

    fn budget_exhausted(&self, started_at: DateTime<Utc>) -> bool {
        self.ctx.clock.elapsed_since(started_at) > self.ctx.settings.time_budget
    }

    fn fail(&self, err: PollerError) -> PollState {
        error!(shard_id = %self.shard_id, error = %err, "Shard poll failed");
        self.ctx.metrics.increment_shard_failures(1);
        PollState::Done(StopReason::Failed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::{capture::memory::MemoryCaptureSink, memory::stream::InMemoryStream};
    use engine_core::{
        clock::{Clock, ManualClock},
        context::bridge::{BridgeContextParams, PollSettings},
        error::ProviderError,
        state::{KeyValueCache, memory::MemoryCache},
    };
    use model::transform::mapping::FieldMappingSpec;
    use serde_json::json;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    const STREAM: &str = "events";
    const SHARD: &str = "shardId-000000000000";

    fn settings() -> PollSettings {
        PollSettings {
            time_budget: Duration::from_secs(60),
            cursor_ttl: Duration::from_secs(120),
            page_delay: Duration::from_secs(20),
            max_expired_reissues: 2,
        }
    }

    struct Harness {
        stream: Arc<InMemoryStream>,
        cache: Arc<MemoryCache>,
        sink: Arc<MemoryCaptureSink>,
        clock: Arc<ManualClock>,
        cancel: CancellationToken,
        ctx: Arc<BridgeContext>,
    }

    impl Harness {
        fn new(page_size: usize, settings: PollSettings) -> Self {
            let clock = Arc::new(ManualClock::default());
            let stream = Arc::new(
                InMemoryStream::new(STREAM, &[SHARD])
                    .with_page_size(page_size)
                    .with_clock(clock.clone()),
            );
            let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
            let sink = Arc::new(MemoryCaptureSink::new());
            let cancel = CancellationToken::new();

            let ctx = Arc::new(BridgeContext::new(BridgeContextParams {
                stream_name: STREAM.to_string(),
                mapping: FieldMappingSpec::parse("event", "props.foo:foo").unwrap(),
                settings,
                provider: stream.clone(),
                cache: cache.clone(),
                sink: sink.clone(),
                clock: clock.clone(),
                cancel: cancel.clone(),
            }));

            Self {
                stream,
                cache,
                sink,
                clock,
                cancel,
                ctx,
            }
        }

        fn poller(&self) -> ShardPoller {
            let mapper = Arc::new(EventMapper::new(self.ctx.mapping.clone()));
            ShardPoller::new(self.ctx.clone(), mapper, &ShardDescriptor::new(SHARD))
        }

        async fn cycle(&self) -> ShardOutcome {
            let started_at = self.clock.now();
            self.poller().run(started_at).await
        }

        fn key() -> String {
            CursorStore::cursor_key(STREAM, &ShardId::from(SHARD))
        }

        async fn persisted(&self) -> Option<String> {
            self.cache.get(&Self::key()).await.unwrap()
        }

        async fn persisted_resume(&self) -> Option<IteratorPosition> {
            CursorStore::new(self.cache.clone(), self.ctx.settings.cursor_ttl)
                .load_resume(&Self::key())
                .await
                .unwrap()
        }

        fn put_event(&self, name: &str) -> String {
            self.stream
                .put_json(SHARD, &json!({"event": name, "props": {"foo": "bar"}}))
        }
    }

    #[tokio::test]
    async fn first_cycle_starts_at_latest_and_persists_cursor() {
        let h = Harness::new(10, settings());
        h.put_event("history");

        let outcome = h.cycle().await;

        assert_eq!(outcome.stop, StopReason::BudgetExhausted);
        assert_eq!(outcome.records, 0);
        assert!(h.sink.events().is_empty());
        assert_eq!(
            h.persisted().await,
            outcome.last_cursor.map(ShardCursor::into_inner)
        );
    }

    #[tokio::test]
    async fn stops_when_budget_is_exceeded() {
        let h = Harness::new(10, settings());

        let outcome = h.cycle().await;

        // Pages at t=0,20,40,60 stay within the 60s budget; the one at t=80 does not.
        assert_eq!(outcome.pages, 5);
        assert_eq!(outcome.stop, StopReason::BudgetExhausted);
    }

    #[tokio::test]
    async fn next_cycle_resumes_from_persisted_cursor() {
        let h = Harness::new(2, settings());
        h.cycle().await;
        let checkpoint = h.persisted().await;
        assert!(checkpoint.is_some());

        for name in ["a", "b", "c"] {
            h.put_event(name);
        }
        let outcome = h.cycle().await;

        assert_eq!(h.sink.event_names(), vec!["a", "b", "c"]);
        assert_eq!(outcome.events, 3);
        assert_ne!(h.persisted().await, checkpoint);

        // Nothing new: a third cycle captures nothing more.
        h.cycle().await;
        assert_eq!(h.sink.events().len(), 3);
        assert_eq!(h.sink.events()[0].property("foo"), Some("bar"));
    }

    #[tokio::test]
    async fn expired_cursor_is_reissued_without_losing_records() {
        let h = Harness::new(2, settings());
        h.cycle().await;

        for i in 0..5 {
            h.put_event(&format!("e{i}"));
        }
        h.stream.fail_fetch_after(
            SHARD,
            1,
            ProviderError::ExpiredIterator("Iterator expired".into()),
        );

        let outcome = h.cycle().await;

        assert_eq!(outcome.reissues, 1);
        assert_eq!(outcome.stop, StopReason::BudgetExhausted);
        assert_eq!(h.sink.event_names(), vec!["e0", "e1", "e2", "e3", "e4"]);
        assert_eq!(h.ctx.metrics.snapshot().cursor_reissues, 1);
    }

    #[traced_test]
    #[tokio::test]
    async fn stored_cursor_expiring_before_any_read_replays_from_positioning_time() {
        let h = Harness::new(2, settings());
        let positioned_at = h.clock.now();
        h.cycle().await;
        assert_eq!(
            h.persisted_resume().await,
            Some(IteratorPosition::AtTimestamp(positioned_at))
        );

        for name in ["a", "b", "c"] {
            h.put_event(name);
        }
        h.stream
            .fail_next_fetch(SHARD, ProviderError::ExpiredIterator("Iterator expired".into()));

        let outcome = h.cycle().await;

        assert_eq!(outcome.reissues, 1);
        assert_eq!(h.sink.event_names(), vec!["a", "b", "c"]);
        assert!(!logs_contain("reissuing at LATEST"));
    }

    #[tokio::test]
    async fn stored_cursor_expiring_resumes_after_last_read_record() {
        let h = Harness::new(2, settings());
        h.cycle().await;
        let first = h.put_event("a");
        h.cycle().await;
        assert_eq!(
            h.persisted_resume().await,
            Some(IteratorPosition::after(first))
        );

        h.put_event("b");
        let last = h.put_event("c");
        h.stream.expire_iterators(SHARD);

        let outcome = h.cycle().await;

        assert_eq!(outcome.reissues, 1);
        assert_eq!(h.sink.event_names(), vec!["a", "b", "c"]);
        assert_eq!(h.persisted_resume().await, Some(IteratorPosition::after(last)));
    }

    #[tokio::test]
    async fn reissue_limit_ends_the_cycle() {
        let h = Harness::new(
            2,
            PollSettings {
                max_expired_reissues: 0,
                ..settings()
            },
        );
        h.cycle().await;
        h.stream
            .fail_next_fetch(SHARD, ProviderError::ExpiredIterator("expired".into()));

        let outcome = h.cycle().await;
        assert!(outcome.is_failure());
        assert_eq!(outcome.pages, 0);
    }

    #[traced_test]
    #[tokio::test]
    async fn transient_failure_keeps_previous_cursor() {
        let h = Harness::new(2, settings());
        h.cycle().await;
        let before = h.persisted().await;

        h.put_event("late");
        h.stream
            .fail_next_fetch(SHARD, ProviderError::Transient("connection reset".into()));

        let outcome = h.cycle().await;
        assert!(outcome.is_failure());
        assert_eq!(h.persisted().await, before);
        assert!(h.sink.events().is_empty());
        assert!(logs_contain("Shard poll failed"));

        h.cycle().await;
        assert_eq!(h.sink.event_names(), vec!["late"]);
    }

    #[traced_test]
    #[tokio::test]
    async fn undecodable_records_are_dropped_individually() {
        let h = Harness::new(10, settings());
        h.cycle().await;

        h.stream.put_record(SHARD, "not json");
        h.stream.put_json(SHARD, &json!({"no_event": true}));
        h.put_event("ok");

        let outcome = h.cycle().await;
        assert_eq!(outcome.records, 3);
        assert_eq!(h.sink.event_names(), vec!["ok"]);

        let metrics = h.ctx.metrics.snapshot();
        assert!(logs_contain("Failed to decode record payload"));
        assert!(logs_contain("sequence_number=00000000000000000000"));
        assert_eq!(metrics.decode_failures, 1);
        assert_eq!(metrics.mapping_misses, 1);
        assert_eq!(metrics.events_captured, 1);
    }

    #[tokio::test]
    async fn sink_failures_do_not_block_checkpointing() {
        let h = Harness::new(10, settings());
        h.cycle().await;
        let before = h.persisted().await;

        h.sink.fail_with(Some("capture endpoint down"));
        h.put_event("dropped");

        let outcome = h.cycle().await;
        assert_eq!(outcome.events, 0);
        assert_eq!(outcome.records, 1);
        assert_ne!(h.persisted().await, before);
        assert_eq!(h.ctx.metrics.snapshot().sink_failures, 1);
    }

    #[tokio::test]
    async fn closed_shard_clears_its_cursor() {
        let h = Harness::new(10, settings());
        h.cycle().await;

        h.put_event("final");
        h.stream.close_shard(SHARD);

        let outcome = h.cycle().await;
        assert_eq!(outcome.stop, StopReason::ShardClosed);
        assert_eq!(h.sink.event_names(), vec!["final"]);
        assert_eq!(h.persisted().await, None);
        assert_eq!(h.persisted_resume().await, None);
    }

    #[tokio::test]
    async fn cancellation_stops_before_fetching() {
        let h = Harness::new(10, settings());
        h.cancel.cancel();

        let outcome = h.cycle().await;
        assert_eq!(outcome.stop, StopReason::Cancelled);
        assert_eq!(outcome.pages, 0);
        assert!(h.persisted().await.is_some());
    }
}
