use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    pages_fetched: AtomicU64,
    records_fetched: AtomicU64,
    bytes_fetched: AtomicU64,
    events_captured: AtomicU64,
    decode_failures: AtomicU64,
    mapping_misses: AtomicU64,
    sink_failures: AtomicU64,
    cursor_reissues: AtomicU64,
    shard_failures: AtomicU64,
}

/// Process-wide counters shared by every shard poller.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub pages_fetched: u64,
    pub records_fetched: u64,
    pub bytes_fetched: u64,
    pub events_captured: u64,
    pub decode_failures: u64,
    pub mapping_misses: u64,
    pub sink_failures: u64,
    pub cursor_reissues: u64,
    pub shard_failures: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_pages(&self, count: u64) {
        self.inner.pages_fetched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_records(&self, count: u64) {
        self.inner.records_fetched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_bytes(&self, count: u64) {
        self.inner.bytes_fetched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_captured(&self, count: u64) {
        self.inner.events_captured.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_decode_failures(&self, count: u64) {
        self.inner.decode_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_mapping_misses(&self, count: u64) {
        self.inner.mapping_misses.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_sink_failures(&self, count: u64) {
        self.inner.sink_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_reissues(&self, count: u64) {
        self.inner.cursor_reissues.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_shard_failures(&self, count: u64) {
        self.inner.shard_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pages_fetched: self.inner.pages_fetched.load(Ordering::Relaxed),
            records_fetched: self.inner.records_fetched.load(Ordering::Relaxed),
            bytes_fetched: self.inner.bytes_fetched.load(Ordering::Relaxed),
            events_captured: self.inner.events_captured.load(Ordering::Relaxed),
            decode_failures: self.inner.decode_failures.load(Ordering::Relaxed),
            mapping_misses: self.inner.mapping_misses.load(Ordering::Relaxed),
            sink_failures: self.inner.sink_failures.load(Ordering::Relaxed),
            cursor_reissues: self.inner.cursor_reissues.load(Ordering::Relaxed),
            shard_failures: self.inner.shard_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
