use crate::error::ProviderError;
use async_trait::async_trait;
use model::{
    core::identifiers::{ShardId, StreamDescriptor},
    pagination::cursor::{IteratorPosition, ShardCursor},
    records::record::RecordPage,
};

/// The three calls the poller needs from a sharded stream.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Lists the current shard set of a stream.
    async fn describe_stream(&self, stream_name: &str) -> Result<StreamDescriptor, ProviderError>;

    /// Issues a new cursor for a shard at the requested position.
    async fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &ShardId,
        position: &IteratorPosition,
    ) -> Result<ShardCursor, ProviderError>;

    /// Fetches one page of records. Fails with [`ProviderError::ExpiredIterator`]
    /// when the cursor is no longer valid.
    async fn get_records(&self, cursor: &ShardCursor) -> Result<RecordPage, ProviderError>;
}
