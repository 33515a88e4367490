use crate::kinesis::{
    error::{classify_get_records, classify_list_shards, classify_shard_iterator},
    settings::KinesisSettings,
};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_kinesis::{
    Client,
    config::{Credentials, Region},
    primitives::DateTime as SdkDateTime,
    types::{Record, ShardIteratorType},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use engine_core::{connectors::stream::StreamProvider, error::ProviderError};
use model::{
    core::identifiers::{ShardDescriptor, ShardId, StreamDescriptor},
    pagination::cursor::{IteratorPosition, ShardCursor},
    records::record::{RawRecord, RecordPage},
};
use tracing::{debug, info};

const CREDENTIALS_PROVIDER: &str = "kinesis-bridge";

/// [`StreamProvider`] backed by AWS Kinesis Data Streams.
#[derive(Clone)]
pub struct KinesisProvider {
    client: Client,
    page_limit: Option<i32>,
}

impl KinesisProvider {
    pub async fn connect(settings: &KinesisSettings) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(settings.region.clone()));

        if let Some((id, secret)) = settings.static_credentials() {
            loader = loader.credentials_provider(Credentials::new(
                id,
                secret,
                None,
                None,
                CREDENTIALS_PROVIDER,
            ));
        }

        if let Some(url) = &settings.endpoint_url {
            info!(endpoint = %url, "Using Kinesis endpoint override");
            loader = loader.endpoint_url(url);
        }

        let sdk_config = loader.load().await;
        Self {
            client: Client::new(&sdk_config),
            page_limit: settings.page_limit,
        }
    }

    pub fn from_client(client: Client, page_limit: Option<i32>) -> Self {
        Self { client, page_limit }
    }
}

#[async_trait]
impl StreamProvider for KinesisProvider {
    async fn describe_stream(&self, stream_name: &str) -> Result<StreamDescriptor, ProviderError> {
        let mut shards = Vec::new();
        let mut next_token: Option<String> = None;

        // ListShards rejects StreamName once a NextToken is supplied.
        loop {
            let request = match next_token.take() {
                Some(token) => self.client.list_shards().next_token(token),
                None => self.client.list_shards().stream_name(stream_name),
            };
            let out = request.send().await.map_err(classify_list_shards)?;

            shards.extend(
                out.shards()
                    .iter()
                    .map(|shard| ShardDescriptor::new(shard.shard_id())),
            );

            match out.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(stream = stream_name, shards = shards.len(), "Listed shards");
        Ok(StreamDescriptor::new(stream_name, shards))
    }

    async fn get_shard_iterator(
        &self,
        stream_name: &str,
        shard_id: &ShardId,
        position: &IteratorPosition,
    ) -> Result<ShardCursor, ProviderError> {
        let mut request = self
            .client
            .get_shard_iterator()
            .stream_name(stream_name)
            .shard_id(shard_id.as_str())
            .shard_iterator_type(iterator_type(position));

        if let Some(seq) = position.sequence_number() {
            request = request.starting_sequence_number(seq);
        }
        if let Some(at) = position.timestamp() {
            request = request.timestamp(SdkDateTime::from_millis(at.timestamp_millis()));
        }

        let out = request.send().await.map_err(classify_shard_iterator)?;
        out.shard_iterator()
            .map(ShardCursor::from)
            .ok_or_else(|| ProviderError::MissingIterator {
                shard_id: shard_id.to_string(),
            })
    }

    async fn get_records(&self, cursor: &ShardCursor) -> Result<RecordPage, ProviderError> {
        let mut request = self.client.get_records().shard_iterator(cursor.as_str());
        if let Some(limit) = self.page_limit {
            request = request.limit(limit);
        }

        let out = request.send().await.map_err(classify_get_records)?;

        Ok(RecordPage {
            records: out.records().iter().map(raw_record).collect(),
            next_cursor: out.next_shard_iterator().map(ShardCursor::from),
            millis_behind_latest: out.millis_behind_latest(),
        })
    }
}

fn iterator_type(position: &IteratorPosition) -> ShardIteratorType {
    match position {
        IteratorPosition::Latest => ShardIteratorType::Latest,
        IteratorPosition::TrimHorizon => ShardIteratorType::TrimHorizon,
        IteratorPosition::AtSequenceNumber(_) => ShardIteratorType::AtSequenceNumber,
        IteratorPosition::AfterSequenceNumber(_) => ShardIteratorType::AfterSequenceNumber,
        IteratorPosition::AtTimestamp(_) => ShardIteratorType::AtTimestamp,
    }
}

fn raw_record(record: &Record) -> RawRecord {
    let arrived_at = record
        .approximate_arrival_timestamp()
        .and_then(|ts| ts.to_millis().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis);

    RawRecord {
        data: Bytes::copy_from_slice(record.data().as_ref()),
        sequence_number: record.sequence_number().to_string(),
        partition_key: record.partition_key().to_string(),
        arrived_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_positions_to_iterator_types() {
        assert_eq!(
            iterator_type(&IteratorPosition::Latest),
            ShardIteratorType::Latest
        );
        assert_eq!(
            iterator_type(&IteratorPosition::AfterSequenceNumber("1".into())),
            ShardIteratorType::AfterSequenceNumber
        );
        assert_eq!(
            iterator_type(&IteratorPosition::AtTimestamp(Utc::now())),
            ShardIteratorType::AtTimestamp
        );
    }

    #[test]
    fn converts_sdk_records() {
        let record = Record::builder()
            .data(aws_sdk_kinesis::primitives::Blob::new(br#"{"event":"x"}"#.to_vec()))
            .sequence_number("49590338271490256608559692538361571095921575989136588898")
            .partition_key("pk")
            .build()
            .unwrap();

        let raw = raw_record(&record);
        assert_eq!(raw.data.as_ref(), br#"{"event":"x"}"#);
        assert_eq!(raw.partition_key, "pk");
        assert!(raw.arrived_at.is_none());
    }
}
