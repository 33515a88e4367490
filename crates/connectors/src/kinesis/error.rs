//! Maps SDK failures onto [`ProviderError`] so the poller can tell an expired
//! cursor apart from everything else.

use aws_sdk_kinesis::{
    error::{DisplayErrorContext, SdkError},
    operation::{
        get_records::GetRecordsError, get_shard_iterator::GetShardIteratorError,
        list_shards::ListShardsError,
    },
};
use engine_core::error::ProviderError;

pub fn classify_get_records<R>(err: SdkError<GetRecordsError, R>) -> ProviderError
where
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(&err).to_string();
    match err.as_service_error() {
        Some(e) if e.is_expired_iterator_exception() => ProviderError::ExpiredIterator(detail),
        Some(e) if e.is_provisioned_throughput_exceeded_exception() => {
            ProviderError::Throttled(detail)
        }
        Some(e) if e.is_resource_not_found_exception() => ProviderError::StreamNotFound(detail),
        _ => ProviderError::Transient(detail),
    }
}

pub fn classify_shard_iterator<R>(err: SdkError<GetShardIteratorError, R>) -> ProviderError
where
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(&err).to_string();
    match err.as_service_error() {
        Some(e) if e.is_provisioned_throughput_exceeded_exception() => {
            ProviderError::Throttled(detail)
        }
        Some(e) if e.is_resource_not_found_exception() => ProviderError::StreamNotFound(detail),
        _ => ProviderError::Transient(detail),
    }
}

pub fn classify_list_shards<R>(err: SdkError<ListShardsError, R>) -> ProviderError
where
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(&err).to_string();
    match err.as_service_error() {
        Some(e) if e.is_limit_exceeded_exception() => ProviderError::Throttled(detail),
        Some(e) if e.is_resource_not_found_exception() => ProviderError::StreamNotFound(detail),
        _ => ProviderError::Transient(detail),
    }
}
