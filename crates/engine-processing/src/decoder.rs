use crate::error::DecodeError;
use model::records::record::DecodedPayload;
use tracing::warn;

/// Parses a record payload as UTF-8 JSON.
pub fn try_decode(raw: &[u8]) -> Result<DecodedPayload, DecodeError> {
    let text = std::str::from_utf8(raw)?;
    Ok(serde_json::from_str(text)?)
}

/// Like [`try_decode`], but reports the failure and yields `None`.
pub fn decode(raw: &[u8]) -> Option<DecodedPayload> {
    match try_decode(raw) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(error = %err, bytes = raw.len(), "Failed to decode record payload");
            None
        }
    }
}
