//! Wire frame decoding for gateway chat events.

use serde_json::Value;

use crate::domain::ChatEvent;

/// Event type tag of chat messages. Every other type is ignored.
pub const DANMU_EVENT_TYPE: &str = "DANMU";

/// Errors from decoding a gateway frame.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Payload was not UTF-8 JSON.
    #[error("Malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// A `DANMU` event was missing a required field or had the wrong type.
    #[error("Invalid DANMU event: {0}")]
    InvalidEvent(#[source] serde_json::Error),
}

/// Decode one frame payload.
///
/// Returns `Ok(None)` for well-formed JSON that is not a `DANMU` event.
pub fn decode_frame(payload: &[u8]) -> Result<Option<ChatEvent>, DecodeError> {
    let value: Value = serde_json::from_slice(payload).map_err(DecodeError::Malformed)?;

    let is_danmu = value
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|kind| kind == DANMU_EVENT_TYPE);
    if !is_danmu {
        return Ok(None);
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(DecodeError::InvalidEvent)
}
