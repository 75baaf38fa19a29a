//! Gateway connection error types.

use crate::rsocket::FrameError;

/// Errors that end a gateway session. All of them lead to a retry.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The transport could not be opened.
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The transport failed while sending or receiving.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The peer sent bytes that are not a valid RSocket frame.
    #[error("Protocol error: {0}")]
    Frame(#[from] FrameError),

    /// The peer rejected the connection or the channel with an ERROR frame.
    #[error("Gateway error 0x{code:08X} on stream {stream_id}: {message}")]
    Rejected {
        stream_id: u32,
        code: u32,
        message: String,
    },

    /// The subscribe command could not be serialized.
    #[error("Failed to encode subscribe command: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result alias for gateway operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;
