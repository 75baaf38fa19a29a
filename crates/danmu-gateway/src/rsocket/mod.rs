//! Minimal RSocket requester-side protocol support.

mod frame;

pub use frame::{Frame, FrameError, MAX_REQUEST_N, Payload, Setup};

/// Stream id of the single channel a session opens. Client-initiated
/// streams use odd ids, starting at 1.
pub const CHANNEL_STREAM_ID: u32 = 1;
