//! RSocket 1.0 frame encoding and decoding.
//!
//! Only the frames a channel requester needs are modelled. Over WebSocket each
//! binary message carries exactly one frame, so there is no length prefix.
//!
//! ```text
//! 0                   1                   2                   3
//! |0|                    Stream ID (31)                           |
//! |  Frame Type (6) |   Flags (10)    |  frame-specific body ...
//! ```

use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

// ── Frame types ────────────────────────────────────────────────────

const SETUP: u8 = 0x01;
const KEEPALIVE: u8 = 0x03;
const REQUEST_CHANNEL: u8 = 0x07;
const REQUEST_N: u8 = 0x08;
const CANCEL: u8 = 0x09;
const PAYLOAD: u8 = 0x0A;
const ERROR: u8 = 0x0B;

// ── Flags ──────────────────────────────────────────────────────────

const FLAG_METADATA: u16 = 0x100;
const FLAG_RESPOND: u16 = 0x080;
const FLAG_COMPLETE: u16 = 0x040;
const FLAG_NEXT: u16 = 0x020;
const FLAGS_MASK: u16 = 0x3FF;
const STREAM_ID_MASK: u32 = 0x7FFF_FFFF;
const POSITION_MASK: u64 = 0x7FFF_FFFF_FFFF_FFFF;

const HEADER_LEN: usize = 6;
const METADATA_LEN_BYTES: usize = 3;
const MAX_METADATA_LEN: usize = 0x00FF_FFFF;

/// Largest request-N value; a requester sending it never needs to top up.
pub const MAX_REQUEST_N: u32 = 0x7FFF_FFFF;

/// RSocket protocol version sent in SETUP.
const PROTOCOL_MAJOR: u16 = 1;
const PROTOCOL_MINOR: u16 = 0;

/// Errors from decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The frame ended before a required field.
    #[error("Truncated frame: needed {needed} more bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// A MIME type in SETUP was not ASCII / UTF-8.
    #[error("Invalid MIME type encoding in SETUP")]
    InvalidMimeType,
}

/// Metadata and data carried by request and payload frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    pub metadata: Option<Bytes>,
    pub data: Bytes,
}

impl Payload {
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            metadata: None,
            data: data.into(),
        }
    }
}

/// Connection setup parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setup {
    pub keepalive_interval: Duration,
    pub max_lifetime: Duration,
    pub metadata_mime_type: String,
    pub data_mime_type: String,
    pub payload: Payload,
}

/// A single RSocket frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Setup(Setup),
    Keepalive {
        respond: bool,
        last_received_position: u64,
        data: Bytes,
    },
    RequestChannel {
        stream_id: u32,
        initial_request_n: u32,
        complete: bool,
        payload: Payload,
    },
    RequestN {
        stream_id: u32,
        request_n: u32,
    },
    Cancel {
        stream_id: u32,
    },
    Payload {
        stream_id: u32,
        next: bool,
        complete: bool,
        payload: Payload,
    },
    Error {
        stream_id: u32,
        code: u32,
        message: String,
    },
    /// Any frame type this client does not act on (LEASE, METADATA_PUSH, ...).
    Other {
        stream_id: u32,
        frame_type: u8,
    },
}

impl Frame {
    /// Stream the frame belongs to. Connection-level frames use stream 0.
    pub const fn stream_id(&self) -> u32 {
        match self {
            Self::Setup(_) | Self::Keepalive { .. } => 0,
            Self::RequestChannel { stream_id, .. }
            | Self::RequestN { stream_id, .. }
            | Self::Cancel { stream_id }
            | Self::Payload { stream_id, .. }
            | Self::Error { stream_id, .. }
            | Self::Other { stream_id, .. } => *stream_id,
        }
    }

    /// Encode into a single transport message.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(64);
        match self {
            Self::Setup(setup) => {
                put_header(&mut buf, 0, SETUP, metadata_flag(&setup.payload));
                buf.put_u16(PROTOCOL_MAJOR);
                buf.put_u16(PROTOCOL_MINOR);
                buf.put_u32(duration_ms(setup.keepalive_interval));
                buf.put_u32(duration_ms(setup.max_lifetime));
                put_mime(&mut buf, &setup.metadata_mime_type);
                put_mime(&mut buf, &setup.data_mime_type);
                put_payload(&mut buf, &setup.payload);
            }
            Self::Keepalive {
                respond,
                last_received_position,
                data,
            } => {
                let flags = if *respond { FLAG_RESPOND } else { 0 };
                put_header(&mut buf, 0, KEEPALIVE, flags);
                buf.put_u64(*last_received_position & POSITION_MASK);
                buf.put_slice(data);
            }
            Self::RequestChannel {
                stream_id,
                initial_request_n,
                complete,
                payload,
            } => {
                let mut flags = metadata_flag(payload);
                if *complete {
                    flags |= FLAG_COMPLETE;
                }
                put_header(&mut buf, *stream_id, REQUEST_CHANNEL, flags);
                buf.put_u32(*initial_request_n & MAX_REQUEST_N);
                put_payload(&mut buf, payload);
            }
            Self::RequestN {
                stream_id,
                request_n,
            } => {
                put_header(&mut buf, *stream_id, REQUEST_N, 0);
                buf.put_u32(*request_n & MAX_REQUEST_N);
            }
            Self::Cancel { stream_id } => {
                put_header(&mut buf, *stream_id, CANCEL, 0);
            }
            Self::Payload {
                stream_id,
                next,
                complete,
                payload,
            } => {
                let mut flags = metadata_flag(payload);
                if *next {
                    flags |= FLAG_NEXT;
                }
                if *complete {
                    flags |= FLAG_COMPLETE;
                }
                put_header(&mut buf, *stream_id, PAYLOAD, flags);
                put_payload(&mut buf, payload);
            }
            Self::Error {
                stream_id,
                code,
                message,
            } => {
                put_header(&mut buf, *stream_id, ERROR, 0);
                buf.put_u32(*code);
                buf.put_slice(message.as_bytes());
            }
            Self::Other {
                stream_id,
                frame_type,
            } => {
                put_header(&mut buf, *stream_id, *frame_type, 0);
            }
        }
        buf.freeze()
    }

    /// Decode one transport message.
    pub fn decode(mut buf: Bytes) -> Result<Self, FrameError> {
        ensure(&buf, HEADER_LEN)?;
        let stream_id = buf.get_u32() & STREAM_ID_MASK;
        let type_and_flags = buf.get_u16();
        let frame_type = u8::try_from(type_and_flags >> 10).unwrap_or(u8::MAX);
        let flags = type_and_flags & FLAGS_MASK;
        let has_metadata = flags & FLAG_METADATA != 0;

        let frame = match frame_type {
            SETUP => {
                ensure(&buf, 12)?;
                let _major = buf.get_u16();
                let _minor = buf.get_u16();
                let keepalive_interval = Duration::from_millis(u64::from(buf.get_u32()));
                let max_lifetime = Duration::from_millis(u64::from(buf.get_u32()));
                let metadata_mime_type = get_mime(&mut buf)?;
                let data_mime_type = get_mime(&mut buf)?;
                Self::Setup(Setup {
                    keepalive_interval,
                    max_lifetime,
                    metadata_mime_type,
                    data_mime_type,
                    payload: get_payload(buf, has_metadata)?,
                })
            }
            KEEPALIVE => {
                ensure(&buf, 8)?;
                Self::Keepalive {
                    respond: flags & FLAG_RESPOND != 0,
                    last_received_position: buf.get_u64() & POSITION_MASK,
                    data: buf,
                }
            }
            REQUEST_CHANNEL => {
                ensure(&buf, 4)?;
                Self::RequestChannel {
                    stream_id,
                    initial_request_n: buf.get_u32() & MAX_REQUEST_N,
                    complete: flags & FLAG_COMPLETE != 0,
                    payload: get_payload(buf, has_metadata)?,
                }
            }
            REQUEST_N => {
                ensure(&buf, 4)?;
                Self::RequestN {
                    stream_id,
                    request_n: buf.get_u32() & MAX_REQUEST_N,
                }
            }
            CANCEL => Self::Cancel { stream_id },
            PAYLOAD => Self::Payload {
                stream_id,
                next: flags & FLAG_NEXT != 0,
                complete: flags & FLAG_COMPLETE != 0,
                payload: get_payload(buf, has_metadata)?,
            },
            ERROR => {
                ensure(&buf, 4)?;
                let code = buf.get_u32();
                Self::Error {
                    stream_id,
                    code,
                    message: String::from_utf8_lossy(&buf).into_owned(),
                }
            }
            other => Self::Other {
                stream_id,
                frame_type: other,
            },
        };
        Ok(frame)
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn put_header(buf: &mut BytesMut, stream_id: u32, frame_type: u8, flags: u16) {
    buf.put_u32(stream_id & STREAM_ID_MASK);
    buf.put_u16((u16::from(frame_type) << 10) | (flags & FLAGS_MASK));
}

const fn metadata_flag(payload: &Payload) -> u16 {
    if payload.metadata.is_some() {
        FLAG_METADATA
    } else {
        0
    }
}

fn put_payload(buf: &mut BytesMut, payload: &Payload) {
    if let Some(metadata) = &payload.metadata {
        let len = metadata.len().min(MAX_METADATA_LEN);
        // 24-bit big-endian length
        buf.put_uint(len as u64, METADATA_LEN_BYTES);
        buf.put_slice(&metadata[..len]);
    }
    buf.put_slice(&payload.data);
}

fn get_payload(mut buf: Bytes, has_metadata: bool) -> Result<Payload, FrameError> {
    let metadata = if has_metadata {
        ensure(&buf, METADATA_LEN_BYTES)?;
        let len = usize::try_from(buf.get_uint(METADATA_LEN_BYTES)).unwrap_or(usize::MAX);
        ensure(&buf, len)?;
        Some(buf.split_to(len))
    } else {
        None
    };
    Ok(Payload {
        metadata,
        data: buf,
    })
}

fn put_mime(buf: &mut BytesMut, mime: &str) {
    let bytes = mime.as_bytes();
    let len = bytes.len().min(usize::from(u8::MAX));
    buf.put_u8(u8::try_from(len).unwrap_or(u8::MAX));
    buf.put_slice(&bytes[..len]);
}

fn get_mime(buf: &mut Bytes) -> Result<String, FrameError> {
    ensure(buf, 1)?;
    let len = usize::from(buf.get_u8());
    ensure(buf, len)?;
    let raw = buf.split_to(len);
    String::from_utf8(raw.to_vec()).map_err(|_| FrameError::InvalidMimeType)
}

fn duration_ms(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis())
        .unwrap_or(u32::MAX)
        .min(MAX_REQUEST_N)
}

fn ensure(buf: &Bytes, needed: usize) -> Result<(), FrameError> {
    if buf.len() < needed {
        Err(FrameError::Truncated {
            needed,
            remaining: buf.len(),
        })
    } else {
        Ok(())
    }
}
