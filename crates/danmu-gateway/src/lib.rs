#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

mod connection;
mod error;
pub mod rsocket;
mod session;
pub mod transport;

pub use connection::{ChannelConnection, ConnectionConfig, DEFAULT_RETRY_DELAY, DEFAULT_STOP_GRACE};
pub use error::{ConnectionError, ConnectionResult};
pub use session::subscribe_payload;
pub use transport::{Connector, FrameTransport, WsConnector};
