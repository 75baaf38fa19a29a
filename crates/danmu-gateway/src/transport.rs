//! Transport abstraction for the gateway connection.
//!
//! The session driver only sees whole frames going in and out. The production
//! implementation is a WebSocket (one binary message per frame); tests plug in
//! channel-backed fakes.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::error::{ConnectionError, ConnectionResult};

/// Opens transports to the gateway.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> ConnectionResult<Box<dyn FrameTransport>>;
}

/// A connected, frame-oriented duplex channel.
#[async_trait]
pub trait FrameTransport: Send {
    /// Send one encoded frame.
    async fn send(&mut self, frame: Bytes) -> ConnectionResult<()>;

    /// Receive the next frame. `None` means the peer closed the transport.
    ///
    /// Must be cancel-safe: it is polled inside `select!`.
    async fn recv(&mut self) -> Option<ConnectionResult<Bytes>>;

    /// Close the transport. Errors are ignored.
    async fn close(&mut self);
}

// ============================================================================
// WebSocket Transport
// ============================================================================

/// Production connector using `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> ConnectionResult<Box<dyn FrameTransport>> {
        let (stream, response) =
            connect_async(url)
                .await
                .map_err(|e| ConnectionError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        debug!(url, status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WsTransport { stream }))
    }
}

struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameTransport for WsTransport {
    async fn send(&mut self, frame: Bytes) -> ConnectionResult<()> {
        self.stream
            .send(Message::Binary(frame.to_vec()))
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<ConnectionResult<Bytes>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Binary(data)) => return Some(Ok(Bytes::from(data))),
                Ok(Message::Text(text)) => {
                    debug!(len = text.len(), "Ignoring text WebSocket message");
                }
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "WebSocket closed by peer");
                    return None;
                }
                // Pings are answered by tungstenite itself
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => return Some(Err(ConnectionError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

// ============================================================================
// Fake Transport for Testing
// ============================================================================

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Notify, mpsc};

    /// Client side of an in-memory transport.
    pub struct FakeTransport {
        incoming: mpsc::UnboundedReceiver<ConnectionResult<Bytes>>,
        outgoing: mpsc::UnboundedSender<Bytes>,
    }

    /// Test-controlled peer of a [`FakeTransport`].
    pub struct FakePeer {
        pub to_client: mpsc::UnboundedSender<ConnectionResult<Bytes>>,
        pub from_client: mpsc::UnboundedReceiver<Bytes>,
    }

    impl FakePeer {
        pub fn send_frame(&self, frame: &crate::rsocket::Frame) {
            let _ = self.to_client.send(Ok(frame.encode()));
        }

        pub async fn next_frame(&mut self) -> crate::rsocket::Frame {
            let bytes = self
                .from_client
                .recv()
                .await
                .expect("client dropped transport");
            crate::rsocket::Frame::decode(bytes).expect("client sent invalid frame")
        }
    }

    pub fn transport_pair() -> (FakeTransport, FakePeer) {
        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        (
            FakeTransport { incoming, outgoing },
            FakePeer {
                to_client,
                from_client,
            },
        )
    }

    #[async_trait]
    impl FrameTransport for FakeTransport {
        async fn send(&mut self, frame: Bytes) -> ConnectionResult<()> {
            self.outgoing
                .send(frame)
                .map_err(|_| ConnectionError::Transport("peer gone".to_string()))
        }

        async fn recv(&mut self) -> Option<ConnectionResult<Bytes>> {
            self.incoming.recv().await
        }

        async fn close(&mut self) {
            self.incoming.close();
        }
    }

    /// Scripted outcome of one connection attempt.
    pub enum Attempt {
        Fail(String),
        Accept(FakeTransport),
    }

    /// Connector that replays scripted attempts, then hangs forever.
    #[derive(Default)]
    pub struct FakeConnector {
        script: Mutex<VecDeque<Attempt>>,
        attempts: AtomicUsize,
        notify: Notify,
    }

    impl FakeConnector {
        pub fn new(script: impl IntoIterator<Item = Attempt>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                ..Self::default()
            }
        }

        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        pub async fn wait_for_attempts(&self, n: usize) {
            loop {
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.attempts() >= n {
                    return;
                }
                notified.await;
            }
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn connect(&self, _url: &str) -> ConnectionResult<Box<dyn FrameTransport>> {
            let next = self.script.lock().unwrap().pop_front();
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.notify.notify_waiters();
            match next {
                Some(Attempt::Fail(reason)) => Err(ConnectionError::Connect {
                    url: "fake://gateway".to_string(),
                    reason,
                }),
                Some(Attempt::Accept(transport)) => Ok(Box::new(transport)),
                None => std::future::pending().await,
            }
        }
    }
}
