//! One connected gateway session: handshake, subscribe, receive.

use bytes::Bytes;
use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use danmu_core::{ConnectionState, decode_frame};

use crate::connection::Shared;
use crate::error::{ConnectionError, ConnectionResult};
use crate::rsocket::{CHANNEL_STREAM_ID, Frame, MAX_REQUEST_N, Payload, Setup};
use crate::transport::FrameTransport;

/// Why a session ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    /// The stop signal fired.
    Stopped,
    /// The gateway completed or cancelled the channel, or closed the transport.
    RemoteClosed(&'static str),
}

/// Data section of the subscribe frame.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeCommand<'a> {
    task_ids: &'a [String],
    cmd: &'static str,
}

/// Encode the subscribe command for the given task ids.
pub fn subscribe_payload(task_ids: &[String]) -> Result<Bytes, serde_json::Error> {
    let command = SubscribeCommand {
        task_ids,
        cmd: "SUBSCRIBE",
    };
    serde_json::to_vec(&command).map(Bytes::from)
}

/// Drive one session over an open transport until stop, remote close or error.
pub(crate) async fn run(
    shared: &Shared,
    transport: &mut dyn FrameTransport,
    cancel: &CancellationToken,
) -> ConnectionResult<SessionEnd> {
    let config = &shared.config;

    let setup = Frame::Setup(Setup {
        keepalive_interval: config.keepalive_interval,
        max_lifetime: config.max_lifetime,
        metadata_mime_type: config.metadata_mime_type.clone(),
        data_mime_type: config.data_mime_type.clone(),
        payload: Payload::default(),
    });
    transport.send(setup.encode()).await?;
    shared.set_state(ConnectionState::Connected);
    info!(url = %config.url, "Connected to gateway");

    // Open the channel with unbounded credit; no REQUEST_N is ever sent after this.
    let request = Frame::RequestChannel {
        stream_id: CHANNEL_STREAM_ID,
        initial_request_n: MAX_REQUEST_N,
        complete: false,
        payload: Payload::default(),
    };
    transport.send(request.encode()).await?;

    let subscribe = subscribe_payload(&config.task_ids)?;
    let mut subscribed = false;

    let mut keepalive = tokio::time::interval_at(
        Instant::now() + config.keepalive_interval,
        config.keepalive_interval,
    );
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                let _ = transport
                    .send(Frame::Cancel { stream_id: CHANNEL_STREAM_ID }.encode())
                    .await;
                return Ok(SessionEnd::Stopped);
            }

            _ = keepalive.tick() => {
                let ping = Frame::Keepalive {
                    respond: true,
                    last_received_position: 0,
                    data: Bytes::new(),
                };
                transport.send(ping.encode()).await?;
            }

            received = transport.recv() => {
                let Some(received) = received else {
                    return Ok(SessionEnd::RemoteClosed("transport closed"));
                };
                let frame = Frame::decode(received?)?;

                match frame {
                    Frame::Keepalive { respond: true, data, .. } => {
                        let pong = Frame::Keepalive {
                            respond: false,
                            last_received_position: 0,
                            data,
                        };
                        transport.send(pong.encode()).await?;
                    }
                    Frame::RequestN { stream_id: CHANNEL_STREAM_ID, request_n } => {
                        if !subscribed {
                            debug!(request_n, task_ids = ?config.task_ids, "Sending subscribe command");
                            let command = Frame::Payload {
                                stream_id: CHANNEL_STREAM_ID,
                                next: true,
                                complete: false,
                                payload: Payload::from_data(subscribe.clone()),
                            };
                            transport.send(command.encode()).await?;
                            subscribed = true;
                        }
                    }
                    Frame::Payload { stream_id: CHANNEL_STREAM_ID, next, complete, payload } => {
                        if next {
                            dispatch(shared, &payload.data);
                        }
                        if complete {
                            return Ok(SessionEnd::RemoteClosed("channel completed"));
                        }
                    }
                    Frame::Cancel { stream_id: CHANNEL_STREAM_ID } => {
                        return Ok(SessionEnd::RemoteClosed("channel cancelled"));
                    }
                    Frame::Error { stream_id, code, message } => {
                        return Err(ConnectionError::Rejected { stream_id, code, message });
                    }
                    other => {
                        debug!(stream_id = other.stream_id(), ?other, "Ignoring frame");
                    }
                }
            }
        }
    }
}

/// Decode one channel payload and hand accepted events to consumers.
fn dispatch(shared: &Shared, data: &[u8]) {
    match decode_frame(data) {
        Ok(Some(event)) => shared.deliver(&event),
        Ok(None) => debug!("Ignoring non-DANMU gateway event"),
        Err(e) => warn!(error = %e, "Failed to decode gateway event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use danmu_core::{ChatEvent, NoopEmitter};

    use crate::connection::ConnectionConfig;
    use crate::transport::testing::{FakePeer, transport_pair};

    fn danmu(content: &str) -> Bytes {
        Bytes::from(
            serde_json::json!({
                "platform": "bilibili",
                "roomId": "7",
                "type": "DANMU",
                "msg": {
                    "badgeName": "", "badgeLevel": 0, "content": content,
                    "username": "carol", "userAvatar": ""
                }
            })
            .to_string(),
        )
    }

    fn next_payload(data: Bytes, complete: bool) -> Frame {
        Frame::Payload {
            stream_id: CHANNEL_STREAM_ID,
            next: true,
            complete,
            payload: Payload::from_data(data),
        }
    }

    fn shared_with_recorder() -> (Arc<Shared>, Arc<Mutex<Vec<ChatEvent>>>) {
        let config = ConnectionConfig::new("ws://gateway.test", vec!["room-1".to_string()])
            .with_keepalive_interval(Duration::from_secs(30));
        let shared = Arc::new(Shared::new(config, Arc::new(NoopEmitter::new())));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        shared.add_listener(Arc::new(move |event: &ChatEvent| {
            sink.lock().unwrap().push(event.clone());
        }));
        (shared, seen)
    }

    async fn expect_handshake(peer: &mut FakePeer) {
        assert!(matches!(peer.next_frame().await, Frame::Setup(_)));
        assert_eq!(
            peer.next_frame().await,
            Frame::RequestChannel {
                stream_id: CHANNEL_STREAM_ID,
                initial_request_n: MAX_REQUEST_N,
                complete: false,
                payload: Payload::default(),
            }
        );
    }

    #[test]
    fn test_subscribe_payload_shape() {
        let bytes = subscribe_payload(&["a".to_string(), "b".to_string()]).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, serde_json::json!({"taskIds": ["a", "b"], "cmd": "SUBSCRIBE"}));
    }

    #[tokio::test]
    async fn test_subscribes_once_credit_is_granted() {
        let (shared, _seen) = shared_with_recorder();
        let (mut transport, mut peer) = transport_pair();
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        let task_shared = Arc::clone(&shared);
        let session =
            tokio::spawn(async move { run(&task_shared, &mut transport, &task_cancel).await });

        expect_handshake(&mut peer).await;
        assert_eq!(shared.state(), ConnectionState::Connected);

        peer.send_frame(&Frame::RequestN {
            stream_id: CHANNEL_STREAM_ID,
            request_n: 1,
        });
        match peer.next_frame().await {
            Frame::Payload {
                stream_id,
                next,
                payload,
                ..
            } => {
                assert_eq!(stream_id, CHANNEL_STREAM_ID);
                assert!(next);
                let json: serde_json::Value = serde_json::from_slice(&payload.data).unwrap();
                assert_eq!(json["cmd"], "SUBSCRIBE");
                assert_eq!(json["taskIds"][0], "room-1");
            }
            other => panic!("expected subscribe payload, got {other:?}"),
        }

        // A second grant does not resend the command
        peer.send_frame(&Frame::RequestN {
            stream_id: CHANNEL_STREAM_ID,
            request_n: 8,
        });
        cancel.cancel();
        assert_eq!(
            peer.next_frame().await,
            Frame::Cancel {
                stream_id: CHANNEL_STREAM_ID
            }
        );
        assert_eq!(session.await.unwrap().unwrap(), SessionEnd::Stopped);
    }

    #[tokio::test]
    async fn test_forwards_only_danmu_events() {
        let (shared, seen) = shared_with_recorder();
        let (mut transport, mut peer) = transport_pair();
        let cancel = CancellationToken::new();

        let task_shared = Arc::clone(&shared);
        let session =
            tokio::spawn(async move { run(&task_shared, &mut transport, &cancel).await });
        expect_handshake(&mut peer).await;

        peer.send_frame(&next_payload(danmu("first"), false));
        peer.send_frame(&next_payload(Bytes::from_static(b"{\"type\":\"GIFT\"}"), false));
        peer.send_frame(&next_payload(Bytes::from_static(b"not json"), false));
        peer.send_frame(&next_payload(danmu("second"), true));

        assert_eq!(
            session.await.unwrap().unwrap(),
            SessionEnd::RemoteClosed("channel completed")
        );
        let contents: Vec<String> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.content.clone())
            .collect();
        assert_eq!(contents, ["first", "second"]);
    }

    #[tokio::test]
    async fn test_answers_server_keepalive() {
        let (shared, _seen) = shared_with_recorder();
        let (mut transport, mut peer) = transport_pair();
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        let session =
            tokio::spawn(async move { run(&shared, &mut transport, &task_cancel).await });
        expect_handshake(&mut peer).await;

        peer.send_frame(&Frame::Keepalive {
            respond: true,
            last_received_position: 0,
            data: Bytes::from_static(b"hb"),
        });
        assert_eq!(
            peer.next_frame().await,
            Frame::Keepalive {
                respond: false,
                last_received_position: 0,
                data: Bytes::from_static(b"hb"),
            }
        );

        cancel.cancel();
        assert_eq!(session.await.unwrap().unwrap(), SessionEnd::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_periodic_keepalive() {
        let (shared, _seen) = shared_with_recorder();
        let (mut transport, mut peer) = transport_pair();
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        let session =
            tokio::spawn(async move { run(&shared, &mut transport, &task_cancel).await });
        expect_handshake(&mut peer).await;

        let started = Instant::now();
        assert!(matches!(
            peer.next_frame().await,
            Frame::Keepalive { respond: true, .. }
        ));
        assert_eq!(started.elapsed(), Duration::from_secs(30));

        cancel.cancel();
        let _ = session.await;
    }

    #[tokio::test]
    async fn test_error_frame_fails_session() {
        let (shared, _seen) = shared_with_recorder();
        let (mut transport, mut peer) = transport_pair();
        let cancel = CancellationToken::new();

        let session =
            tokio::spawn(async move { run(&shared, &mut transport, &cancel).await });
        expect_handshake(&mut peer).await;

        peer.send_frame(&Frame::Error {
            stream_id: 0,
            code: 0x0000_0001,
            message: "invalid setup".to_string(),
        });
        assert!(matches!(
            session.await.unwrap(),
            Err(ConnectionError::Rejected { code: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_transport_close_ends_session() {
        let (shared, _seen) = shared_with_recorder();
        let (mut transport, mut peer) = transport_pair();
        let cancel = CancellationToken::new();

        let session =
            tokio::spawn(async move { run(&shared, &mut transport, &cancel).await });
        expect_handshake(&mut peer).await;
        drop(peer);

        assert_eq!(
            session.await.unwrap().unwrap(),
            SessionEnd::RemoteClosed("transport closed")
        );
    }
}
