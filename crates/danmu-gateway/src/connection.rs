//! Auto-reconnecting gateway connection.
//!
//! `ChannelConnection` owns the connection task. It mirrors the supervisor
//! pattern used for other long-lived tasks: a cancellation token plus a join
//! handle behind an async mutex, a bounded grace period on stop, then abort.

use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use danmu_core::{
    AppEvent, AppEventEmitter, ChatEvent, ChatListener, ConnectionState, DEFAULT_GATEWAY_URL,
    GatewaySettings,
};

use crate::session::{self, SessionEnd};
use crate::transport::{Connector, WsConnector};

/// Fixed delay between connection attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How long `stop()` waits for the loop before aborting it.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// Configuration for the gateway connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// WebSocket URL of the gateway.
    pub url: String,
    /// Task ids sent in the subscribe command.
    pub task_ids: Vec<String>,
    /// Delay after a failure before reconnecting. Never grows.
    pub retry_delay: Duration,
    /// Grace period for `stop()`.
    pub stop_grace: Duration,
    /// RSocket keep-alive interval announced in SETUP.
    pub keepalive_interval: Duration,
    /// RSocket max lifetime announced in SETUP.
    pub max_lifetime: Duration,
    pub metadata_mime_type: String,
    pub data_mime_type: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            task_ids: Vec::new(),
            retry_delay: DEFAULT_RETRY_DELAY,
            stop_grace: DEFAULT_STOP_GRACE,
            keepalive_interval: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(24 * 60 * 60),
            metadata_mime_type: "application/json".to_string(),
            data_mime_type: "application/json".to_string(),
        }
    }
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>, task_ids: Vec<String>) -> Self {
        Self {
            url: url.into(),
            task_ids,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &GatewaySettings) -> Self {
        Self::new(settings.url.clone(), settings.task_ids.clone())
    }

    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    #[must_use]
    pub const fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }
}

// ── Shared state ───────────────────────────────────────────────────

/// State shared between the handle and the connection task.
pub(crate) struct Shared {
    pub(crate) config: ConnectionConfig,
    emitter: Arc<dyn AppEventEmitter>,
    listeners: RwLock<Vec<Arc<dyn ChatListener>>>,
    state: watch::Sender<ConnectionState>,
}

impl Shared {
    pub(crate) fn new(config: ConnectionConfig, emitter: Arc<dyn AppEventEmitter>) -> Self {
        Self {
            config,
            emitter,
            listeners: RwLock::new(Vec::new()),
            state: watch::Sender::new(ConnectionState::Disconnected),
        }
    }

    /// Record a transition and publish it. Every call emits, so repeated
    /// failures each produce their own `retrying`.
    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
        debug!(status = %state, "Gateway connection status");
        self.emitter.emit(AppEvent::connection_status(state));
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn add_listener(&self, listener: Arc<dyn ChatListener>) {
        self.listeners
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(listener);
    }

    /// Hand an accepted event to the emitter and every listener, in order.
    pub(crate) fn deliver(&self, event: &ChatEvent) {
        self.emitter.emit(AppEvent::ChatReceived {
            event: event.clone(),
        });
        // Snapshot so a listener may register another one without deadlocking.
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            listener.on_chat(event);
        }
    }
}

/// Handle to a running connection loop.
struct LoopHandle {
    cancel_token: CancellationToken,
    join_handle: JoinHandle<()>,
}

/// Long-lived, auto-reconnecting connection to the chat gateway.
///
/// # Example
///
/// ```ignore
/// let connection = ChannelConnection::new(config, emitter);
/// connection.add_listener(Arc::new(feeder));
/// connection.start().await;
/// // ...
/// connection.stop().await;
/// ```
pub struct ChannelConnection {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    handle: Mutex<Option<LoopHandle>>,
}

impl ChannelConnection {
    /// Create a connection that uses the WebSocket transport.
    pub fn new(config: ConnectionConfig, emitter: Arc<dyn AppEventEmitter>) -> Self {
        Self::with_connector(config, Arc::new(WsConnector), emitter)
    }

    /// Create a connection with a custom transport connector.
    pub fn with_connector(
        config: ConnectionConfig,
        connector: Arc<dyn Connector>,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared::new(config, emitter)),
            connector,
            handle: Mutex::new(None),
        }
    }

    /// Register a consumer for accepted chat events.
    pub fn add_listener(&self, listener: Arc<dyn ChatListener>) {
        self.shared.add_listener(listener);
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Watch connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }

    /// Whether the connection loop is running.
    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.join_handle.is_finished())
    }

    /// Launch the connection loop. Does nothing if it is already running.
    ///
    /// Returns `true` if a new loop was started.
    pub async fn start(&self) -> bool {
        let mut guard = self.handle.lock().await;

        if let Some(old) = guard.take() {
            if !old.join_handle.is_finished() {
                *guard = Some(old);
                debug!("Gateway connection already running");
                return false;
            }
        }

        let cancel_token = CancellationToken::new();
        let join_handle = tokio::spawn(run_loop(
            Arc::clone(&self.shared),
            Arc::clone(&self.connector),
            cancel_token.clone(),
        ));

        *guard = Some(LoopHandle {
            cancel_token,
            join_handle,
        });
        info!(url = %self.shared.config.url, "Gateway connection started");
        true
    }

    /// Stop the connection loop.
    ///
    /// Signals the loop, waits up to the grace period, then aborts it. Always
    /// ends in `Disconnected`; the connection can be started again afterwards.
    pub async fn stop(&self) {
        let mut guard = self.handle.lock().await;

        let Some(handle) = guard.take() else {
            return;
        };

        info!("Stopping gateway connection");
        handle.cancel_token.cancel();

        // Keep ownership of join_handle so we can abort on timeout
        let mut join = handle.join_handle;

        match tokio::time::timeout(self.shared.config.stop_grace, &mut join).await {
            Ok(Ok(())) => info!("Gateway connection stopped cleanly"),
            Ok(Err(join_err)) => error!("Gateway connection task failed: {join_err}"),
            Err(_) => {
                warn!("Gateway connection stop timed out; aborting task");
                join.abort();
                // Wait for the abort so no late status can follow Disconnected
                let _ = join.await;
            }
        }

        self.shared.set_state(ConnectionState::Disconnected);
    }
}

impl fmt::Debug for ChannelConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelConnection")
            .field("url", &self.shared.config.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Connect, run a session, and on any failure wait the fixed delay and retry.
async fn run_loop(shared: Arc<Shared>, connector: Arc<dyn Connector>, cancel: CancellationToken) {
    while !cancel.is_cancelled() {
        shared.set_state(ConnectionState::Connecting);

        let connected = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connector.connect(&shared.config.url) => result,
        };

        let outcome = match connected {
            Ok(mut transport) => {
                let outcome = session::run(&shared, transport.as_mut(), &cancel).await;
                transport.close().await;
                outcome
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(SessionEnd::Stopped) => break,
            Ok(SessionEnd::RemoteClosed(reason)) => {
                warn!(reason, "Gateway closed the channel");
            }
            Err(e) => error!(error = %e, "Gateway connection failed"),
        }

        shared.set_state(ConnectionState::Retrying);
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(shared.config.retry_delay) => {}
        }
    }
    debug!("Gateway connection loop exited");
}
