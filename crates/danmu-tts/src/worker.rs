//! Background synthesis worker.
//!
//! Consumes the [`SpeechQueue`] one item at a time: synthesize, play, wait
//! for playback to finish, repeat. Failures drop the item and the loop moves
//! on. Lifecycle follows the same supervisor shape as the gateway
//! connection: cancellation token, bounded grace on stop, then abort.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use danmu_core::{AppEvent, AppEventEmitter};

use crate::backend::SpeechBackend;
use crate::playback::PlaybackSink;
use crate::queue::{QueuedSpeech, SpeechQueue};

/// How often the worker re-checks a backend that is not ready.
pub const DEFAULT_IDLE_POLL: Duration = Duration::from_secs(1);

/// How long `stop()` waits for the loop before aborting it.
pub const DEFAULT_WORKER_STOP_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    pub idle_poll: Duration,
    pub stop_grace: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_poll: DEFAULT_IDLE_POLL,
            stop_grace: DEFAULT_WORKER_STOP_GRACE,
        }
    }
}

struct WorkerShared {
    queue: SpeechQueue,
    backend: Arc<dyn SpeechBackend>,
    sink: Arc<dyn PlaybackSink>,
    emitter: Arc<dyn AppEventEmitter>,
    config: WorkerConfig,
}

struct WorkerHandle {
    cancel_token: CancellationToken,
    join_handle: JoinHandle<()>,
}

/// Single consumer of the speech queue.
pub struct SynthesisWorker {
    shared: Arc<WorkerShared>,
    handle: Mutex<Option<WorkerHandle>>,
}

impl SynthesisWorker {
    pub fn new(
        queue: SpeechQueue,
        backend: Arc<dyn SpeechBackend>,
        sink: Arc<dyn PlaybackSink>,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        Self::with_config(queue, backend, sink, emitter, WorkerConfig::default())
    }

    pub fn with_config(
        queue: SpeechQueue,
        backend: Arc<dyn SpeechBackend>,
        sink: Arc<dyn PlaybackSink>,
        emitter: Arc<dyn AppEventEmitter>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(WorkerShared {
                queue,
                backend,
                sink,
                emitter,
                config,
            }),
            handle: Mutex::new(None),
        }
    }

    pub fn queue(&self) -> &SpeechQueue {
        &self.shared.queue
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.join_handle.is_finished())
    }

    /// Spawn the worker loop. Returns `false` if it is already running.
    pub async fn start(&self) -> bool {
        let mut guard = self.handle.lock().await;

        if let Some(old) = guard.take() {
            if !old.join_handle.is_finished() {
                *guard = Some(old);
                debug!("Synthesis worker already running");
                return false;
            }
        }

        let cancel_token = CancellationToken::new();
        let join_handle = tokio::spawn(run_loop(Arc::clone(&self.shared), cancel_token.clone()));

        *guard = Some(WorkerHandle {
            cancel_token,
            join_handle,
        });
        info!(backend = self.shared.backend.name(), "Synthesis worker started");
        true
    }

    /// Stop the worker and any playback in progress.
    ///
    /// Items still queued stay queued; the worker can be started again.
    pub async fn stop(&self) {
        let mut guard = self.handle.lock().await;

        let Some(handle) = guard.take() else {
            return;
        };

        info!("Stopping synthesis worker");
        handle.cancel_token.cancel();

        let mut join = handle.join_handle;
        match tokio::time::timeout(self.shared.config.stop_grace, &mut join).await {
            Ok(Ok(())) => info!("Synthesis worker stopped cleanly"),
            Ok(Err(join_err)) => error!("Synthesis worker task failed: {join_err}"),
            Err(_) => {
                warn!("Synthesis worker stop timed out; aborting task");
                join.abort();
                let _ = join.await;
            }
        }

        self.shared.sink.stop();
    }
}

impl fmt::Debug for SynthesisWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisWorker")
            .field("backend", &self.shared.backend.name())
            .field("queue", &self.shared.queue)
            .finish_non_exhaustive()
    }
}

async fn run_loop(shared: Arc<WorkerShared>, cancel: CancellationToken) {
    while !cancel.is_cancelled() {
        let ready = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            ready = shared.backend.is_ready() => ready,
        };

        if !ready {
            debug!("Backend not ready, waiting");
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(shared.config.idle_poll) => continue,
            }
        }

        let item = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = shared.queue.dequeue() => item,
        };

        speak(&shared, &item, &cancel).await;
    }
    debug!("Synthesis worker loop exited");
}

/// Synthesize and play one item, waiting for playback to end.
async fn speak(shared: &WorkerShared, item: &QueuedSpeech, cancel: &CancellationToken) {
    let text = item.text();
    if cancel.is_cancelled() {
        return;
    }

    debug!(text, "Synthesizing");
    shared.emitter.emit(AppEvent::SpeechStarted {
        text: text.to_string(),
    });

    let audio = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        audio = shared.backend.generate_audio(text) => audio,
    };

    let audio = match audio {
        Ok(audio) => audio,
        Err(e) => {
            error!(text, error = %e, "Synthesis failed");
            shared.emitter.emit(AppEvent::SynthesisFailed {
                text: text.to_string(),
                error: e.to_string(),
            });
            return;
        }
    };

    let completion = match shared.sink.play(audio) {
        Ok(completion) => completion,
        Err(e) => {
            error!(text, error = %e, "Playback failed");
            shared.emitter.emit(AppEvent::PlaybackFailed {
                text: text.to_string(),
                error: e.to_string(),
            });
            return;
        }
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            shared.sink.stop();
            return;
        }
        () = completion => {}
    }

    debug!(text, "Playback finished");
    shared.emitter.emit(AppEvent::SpeechFinished {
        text: text.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::EdgeBackend;
    use crate::error::{PlaybackError, SynthesisError};
    use crate::playback::testing::FakePlayback;
    use crate::playback::{MockPlaybackSink, completion_pair};
    use async_trait::async_trait;
    use bytes::Bytes;
    use danmu_core::{ChannelEmitter, NoopEmitter};
    use mockall::mock;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Returns the text as audio after a fixed delay.
    struct EchoBackend {
        ready: AtomicBool,
        delay: Duration,
        calls: StdMutex<Vec<String>>,
    }

    impl EchoBackend {
        fn new(delay: Duration) -> Self {
            Self {
                ready: AtomicBool::new(true),
                delay,
                calls: StdMutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SpeechBackend for EchoBackend {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        async fn generate_audio(&self, text: &str) -> Result<Bytes, SynthesisError> {
            self.calls.lock().unwrap().push(text.to_string());
            tokio::time::sleep(self.delay).await;
            Ok(Bytes::from(text.to_string()))
        }
    }

    mock! {
        Backend {}

        #[async_trait]
        impl SpeechBackend for Backend {
            fn name(&self) -> &'static str;
            async fn is_ready(&self) -> bool;
            async fn generate_audio(&self, text: &str) -> Result<Bytes, SynthesisError>;
        }
    }

    fn drain_events(rx: &mut UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_speaks_in_order_one_at_a_time() {
        let queue = SpeechQueue::new(5);
        let backend = Arc::new(EchoBackend::new(Duration::from_millis(100)));
        let sink = Arc::new(FakePlayback::new(Duration::from_secs(2)));
        let (emitter, mut rx) = ChannelEmitter::new();
        let worker = SynthesisWorker::new(queue.clone(), backend, sink.clone(), Arc::new(emitter));

        for text in ["a", "b", "c"] {
            queue.enqueue(text);
        }
        assert!(worker.start().await);
        queue.drain().await;
        worker.stop().await;

        assert_eq!(sink.played(), ["a", "b", "c"]);
        assert_eq!(sink.max_concurrent(), 1);

        let events = drain_events(&mut rx);
        assert_eq!(
            &events[..2],
            [
                AppEvent::SpeechStarted {
                    text: "a".to_string()
                },
                AppEvent::SpeechFinished {
                    text: "a".to_string()
                },
            ]
        );
        assert_eq!(events.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_synthesis() {
        let queue = SpeechQueue::new(5);
        let backend = Arc::new(EchoBackend::new(Duration::from_secs(1)));
        let sink = Arc::new(FakePlayback::new(Duration::from_secs(1)));
        let worker = SynthesisWorker::new(
            queue.clone(),
            backend.clone(),
            sink.clone(),
            Arc::new(NoopEmitter::new()),
        );

        for text in ["a", "b", "c"] {
            queue.enqueue(text);
        }
        worker.start().await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        worker.stop().await;
        assert!(!worker.is_running().await);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.calls(), ["a"]);
        assert!(sink.played().is_empty());
        assert_eq!(queue.snapshot(), ["b", "c"]);

        // Restartable; the remaining items are spoken
        assert!(worker.start().await);
        queue.drain().await;
        worker.stop().await;
        assert_eq!(sink.played(), ["b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_playback_silences_sink() {
        let queue = SpeechQueue::new(5);
        let backend = Arc::new(EchoBackend::new(Duration::ZERO));
        let sink = Arc::new(FakePlayback::new(Duration::from_secs(30)));
        let (emitter, mut rx) = ChannelEmitter::new();
        let worker =
            SynthesisWorker::new(queue.clone(), backend, sink.clone(), Arc::new(emitter));

        queue.enqueue("long clip");
        worker.start().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.played(), ["long clip"]);
        assert_eq!(sink.stops(), 0);

        worker.stop().await;
        assert!(sink.stops() >= 1);

        let events = drain_events(&mut rx);
        assert_eq!(
            events,
            [AppEvent::SpeechStarted {
                text: "long clip".to_string()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_edge_placeholder_reports_unsupported() {
        let queue = SpeechQueue::new(5);
        let backend = Arc::new(EdgeBackend::new().with_delay(Duration::from_millis(250)));
        let sink = Arc::new(FakePlayback::new(Duration::from_millis(10)));
        let (emitter, mut rx) = ChannelEmitter::new();
        let worker =
            SynthesisWorker::new(queue.clone(), backend, sink.clone(), Arc::new(emitter));

        queue.enqueue("hello");
        worker.start().await;
        let started = tokio::time::Instant::now();
        queue.drain().await;
        assert_eq!(started.elapsed(), Duration::from_millis(250));
        worker.stop().await;

        assert!(sink.played().is_empty());
        assert!(drain_events(&mut rx).contains(&AppEvent::SynthesisFailed {
            text: "hello".to_string(),
            error: SynthesisError::Unsupported("Edge").to_string(),
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_backend_ready() {
        let queue = SpeechQueue::new(5);
        let backend = Arc::new(EchoBackend::new(Duration::ZERO));
        backend.ready.store(false, Ordering::SeqCst);
        let sink = Arc::new(FakePlayback::new(Duration::from_millis(10)));
        let worker = SynthesisWorker::new(
            queue.clone(),
            backend.clone(),
            sink.clone(),
            Arc::new(NoopEmitter::new()),
        );

        worker.start().await;
        queue.enqueue("hello");
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(backend.calls().is_empty());
        assert_eq!(queue.len(), 1);

        backend.ready.store(true, Ordering::SeqCst);
        queue.drain().await;
        worker.stop().await;
        assert_eq!(sink.played(), ["hello"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthesis_failure_drops_item() {
        let queue = SpeechQueue::new(5);
        let mut backend = MockBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_is_ready().returning(|| true);
        backend.expect_generate_audio().returning(|text| {
            if text == "bad" {
                Err(SynthesisError::Server {
                    status: 500,
                    message: "boom".to_string(),
                })
            } else {
                Ok(Bytes::from(text.to_string()))
            }
        });
        let sink = Arc::new(FakePlayback::new(Duration::from_millis(10)));
        let (emitter, mut rx) = ChannelEmitter::new();
        let worker =
            SynthesisWorker::new(queue.clone(), Arc::new(backend), sink.clone(), Arc::new(emitter));

        queue.enqueue("bad");
        queue.enqueue("good");
        worker.start().await;
        queue.drain().await;
        worker.stop().await;

        assert_eq!(sink.played(), ["good"]);
        let events = drain_events(&mut rx);
        assert!(events.contains(&AppEvent::SynthesisFailed {
            text: "bad".to_string(),
            error: "Synthesis server returned 500: boom".to_string(),
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_failure_continues() {
        let queue = SpeechQueue::new(5);
        let backend = Arc::new(EchoBackend::new(Duration::ZERO));
        let mut sink = MockPlaybackSink::new();
        sink.expect_play()
            .withf(|audio: &Bytes| &audio[..] == b"corrupt")
            .times(1)
            .returning(|_| Err(PlaybackError::Decode("not a wav".to_string())));
        sink.expect_play()
            .withf(|audio: &Bytes| &audio[..] != b"corrupt")
            .times(1)
            .returning(|_| {
                let (done, completion) = completion_pair();
                done.finish();
                Ok(completion)
            });
        sink.expect_stop().return_const(());
        let (emitter, mut rx) = ChannelEmitter::new();
        let worker =
            SynthesisWorker::new(queue.clone(), backend, Arc::new(sink), Arc::new(emitter));

        queue.enqueue("corrupt");
        queue.enqueue("fine");
        worker.start().await;
        queue.drain().await;
        worker.stop().await;

        let events = drain_events(&mut rx);
        assert!(events.contains(&AppEvent::PlaybackFailed {
            text: "corrupt".to_string(),
            error: "Unsupported or corrupt audio: not a wav".to_string(),
        }));
        assert!(events.contains(&AppEvent::SpeechFinished {
            text: "fine".to_string()
        }));
    }

    #[tokio::test]
    async fn test_start_twice_and_stop_idle() {
        let worker = SynthesisWorker::new(
            SpeechQueue::new(1),
            Arc::new(EchoBackend::new(Duration::ZERO)),
            Arc::new(FakePlayback::new(Duration::ZERO)),
            Arc::new(NoopEmitter::new()),
        );
        worker.stop().await;
        assert!(worker.start().await);
        assert!(!worker.start().await);
        assert!(worker.is_running().await);
        worker.stop().await;
        assert!(!worker.is_running().await);
    }
}
