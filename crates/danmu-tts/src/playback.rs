//! Audio playback for synthesized speech.
//!
//! `rodio::OutputStream` is `!Send` on some platforms, so [`RodioPlayback`]
//! confines it to a dedicated OS thread and proxies commands over a channel.
//! Each [`PlaybackSink::play`] returns a [`PlaybackCompletion`] that resolves
//! when the clip drains or is stopped, which is how the worker serializes
//! playback.

use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::{Arc, mpsc};
use std::task::{Context, Poll};
use std::thread;

use bytes::Bytes;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::error::PlaybackError;

// ── Completion ─────────────────────────────────────────────────────

/// Resolves when a clip finishes, is stopped, or its sink goes away.
#[derive(Debug)]
pub struct PlaybackCompletion {
    rx: oneshot::Receiver<()>,
}

/// Sender half of a [`PlaybackCompletion`]. Dropping it also resolves the
/// completion.
#[derive(Debug)]
pub struct PlaybackSignal {
    tx: oneshot::Sender<()>,
}

impl PlaybackSignal {
    pub fn finish(self) {
        let _ = self.tx.send(());
    }
}

/// Create a linked signal/completion pair for a [`PlaybackSink`]
/// implementation.
pub fn completion_pair() -> (PlaybackSignal, PlaybackCompletion) {
    let (tx, rx) = oneshot::channel();
    (PlaybackSignal { tx }, PlaybackCompletion { rx })
}

impl Future for PlaybackCompletion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.rx).poll(cx).map(|_| ())
    }
}

// ── Sink trait ─────────────────────────────────────────────────────

/// Plays one encoded clip at a time.
#[cfg_attr(test, mockall::automock)]
pub trait PlaybackSink: Send + Sync {
    /// Start playing `audio`, replacing anything already playing.
    fn play(&self, audio: Bytes) -> Result<PlaybackCompletion, PlaybackError>;

    /// Stop playback immediately.
    fn stop(&self);
}

// ── rodio implementation ───────────────────────────────────────────

enum PlaybackCommand {
    Play {
        audio: Bytes,
        done: PlaybackSignal,
        reply: mpsc::Sender<Result<(), PlaybackError>>,
    },
    Stop,
    Shutdown,
}

/// `Send + Sync` handle to the audio thread that owns the output device.
pub struct RodioPlayback {
    cmd_tx: mpsc::Sender<PlaybackCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RodioPlayback {
    /// Spawn the audio thread and open the default output device.
    pub fn spawn() -> Result<Self, PlaybackError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<PlaybackCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), PlaybackError>>();

        let thread = thread::Builder::new()
            .name("danmu-audio".into())
            .spawn(move || Self::run(&cmd_rx, &init_tx))
            .map_err(|e| {
                PlaybackError::OutputUnavailable(format!("failed to spawn audio thread: {e}"))
            })?;

        init_rx.recv().map_err(|_| PlaybackError::AudioThreadDied)??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    fn run(
        cmd_rx: &mpsc::Receiver<PlaybackCommand>,
        init_tx: &mpsc::Sender<Result<(), PlaybackError>>,
    ) {
        let (_stream, handle) = match OutputStream::try_default() {
            Ok(output) => {
                let _ = init_tx.send(Ok(()));
                output
            }
            Err(e) => {
                let _ = init_tx.send(Err(PlaybackError::OutputUnavailable(e.to_string())));
                return;
            }
        };
        info!("Audio playback initialized on default output device");

        let mut current: Option<Arc<Sink>> = None;
        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                PlaybackCommand::Play { audio, done, reply } => {
                    stop_sink(&mut current);
                    let result = start_clip(&handle, audio, done).map(|sink| {
                        current = Some(sink);
                    });
                    let _ = reply.send(result);
                }
                PlaybackCommand::Stop => stop_sink(&mut current),
                PlaybackCommand::Shutdown => break,
            }
        }

        stop_sink(&mut current);
        debug!("Audio thread exiting");
    }
}

fn stop_sink(current: &mut Option<Arc<Sink>>) {
    if let Some(sink) = current.take() {
        sink.stop();
    }
}

fn start_clip(
    handle: &OutputStreamHandle,
    audio: Bytes,
    done: PlaybackSignal,
) -> Result<Arc<Sink>, PlaybackError> {
    let source =
        Decoder::new(Cursor::new(audio)).map_err(|e| PlaybackError::Decode(e.to_string()))?;
    let sink = Sink::try_new(handle).map_err(|e| PlaybackError::OutputUnavailable(e.to_string()))?;
    sink.append(source);
    let sink = Arc::new(sink);

    // sleep_until_end returns on drain or when stop() clears the queue.
    let watcher = Arc::clone(&sink);
    thread::spawn(move || {
        watcher.sleep_until_end();
        done.finish();
    });

    Ok(sink)
}

impl PlaybackSink for RodioPlayback {
    fn play(&self, audio: Bytes) -> Result<PlaybackCompletion, PlaybackError> {
        let (done, completion) = completion_pair();
        let (reply_tx, reply_rx) = mpsc::channel();
        self.cmd_tx
            .send(PlaybackCommand::Play {
                audio,
                done,
                reply: reply_tx,
            })
            .map_err(|_| PlaybackError::AudioThreadDied)?;
        reply_rx.recv().map_err(|_| PlaybackError::AudioThreadDied)??;
        Ok(completion)
    }

    fn stop(&self) {
        let _ = self.cmd_tx.send(PlaybackCommand::Stop);
    }
}

impl Drop for RodioPlayback {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(PlaybackCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
