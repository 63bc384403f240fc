use anyhow::Result;
use base64::Engine;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::config::SessionConfig;
use super::error::SessionError;
use super::transcript::{TranscriptAccumulator, TranscriptTurn};
use crate::audio::backend::{AudioBackend, AudioChunk};
use crate::audio::playback::{AudioSink, Clock, PlaybackEvent, PlaybackScheduler};
use crate::audio::{encoder, volume};
use crate::live::{ChannelEvent, LiveChannel, LiveConnector, ServerContent};

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Listening,
    Speaking,
    Error,
}

/// Everything the engine reports outward, in one stream.
///
/// This is the transcript sink, volume sink, state feed and error surface of
/// the UI collaborator.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
    Turn(TranscriptTurn),
    /// Input level in [0, 100]
    Volume(f32),
    Error {
        category: &'static str,
        message: String,
    },
}

/// Resources owned by one active session, created on `start()` and
/// invalidated (taken) on `stop()`. No field is read after invalidation.
struct SessionContext {
    channel: Arc<dyn LiveChannel>,
    scheduler: PlaybackScheduler,
    /// Cleared exactly when the input stream is released; the volume loop
    /// keys off it.
    stream_active: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

struct Inner {
    config: SessionConfig,
    backend: Mutex<Box<dyn AudioBackend>>,
    sink: Arc<dyn AudioSink>,
    clock: Arc<dyn Clock>,
    connector: Arc<dyn LiveConnector>,
    events: mpsc::UnboundedSender<SessionEvent>,
    state: StdMutex<SessionState>,
    ctx: Mutex<Option<SessionContext>>,
}

/// Owns the microphone, the speaker path, the service channel and the state
/// machine. The only entry and exit points for the whole engine are `start`
/// and `stop`.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        backend: Box<dyn AudioBackend>,
        sink: Arc<dyn AudioSink>,
        clock: Arc<dyn Clock>,
        connector: Arc<dyn LiveConnector>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                backend: Mutex::new(backend),
                sink,
                clock,
                connector,
                events,
                state: StdMutex::new(SessionState::Idle),
                ctx: Mutex::new(None),
            }),
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        *self.inner.state.lock().unwrap()
    }

    /// Number of scheduled or playing inbound chunks, 0 when no session is
    /// active.
    pub async fn active_playback(&self) -> usize {
        self.inner
            .ctx
            .lock()
            .await
            .as_ref()
            .map(|ctx| ctx.scheduler.active_len())
            .unwrap_or(0)
    }

    /// Start a session.
    ///
    /// A no-op when a session is already connecting or active. Terminal
    /// failures are published to the event sink, tear everything down and
    /// leave the state `Idle`.
    pub async fn start(&self) -> Result<(), SessionError> {
        if self.state() != SessionState::Idle {
            info!("start ignored, session already {:?}", self.state());
            return Ok(());
        }

        // Environment policy gate, probed before any state mutation or device
        // access: an insecure environment never leaves Idle.
        if !self.inner.backend.lock().await.capture_permitted() {
            let err = SessionError::InsecureContext;
            warn!("session start refused ({}): {}", err.category(), err);
            let _ = self.inner.events.send(SessionEvent::Error {
                category: err.category(),
                message: err.to_string(),
            });
            return Err(err);
        }

        // Check-and-claim in one lock scope so concurrent starts cannot both
        // pass the guard.
        {
            let mut state = self.inner.state.lock().unwrap();
            if *state != SessionState::Idle {
                info!("start ignored, session already {:?}", *state);
                return Ok(());
            }
            *state = SessionState::Connecting;
        }
        let _ = self
            .inner
            .events
            .send(SessionEvent::StateChanged(SessionState::Connecting));
        info!("Starting voice session {}", self.inner.config.session_id);

        let frames = match self.inner.backend.lock().await.start().await {
            Ok(rx) => rx,
            Err(e) => return self.fail(SessionError::Permission(e.to_string())).await,
        };

        if self.inner.config.api_key.is_empty() {
            return self
                .fail(SessionError::Configuration("missing API key".into()))
                .await;
        }
        if self.inner.config.model.is_empty() {
            return self
                .fail(SessionError::Configuration("missing model id".into()))
                .await;
        }

        let (channel, channel_rx) = match self
            .inner
            .connector
            .connect(&self.inner.config.model, &self.inner.config.live)
            .await
        {
            Ok(pair) => pair,
            Err(e) => return self.fail(SessionError::Network(e.to_string())).await,
        };

        let stream_active = Arc::new(AtomicBool::new(true));
        let (playback_tx, playback_rx) = mpsc::unbounded_channel();
        let scheduler = PlaybackScheduler::new(
            Arc::clone(&self.inner.clock),
            Arc::clone(&self.inner.sink),
            playback_tx,
        );

        // Hold the context slot across task spawn so a stop that races
        // session startup waits until the context is stored.
        let mut ctx = self.inner.ctx.lock().await;

        let tap = self.inner.backend.lock().await.analysis_tap();
        let volume_task = tokio::spawn(volume::run_monitor(
            tap,
            Arc::clone(&stream_active),
            self.inner.events.clone(),
        ));
        let loop_task = tokio::spawn(self.clone().run_events(
            channel_rx,
            playback_rx,
            frames,
            Arc::clone(&channel),
            scheduler.clone(),
        ));

        *ctx = Some(SessionContext {
            channel,
            scheduler,
            stream_active,
            tasks: vec![volume_task, loop_task],
        });

        Ok(())
    }

    /// Tear the session down.
    ///
    /// Safe to call zero, one or many times, from any number of concurrent
    /// triggers; each resource is released at most once and the state always
    /// ends `Idle`.
    pub async fn stop(&self) {
        let ctx = self.inner.ctx.lock().await.take();

        if let Some(ctx) = &ctx {
            ctx.stream_active.store(false, Ordering::SeqCst);
            if let Err(e) = ctx.channel.close().await {
                warn!("failed to close live channel: {}", e);
            }
            ctx.scheduler.interrupt();
        }

        if let Err(e) = self.inner.backend.lock().await.stop().await {
            warn!("failed to stop capture backend: {}", e);
        }
        if let Err(e) = self.inner.sink.stop() {
            warn!("failed to flush playback sink: {}", e);
        }

        self.set_state(SessionState::Idle);

        // Last: one of these tasks may be the current caller.
        if let Some(ctx) = ctx {
            info!("Voice session {} stopped", self.inner.config.session_id);
            for task in ctx.tasks {
                task.abort();
            }
        }
    }

    async fn fail(&self, err: SessionError) -> Result<(), SessionError> {
        warn!("session failed ({}): {}", err.category(), err);
        self.set_state(SessionState::Error);
        let _ = self.inner.events.send(SessionEvent::Error {
            category: err.category(),
            message: err.to_string(),
        });
        self.stop().await;
        Err(err)
    }

    fn set_state(&self, to: SessionState) {
        let changed = {
            let mut state = self.inner.state.lock().unwrap();
            if *state != to {
                info!("session state: {:?} -> {:?}", *state, to);
                *state = to;
                true
            } else {
                false
            }
        };
        if changed {
            let _ = self.inner.events.send(SessionEvent::StateChanged(to));
        }
    }

    /// Move to `to` only along an enumerated edge; anything else is a no-op
    /// that does not mutate state.
    fn set_state_if(&self, from: &[SessionState], to: SessionState) -> bool {
        let changed = {
            let mut state = self.inner.state.lock().unwrap();
            if from.contains(&*state) && *state != to {
                info!("session state: {:?} -> {:?}", *state, to);
                *state = to;
                true
            } else {
                false
            }
        };
        if changed {
            let _ = self.inner.events.send(SessionEvent::StateChanged(to));
        }
        changed
    }

    /// Single logical worker: every channel event and playback signal is
    /// serialized through this loop, so transcript and state mutation need no
    /// further locking.
    async fn run_events(
        self,
        mut channel_rx: mpsc::Receiver<ChannelEvent>,
        mut playback_rx: mpsc::UnboundedReceiver<PlaybackEvent>,
        frames: mpsc::Receiver<crate::audio::backend::AudioFrame>,
        channel: Arc<dyn LiveChannel>,
        scheduler: PlaybackScheduler,
    ) {
        let mut frames = Some(frames);
        let mut transcript = TranscriptAccumulator::new();

        loop {
            tokio::select! {
                event = channel_rx.recv() => match event {
                    Some(ChannelEvent::Open) => {
                        self.set_state_if(&[SessionState::Connecting], SessionState::Listening);
                        if let Some(frames) = frames.take() {
                            tokio::spawn(encoder::run_encoder(frames, Arc::clone(&channel)));
                        }
                    }
                    Some(ChannelEvent::Message(msg)) => {
                        if let Some(content) = msg.server_content {
                            self.handle_server_content(content, &mut transcript, &scheduler);
                        }
                    }
                    Some(ChannelEvent::Error(e)) => {
                        let err = SessionError::Network(e);
                        let _ = self.fail(err).await;
                        break;
                    }
                    Some(ChannelEvent::Closed) | None => {
                        self.stop().await;
                        break;
                    }
                },
                Some(PlaybackEvent::Drained) = playback_rx.recv() => {
                    self.set_state_if(&[SessionState::Speaking], SessionState::Listening);
                }
            }
        }
    }

    fn handle_server_content(
        &self,
        content: ServerContent,
        transcript: &mut TranscriptAccumulator,
        scheduler: &PlaybackScheduler,
    ) {
        if let Some(t) = &content.output_transcription {
            transcript.append_output(&t.text);
        }
        if let Some(t) = &content.input_transcription {
            transcript.append_input(&t.text);
        }

        if content.turn_complete {
            for turn in transcript.complete_turn() {
                let _ = self.inner.events.send(SessionEvent::Turn(turn));
            }
        }

        if let Some(audio) = content.inline_audio() {
            match base64::engine::general_purpose::STANDARD.decode(audio) {
                Ok(bytes) => {
                    let chunk =
                        AudioChunk::inbound(bytes, self.inner.config.playback_sample_rate, 1);
                    match scheduler.enqueue(chunk) {
                        Ok(_) => {
                            self.set_state_if(
                                &[SessionState::Listening, SessionState::Speaking],
                                SessionState::Speaking,
                            );
                        }
                        // Undecodable chunk: skip it, cursor and state untouched.
                        Err(e) => warn!("skipping undecodable audio chunk: {}", e),
                    }
                }
                Err(e) => warn!("skipping audio chunk with invalid base64: {}", e),
            }
        }

        if content.interrupted {
            scheduler.interrupt();
            self.set_state_if(
                &[SessionState::Speaking, SessionState::Listening],
                SessionState::Listening,
            );
        }
    }
}
