// Integration tests for the session controller
//
// A mock backend, connector and channel stand in for the microphone and the
// service so the state machine can be driven deterministically.

use anyhow::{bail, Context, Result};
use base64::Engine;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use voice_live::audio::backend::{AudioBackend, AudioFrame};
use voice_live::audio::pcm::encode_pcm16;
use voice_live::audio::playback::AudioSink;
use voice_live::audio::AnalysisTap;
use voice_live::live::{ChannelEvent, LiveChannel, LiveConfig, LiveConnector, RealtimeInput};
use voice_live::{
    DeviceClock, Role, SessionConfig, SessionController, SessionError, SessionEvent, SessionState,
};

struct MockBackend {
    permitted: bool,
    frames_rx: Mutex<Option<mpsc::Receiver<AudioFrame>>>,
    tap: AnalysisTap,
    capturing: bool,
}

#[async_trait::async_trait]
impl AudioBackend for MockBackend {
    fn capture_permitted(&self) -> bool {
        self.permitted
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        match self.frames_rx.lock().unwrap().take() {
            Some(rx) => {
                self.capturing = true;
                Ok(rx)
            }
            None => bail!("capture already started"),
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn analysis_tap(&self) -> AnalysisTap {
        self.tap.clone()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Default)]
struct MockChannel {
    sent: Mutex<Vec<RealtimeInput>>,
    closed: AtomicBool,
}

#[async_trait::async_trait]
impl LiveChannel for MockChannel {
    async fn send_realtime_input(&self, input: RealtimeInput) -> Result<()> {
        self.sent.lock().unwrap().push(input);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MockConnector {
    channel: Arc<MockChannel>,
    events: Mutex<Option<mpsc::Receiver<ChannelEvent>>>,
    connects: AtomicUsize,
    fail: bool,
}

#[async_trait::async_trait]
impl LiveConnector for MockConnector {
    async fn connect(
        &self,
        _model: &str,
        _config: &LiveConfig,
    ) -> Result<(Arc<dyn LiveChannel>, mpsc::Receiver<ChannelEvent>)> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("connection refused");
        }
        let rx = self
            .events
            .lock()
            .unwrap()
            .take()
            .context("connector already consumed")?;
        Ok((Arc::clone(&self.channel) as Arc<dyn LiveChannel>, rx))
    }
}

struct NullSink;

impl AudioSink for NullSink {
    fn play(&self, _samples: Vec<i16>, _sample_rate: u32) -> Result<()> {
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        Ok(())
    }
}

struct Harness {
    controller: SessionController,
    server: mpsc::Sender<ChannelEvent>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    channel: Arc<MockChannel>,
    frames: mpsc::Sender<AudioFrame>,
    connector: Arc<MockConnector>,
}

fn harness(permitted: bool, api_key: &str, fail_connect: bool) -> Harness {
    let (frames_tx, frames_rx) = mpsc::channel(8);
    let (server_tx, server_rx) = mpsc::channel(16);
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let channel = Arc::new(MockChannel::default());
    let connector = Arc::new(MockConnector {
        channel: Arc::clone(&channel),
        events: Mutex::new(Some(server_rx)),
        connects: AtomicUsize::new(0),
        fail: fail_connect,
    });
    let backend = Box::new(MockBackend {
        permitted,
        frames_rx: Mutex::new(Some(frames_rx)),
        tap: AnalysisTap::new(),
        capturing: false,
    });

    let config = SessionConfig {
        api_key: api_key.to_string(),
        ..SessionConfig::default()
    };
    let controller = SessionController::new(
        config,
        backend,
        Arc::new(NullSink),
        Arc::new(DeviceClock::new()),
        Arc::clone(&connector) as Arc<dyn LiveConnector>,
        events_tx,
    );

    Harness {
        controller,
        server: server_tx,
        events: events_rx,
        channel,
        frames: frames_tx,
        connector,
    }
}

async fn wait_for_state(controller: &SessionController, want: SessionState) {
    for _ in 0..200 {
        if controller.state() == want {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("state never became {:?}, still {:?}", want, controller.state());
}

/// Start a session and drive it to Listening.
async fn listening_harness() -> Harness {
    let h = harness(true, "test-key", false);
    h.controller.start().await.unwrap();
    h.server.send(ChannelEvent::Open).await.unwrap();
    wait_for_state(&h.controller, SessionState::Listening).await;
    h
}

fn server_content(value: serde_json::Value) -> ChannelEvent {
    ChannelEvent::Message(serde_json::from_value(json!({ "serverContent": value })).unwrap())
}

fn server_audio(sample_count: usize) -> ChannelEvent {
    let bytes = encode_pcm16(&vec![0.1; sample_count]);
    let data = base64::engine::general_purpose::STANDARD.encode(bytes);
    server_content(json!({
        "modelTurn": { "parts": [{ "inlineData": {
            "data": data, "mimeType": "audio/pcm;rate=24000"
        }}]}
    }))
}

fn drain_events(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if !matches!(event, SessionEvent::Volume(_)) {
            out.push(event);
        }
    }
    out
}

#[tokio::test]
async fn test_insecure_environment_start_never_leaves_idle() {
    let mut h = harness(false, "test-key", false);

    let err = h.controller.start().await.unwrap_err();
    assert!(matches!(err, SessionError::InsecureContext));
    assert_eq!(h.controller.state(), SessionState::Idle);
    assert_eq!(h.connector.connects.load(Ordering::SeqCst), 0, "no connect attempt");

    let events = drain_events(&mut h.events);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::Error { category, .. } if *category == "insecure_context")),
        "policy failure must be surfaced"
    );
    assert!(
        !events.iter().any(|e| matches!(e, SessionEvent::StateChanged(_))),
        "a refused start publishes no state transitions at all"
    );
}

#[tokio::test]
async fn test_missing_api_key_is_configuration_failure() {
    let h = harness(true, "", false);

    let err = h.controller.start().await.unwrap_err();
    assert!(matches!(err, SessionError::Configuration(_)));
    assert_eq!(h.controller.state(), SessionState::Idle);
    assert_eq!(h.connector.connects.load(Ordering::SeqCst), 0, "no connect without credential");
}

#[tokio::test]
async fn test_connect_failure_is_network_failure() {
    let h = harness(true, "test-key", true);

    let err = h.controller.start().await.unwrap_err();
    assert!(matches!(err, SessionError::Network(_)));
    assert_eq!(h.controller.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_start_is_noop_while_active() {
    let h = listening_harness().await;

    h.controller.start().await.unwrap();

    assert_eq!(h.controller.state(), SessionState::Listening);
    assert_eq!(h.connector.connects.load(Ordering::SeqCst), 1, "second start must not reconnect");

    h.controller.stop().await;
}

#[tokio::test]
async fn test_open_acknowledgement_begins_listening() {
    let h = harness(true, "test-key", false);

    h.controller.start().await.unwrap();
    assert_eq!(h.controller.state(), SessionState::Connecting);

    h.server.send(ChannelEvent::Open).await.unwrap();
    wait_for_state(&h.controller, SessionState::Listening).await;

    h.controller.stop().await;
}

#[tokio::test]
async fn test_captured_frames_reach_the_channel() {
    let h = listening_harness().await;

    let frame = AudioFrame {
        samples: vec![0.25; 4096],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: 0,
    };
    h.frames.send(frame).await.unwrap();

    for _ in 0..200 {
        if !h.channel.sent.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let sent = h.channel.sent.lock().unwrap();
    assert_eq!(sent.len(), 1, "one frame in, one payload out");
    assert_eq!(sent[0].media.mime_type, "audio/pcm;rate=16000");
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&sent[0].media.data)
        .unwrap();
    assert_eq!(bytes.len(), 8192, "4096 samples become 8192 PCM16 bytes");
    drop(sent);

    h.controller.stop().await;
}

#[tokio::test]
async fn test_model_audio_drives_speaking_then_back_to_listening() {
    let h = listening_harness().await;

    // 20ms of speech at 24kHz
    h.server.send(server_audio(480)).await.unwrap();
    wait_for_state(&h.controller, SessionState::Speaking).await;
    assert!(h.controller.active_playback().await >= 1);

    // Natural completion drains the set and returns to Listening
    wait_for_state(&h.controller, SessionState::Listening).await;
    assert_eq!(h.controller.active_playback().await, 0);

    h.controller.stop().await;
}

#[tokio::test]
async fn test_barge_in_stops_playback_immediately() {
    let h = listening_harness().await;

    // One second of speech, then the user barges in mid-chunk
    h.server.send(server_audio(24000)).await.unwrap();
    wait_for_state(&h.controller, SessionState::Speaking).await;

    h.server.send(server_content(json!({ "interrupted": true }))).await.unwrap();
    wait_for_state(&h.controller, SessionState::Listening).await;
    assert_eq!(h.controller.active_playback().await, 0, "no handle survives barge-in");

    h.controller.stop().await;
}

#[tokio::test]
async fn test_malformed_audio_is_skipped_without_state_change() {
    let h = listening_harness().await;

    // Invalid base64
    h.server
        .send(server_content(json!({
            "modelTurn": { "parts": [{ "inlineData": { "data": "not base64!!!" } }] }
        })))
        .await
        .unwrap();
    // Valid base64 of an odd-length payload
    h.server
        .send(server_content(json!({
            "modelTurn": { "parts": [{ "inlineData": { "data": "AAEC" } }] }
        })))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.controller.state(), SessionState::Listening, "bad chunks change nothing");
    assert_eq!(h.controller.active_playback().await, 0);

    h.controller.stop().await;
}

#[tokio::test]
async fn test_turn_complete_emits_user_then_model() {
    let mut h = listening_harness().await;

    h.server
        .send(server_content(json!({ "outputTranscription": { "text": "hi, " } })))
        .await
        .unwrap();
    h.server
        .send(server_content(json!({ "inputTranscription": { "text": "hello" } })))
        .await
        .unwrap();
    h.server
        .send(server_content(json!({ "outputTranscription": { "text": "how can I help?" } })))
        .await
        .unwrap();
    h.server
        .send(server_content(json!({ "turnComplete": true })))
        .await
        .unwrap();

    let mut turns = Vec::new();
    for _ in 0..200 {
        for event in drain_events(&mut h.events) {
            if let SessionEvent::Turn(turn) = event {
                turns.push(turn);
            }
        }
        if turns.len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].text, "hello");
    assert_eq!(turns[1].role, Role::Model);
    assert_eq!(turns[1].text, "hi, how can I help?");

    h.controller.stop().await;
}

#[tokio::test]
async fn test_empty_turn_emits_no_records() {
    let mut h = listening_harness().await;

    h.server
        .send(server_content(json!({ "turnComplete": true })))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let turns: Vec<_> = drain_events(&mut h.events)
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::Turn(_)))
        .collect();
    assert!(turns.is_empty(), "an empty turn produces no transcript records");

    h.controller.stop().await;
}

#[tokio::test]
async fn test_stop_is_idempotent_under_concurrency() {
    let h = listening_harness().await;

    tokio::join!(h.controller.stop(), h.controller.stop());
    h.controller.stop().await;

    assert_eq!(h.controller.state(), SessionState::Idle);
    assert!(h.channel.closed.load(Ordering::SeqCst), "channel closed on teardown");
    assert_eq!(h.controller.active_playback().await, 0);
}

#[tokio::test]
async fn test_server_close_tears_the_session_down() {
    let h = listening_harness().await;

    h.server.send(ChannelEvent::Closed).await.unwrap();
    wait_for_state(&h.controller, SessionState::Idle).await;
}

#[tokio::test]
async fn test_channel_error_is_terminal() {
    let mut h = listening_harness().await;

    h.server
        .send(ChannelEvent::Error("socket reset".to_string()))
        .await
        .unwrap();
    wait_for_state(&h.controller, SessionState::Idle).await;

    let events = drain_events(&mut h.events);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::Error { category, .. } if *category == "network")),
        "mid-session channel failure must be surfaced"
    );
}
