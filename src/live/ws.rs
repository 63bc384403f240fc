//! WebSocket connector for the production realtime endpoint.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use super::channel::{ChannelEvent, LiveChannel, LiveConnector};
use super::messages::{LiveConfig, RealtimeInput, ServerMessage};

const LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/\
    google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Inbound channel-event buffer; the session loop drains this continuously.
const EVENT_QUEUE_DEPTH: usize = 64;
/// Outbound payload buffer between `send_realtime_input` and the socket.
const SEND_QUEUE_DEPTH: usize = 64;

/// Connects to the live API over WebSocket and adapts the socket to the
/// `LiveChannel` / `ChannelEvent` interface the session engine consumes.
pub struct WsConnector {
    api_key: String,
}

impl WsConnector {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    fn setup_frame(model: &str, config: &LiveConfig) -> serde_json::Value {
        let mut setup = serde_json::json!({
            "model": format!("models/{}", model),
            "generationConfig": {
                "responseModalities": config.response_modalities,
                "speechConfig": {
                    "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": config.voice } }
                }
            },
        });
        if config.transcribe_input {
            setup["inputAudioTranscription"] = serde_json::json!({});
        }
        if config.transcribe_output {
            setup["outputAudioTranscription"] = serde_json::json!({});
        }
        if !config.system_instruction.is_empty() {
            setup["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": config.system_instruction }]
            });
        }
        serde_json::json!({ "setup": setup })
    }
}

#[async_trait::async_trait]
impl LiveConnector for WsConnector {
    async fn connect(
        &self,
        model: &str,
        config: &LiveConfig,
    ) -> Result<(Arc<dyn LiveChannel>, mpsc::Receiver<ChannelEvent>)> {
        let url = format!("{}?key={}", LIVE_ENDPOINT, self.api_key);
        let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
            .await
            .context("Failed to open live channel")?;
        info!("Live channel socket connected for model {}", model);

        let (mut write, mut read) = ws_stream.split();

        let setup = Self::setup_frame(model, config);
        write
            .send(WsMessage::Text(setup.to_string()))
            .await
            .context("Failed to send setup frame")?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (out_tx, mut out_rx) = mpsc::channel::<RealtimeInput>(SEND_QUEUE_DEPTH);
        let closing = Arc::new(Notify::new());

        // Writer task: forwards realtime payloads until closed.
        let writer_closing = Arc::clone(&closing);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = writer_closing.notified() => {
                        let _ = write.send(WsMessage::Close(None)).await;
                        break;
                    }
                    input = out_rx.recv() => match input {
                        Some(input) => {
                            let frame = serde_json::json!({ "realtimeInput": input });
                            if write.send(WsMessage::Text(frame.to_string())).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            let _ = write.send(WsMessage::Close(None)).await;
                            break;
                        }
                    }
                }
            }
            debug!("live channel writer finished");
        });

        // Reader task: maps socket frames onto channel events.
        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                let payload = match frame {
                    Ok(WsMessage::Text(text)) => text.into_bytes(),
                    Ok(WsMessage::Binary(bytes)) => bytes,
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = event_tx.send(ChannelEvent::Error(e.to_string())).await;
                        return;
                    }
                };
                match serde_json::from_slice::<ServerMessage>(&payload) {
                    Ok(msg) if msg.setup_complete.is_some() => {
                        if event_tx.send(ChannelEvent::Open).await.is_err() {
                            return;
                        }
                    }
                    Ok(msg) => {
                        if event_tx.send(ChannelEvent::Message(msg)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("unparseable frame from live channel: {}", e);
                    }
                }
            }
            let _ = event_tx.send(ChannelEvent::Closed).await;
            debug!("live channel reader finished");
        });

        let channel = WsChannel {
            out: out_tx,
            closing,
        };
        Ok((Arc::new(channel), event_rx))
    }
}

struct WsChannel {
    out: mpsc::Sender<RealtimeInput>,
    closing: Arc<Notify>,
}

#[async_trait::async_trait]
impl LiveChannel for WsChannel {
    async fn send_realtime_input(&self, input: RealtimeInput) -> Result<()> {
        self.out
            .send(input)
            .await
            .map_err(|_| anyhow::anyhow!("live channel is closed"))
    }

    async fn close(&self) -> Result<()> {
        // notify_one stores a permit, so a close that races the writer's
        // select still lands.
        self.closing.notify_one();
        Ok(())
    }
}
