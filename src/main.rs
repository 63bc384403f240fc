use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use voice_live::{
    AudioBackendConfig, Config, CpalBackend, CpalSink, DeviceClock, SessionController,
    SessionEvent, WsConnector,
};

#[derive(Parser)]
#[command(name = "voice-live", about = "Realtime voice session engine")]
struct Args {
    /// Path to the configuration file (extension optional)
    #[arg(short, long, default_value = "config/voice-live")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;
    let session_cfg = cfg.session_config();

    info!("voice-live v0.1.0");
    info!("Model: {}", session_cfg.model);

    let backend = Box::new(CpalBackend::new(AudioBackendConfig {
        sample_rate: session_cfg.capture_sample_rate,
        channels: 1,
        frame_samples: session_cfg.frame_samples,
    }));
    let sink = Arc::new(CpalSink::new(session_cfg.playback_sample_rate)?);
    let connector = Arc::new(WsConnector::new(session_cfg.api_key.clone()));
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let controller = SessionController::new(
        session_cfg,
        backend,
        sink,
        Arc::new(DeviceClock::new()),
        connector,
        events_tx,
    );

    controller.start().await?;
    info!("Session started, press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                controller.stop().await;
                break;
            }
            event = events_rx.recv() => match event {
                Some(SessionEvent::StateChanged(state)) => {
                    println!("[state] {:?}", state);
                }
                Some(SessionEvent::Turn(turn)) => {
                    println!("[{:?}] {}", turn.role, turn.text);
                }
                Some(SessionEvent::Error { category, message }) => {
                    eprintln!("[error:{}] {}", category, message);
                }
                Some(SessionEvent::Volume(_)) => {}
                None => break,
            }
        }
    }

    Ok(())
}
