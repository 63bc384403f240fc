//! Voice session management
//!
//! This module provides the `SessionController` abstraction that owns:
//! - Microphone capture and the capture encoder
//! - The live service channel
//! - Playback scheduling for synthesized speech
//! - Transcript accumulation per turn
//! - The session state machine and teardown

mod config;
mod controller;
mod error;
mod transcript;

pub use config::SessionConfig;
pub use controller::{SessionController, SessionEvent, SessionState};
pub use error::SessionError;
pub use transcript::{Role, TranscriptAccumulator, TranscriptTurn};
