pub mod audio;
pub mod config;
pub mod live;
pub mod session;

pub use audio::{
    AnalysisTap, AudioBackend, AudioBackendConfig, AudioChunk, AudioFrame, AudioSink,
    ChunkDirection, Clock, CpalBackend, CpalSink, DeviceClock, PlaybackEvent, PlaybackScheduler,
    ScheduledChunk,
};
pub use config::Config;
pub use live::{ChannelEvent, LiveChannel, LiveConfig, LiveConnector, RealtimeInput, WsConnector};
pub use session::{
    Role, SessionConfig, SessionController, SessionError, SessionEvent, SessionState,
    TranscriptAccumulator, TranscriptTurn,
};
