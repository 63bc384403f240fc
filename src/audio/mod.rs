pub mod backend;
pub mod device;
pub mod encoder;
pub mod pcm;
pub mod playback;
pub mod volume;

pub use backend::{AudioBackend, AudioBackendConfig, AudioChunk, AudioFrame, ChunkDirection};
pub use device::{CpalBackend, CpalSink};
pub use playback::{AudioSink, Clock, DeviceClock, PlaybackEvent, PlaybackScheduler, ScheduledChunk};
pub use volume::AnalysisTap;
