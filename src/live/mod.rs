//! Service channel for the realtime conversational speech API
//!
//! The protocol is consumed, not reimplemented: this module defines the wire
//! message shapes, the channel traits the session engine talks through, and a
//! WebSocket connector for the production endpoint.

pub mod channel;
pub mod messages;
pub mod ws;

pub use channel::{ChannelEvent, LiveChannel, LiveConnector};
pub use messages::{
    InlineBlob, LiveConfig, MediaBlob, ModelTurn, Part, RealtimeInput, ServerContent,
    ServerMessage, Transcription,
};
pub use ws::WsConnector;
