use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::messages::{LiveConfig, RealtimeInput, ServerMessage};

/// Events delivered by an open channel, in arrival order.
#[derive(Debug)]
pub enum ChannelEvent {
    /// The channel is ready; capture may begin
    Open,
    /// An inbound service frame
    Message(ServerMessage),
    /// The channel failed; terminal for the session
    Error(String),
    /// The channel closed without error
    Closed,
}

/// An open service channel.
#[async_trait::async_trait]
pub trait LiveChannel: Send + Sync {
    /// Forward one outbound realtime payload. Failures are per-payload; the
    /// channel stays usable.
    async fn send_realtime_input(&self, input: RealtimeInput) -> Result<()>;

    /// Close the channel. Closing an already-closed channel is a no-op.
    async fn close(&self) -> Result<()>;
}

/// Opens channels to the service.
#[async_trait::async_trait]
pub trait LiveConnector: Send + Sync {
    /// Connect to `model` with the given config, returning the channel handle
    /// and the event stream. `ChannelEvent::Open` arrives once the service
    /// has acknowledged setup.
    async fn connect(
        &self,
        model: &str,
        config: &LiveConfig,
    ) -> Result<(Arc<dyn LiveChannel>, mpsc::Receiver<ChannelEvent>)>;
}
