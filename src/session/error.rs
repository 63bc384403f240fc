use thiserror::Error;

/// Terminal session failures.
///
/// Every variant tears the session down; none is retried automatically.
/// Per-chunk decode failures and per-frame send failures are not errors at
/// this level; they are logged and skipped.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Capture is unavailable by environment policy; checked before any
    /// device is touched.
    #[error("secure audio capture is not available in this environment")]
    InsecureContext,

    /// The user (or platform) denied microphone access.
    #[error("microphone access denied: {0}")]
    Permission(String),

    /// The service channel failed while connecting or mid-session.
    #[error("service channel failure: {0}")]
    Network(String),

    /// Missing credential or model id.
    #[error("invalid session configuration: {0}")]
    Configuration(String),
}

impl SessionError {
    /// Stable category tag surfaced alongside the user-facing message.
    pub fn category(&self) -> &'static str {
        match self {
            SessionError::InsecureContext => "insecure_context",
            SessionError::Permission(_) => "permission",
            SessionError::Network(_) => "network",
            SessionError::Configuration(_) => "configuration",
        }
    }
}
