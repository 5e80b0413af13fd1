use thiserror::Error;

/// Errors a [`crate::Backend`] implementation can raise. Both correspond to
/// a concrete kind in §7: `Backend` failures are non-recoverable for the
/// session unless the consumer restarts the backend; `Protocol` wraps a
/// malformed event batch and is recoverable (the caller discards it and
/// keeps polling).
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("ZRUI_BACKEND_ERROR: {detail}")]
    Backend { detail: String },

    /// An event batch failed to decode; the code is already carried in the
    /// wrapped error's own `Display`.
    #[error(transparent)]
    EventProtocol(#[from] rezi_events::EventsError),

    /// A submitted drawlist buffer failed to parse; same code family as
    /// above, distinct source crate.
    #[error(transparent)]
    DrawlistProtocol(#[from] rezi_drawlist::ParseError),
}

impl TerminalError {
    pub fn backend(detail: impl Into<String>) -> Self {
        Self::Backend { detail: detail.into() }
    }
}

impl From<std::io::Error> for TerminalError {
    fn from(e: std::io::Error) -> Self {
        Self::backend(e.to_string())
    }
}
