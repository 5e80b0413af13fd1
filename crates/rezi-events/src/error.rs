use thiserror::Error;

/// Errors raised while decoding an event batch off the wire.
///
/// A `Protocol` error means the batch was malformed in a way the decoder
/// could not recover from partway through; the caller discards the batch
/// and keeps polling rather than tearing down the backend.
#[derive(Debug, Error)]
pub enum EventsError {
    #[error("ZRUI_PROTOCOL_ERROR: {detail}")]
    Protocol { detail: String },
}

impl EventsError {
    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::Protocol { detail: detail.into() }
    }
}
