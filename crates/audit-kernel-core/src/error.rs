//! Error types for the audit kernel core.

use thiserror::Error;

/// Core errors that can occur while constructing or encoding events.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("malformed event: {0}")]
    MalformedEvent(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::EncodingError(e.to_string())
    }
}

/// Schema-conformance errors: the record does not match the expected shape
/// for its declared type.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unsupported event version: {0}")]
    UnsupportedVersion(f64),

    #[error("payload for {event_type} does not match its declared shape: {detail}")]
    PayloadShape { event_type: String, detail: String },

    #[error("payload is an unresolved blob reference: {0}")]
    UnresolvedBlobRef(String),
}
