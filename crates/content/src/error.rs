//! Error types for the content crate

use thiserror::Error;

/// Errors that can occur while decoding or encoding payloads
#[derive(Error, Debug)]
pub enum Error {
    /// Payload text is not valid JSON
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload is valid JSON but its top level is not an object
    #[error("malformed payload: expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// Display encoding failed
    #[error("failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),
}

impl Error {
    /// Whether the error comes from bad input text rather than encoding
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::NotAnObject(_))
    }
}

/// Result type for content operations
pub type Result<T> = std::result::Result<T, Error>;
