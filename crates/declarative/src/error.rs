//! Error types for translation and remote calls

use std::fmt::Display;
use thiserror::Error;

/// Local failure converting between snapshot and remote models
///
/// Always raised before any remote call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("could not parse {field}: {message}")]
    MalformedPayload { field: String, message: String },

    #[error("missing identifier `{0}`")]
    MissingIdentifier(&'static str),

    #[error("inconsistent fields: {0}")]
    Inconsistent(String),
}

impl TranslationError {
    pub fn malformed(field: impl Into<String>, err: impl Display) -> Self {
        Self::MalformedPayload {
            field: field.into(),
            message: err.to_string(),
        }
    }
}

/// Failure reported by a remote operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The entity has no backing remote record
    ///
    /// Not a failure: the lifecycle engine treats it as an alternate success
    /// path for read, update and delete.
    #[error("entity has no backing remote record")]
    Stateless,

    #[error("remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected remote response: {0}")]
    Protocol(String),

    #[error(transparent)]
    Translation(#[from] TranslationError),
}

impl RemoteError {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Stateless)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
