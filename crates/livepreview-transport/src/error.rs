//! Error types for the realtime transport.

use thiserror::Error;

/// Coarse class of a failed outbound write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendErrorKind {
    /// The connection was cancelled or already closed underneath the write.
    Cancelled,
    Io,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?} send failure: {message}")]
pub struct SendError {
    pub kind: SendErrorKind,
    pub message: String,
}

impl SendError {
    pub fn new(kind: SendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error(transparent)]
    Send(#[from] SendError),

    #[error("invalid endpoint {0:?}: {1}")]
    InvalidEndpoint(String, String),

    #[error("unsupported endpoint scheme {0:?} (expected ws or wss)")]
    UnsupportedScheme(String),

    #[error("transport worker is gone")]
    WorkerGone,
}
