//! Bootstrap failures, reported once through the failure callback.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    #[error("missing session id: {0}")]
    MissingId(&'static str),

    #[error("network error: {0}")]
    Network(String),

    #[error("server responded with status {0}")]
    Server(u16),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("undecodable response: {0}")]
    Decode(String),
}

impl BootstrapError {
    /// Stable error kind handed to the host.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingId(_) => "ID_MISSING",
            Self::Network(_) => "NETWORK_ERROR",
            Self::Server(_) => "SERVER_ERROR",
            Self::InvalidUrl(_) => "INVALID_URL",
            Self::Decode(_) => "DECODE_ERROR",
        }
    }
}
