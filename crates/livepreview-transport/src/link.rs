//! Seams between the transport worker and a concrete duplex link.
//!
//! The worker only ever talks to a [`Connector`]; production uses the
//! tokio-tungstenite implementation in [`crate::ws`], tests inject scripted
//! links.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::{SendError, TransportError};

/// What the reader half observed next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Text(String),
    Binary(Vec<u8>),
    /// The path is temporarily not viable.
    Waiting(String),
    /// The path became viable again after `Waiting`.
    Resumed,
    ReceiveError(String),
    /// Orderly or abrupt end of stream.
    Closed,
}

impl LinkEvent {
    /// Whether the reader is finished after this event.
    pub fn ends_stream(&self) -> bool {
        matches!(self, Self::ReceiveError(_) | Self::Closed)
    }
}

#[async_trait]
pub trait LinkReader: Send {
    async fn next_event(&mut self) -> LinkEvent;
}

#[async_trait]
pub trait LinkWriter: Send + Sync {
    async fn send_text(&self, text: String) -> Result<(), SendError>;

    async fn ping(&self) -> Result<(), SendError>;

    /// Whether the underlying path still looks usable.
    fn is_healthy(&self) -> bool;

    async fn close(&self);
}

/// An opened connection, split into its two halves.
pub struct Link {
    pub reader: Box<dyn LinkReader>,
    pub writer: Arc<dyn LinkWriter>,
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("healthy", &self.writer.is_healthy())
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, endpoint: &Url) -> Result<Link, TransportError>;
}

#[async_trait]
impl<T: Connector + ?Sized> Connector for Arc<T> {
    async fn open(&self, endpoint: &Url) -> Result<Link, TransportError> {
        (**self).open(endpoint).await
    }
}

/// Validate a realtime endpoint. Only `ws` and `wss` are accepted.
pub fn parse_endpoint(endpoint: &str) -> Result<Url, TransportError> {
    let url = Url::parse(endpoint)
        .map_err(|e| TransportError::InvalidEndpoint(endpoint.to_string(), e.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(TransportError::UnsupportedScheme(other.to_string())),
    }
}
