//! WebSocket [`Connector`] over tokio-tungstenite.
//!
//! This link never reports `Waiting`: tungstenite has no notion of a
//! temporarily unviable path, a dead socket surfaces as an error or close.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{SendError, SendErrorKind, TransportError};
use crate::link::{Connector, Link, LinkEvent, LinkReader, LinkWriter};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, endpoint: &Url) -> Result<Link, TransportError> {
        let (stream, _response) = tokio_tungstenite::connect_async(endpoint.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        tracing::debug!(host = endpoint.host_str().unwrap_or_default(), "websocket handshake complete");

        let (sink, stream) = stream.split();
        let healthy = Arc::new(AtomicBool::new(true));
        Ok(Link {
            reader: Box::new(WsReader {
                stream,
                healthy: Arc::clone(&healthy),
            }),
            writer: Arc::new(WsWriter {
                sink: Mutex::new(sink),
                healthy,
            }),
        })
    }
}

struct WsReader {
    stream: SplitStream<WsStream>,
    healthy: Arc<AtomicBool>,
}

#[async_trait]
impl LinkReader for WsReader {
    async fn next_event(&mut self) -> LinkEvent {
        loop {
            let event = match self.stream.next().await {
                Some(Ok(Message::Text(text))) => LinkEvent::Text(text),
                Some(Ok(Message::Binary(bytes))) => LinkEvent::Binary(bytes),
                Some(Ok(Message::Pong(_))) => {
                    tracing::debug!("pong received");
                    continue;
                }
                Some(Ok(Message::Ping(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "close frame received");
                    LinkEvent::Closed
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    LinkEvent::Closed
                }
                Some(Err(e)) => LinkEvent::ReceiveError(e.to_string()),
            };
            if event.ends_stream() {
                self.healthy.store(false, Ordering::Release);
            }
            return event;
        }
    }
}

struct WsWriter {
    sink: Mutex<SplitSink<WsStream, Message>>,
    healthy: Arc<AtomicBool>,
}

impl WsWriter {
    async fn write(&self, message: Message) -> Result<(), SendError> {
        let result = self.sink.lock().await.send(message).await;
        result.map_err(|e| {
            let err = classify_send_error(&e);
            if err.kind != SendErrorKind::Other {
                self.healthy.store(false, Ordering::Release);
            }
            err
        })
    }
}

#[async_trait]
impl LinkWriter for WsWriter {
    async fn send_text(&self, text: String) -> Result<(), SendError> {
        self.write(Message::Text(text)).await
    }

    async fn ping(&self) -> Result<(), SendError> {
        self.write(Message::Ping(Vec::new())).await
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    async fn close(&self) {
        self.healthy.store(false, Ordering::Release);
        if let Err(e) = self.sink.lock().await.close().await {
            tracing::debug!("websocket close: {e}");
        }
    }
}

fn classify_send_error(e: &WsError) -> SendError {
    let kind = match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => SendErrorKind::Cancelled,
        WsError::Io(_) => SendErrorKind::Io,
        _ => SendErrorKind::Other,
    };
    SendError::new(kind, e.to_string())
}
