//! livepreview-transport: the realtime link behind a live preview session.
//!
//! One worker task per session serializes connect, receive, send, keepalive
//! and reconnect handling. See [`worker`] for the state machine.

pub mod error;
pub mod lifecycle;
pub mod link;
pub mod scheduler;
pub mod worker;
pub mod ws;

pub use error::{SendError, SendErrorKind, TransportError};
pub use lifecycle::{LinkTracker, TransportSettings};
pub use link::{Connector, Link, LinkEvent, LinkReader, LinkWriter, parse_endpoint};
pub use scheduler::{Fired, TokioScheduler};
pub use worker::{FrameSink, TransportHandle};
pub use ws::WsConnector;
