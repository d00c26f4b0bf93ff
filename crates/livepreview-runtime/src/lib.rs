//! livepreview-runtime: wires the pure store and the transport worker into
//! a running live preview session.
//!
//! Bootstrap HTTP ([`api`]), the startup sequence ([`bootstrap`]), the
//! session actor that owns the Config Store ([`session`]), UI event
//! delivery ([`emitter`]) and the host-facing [`module`].

pub mod api;
pub mod bootstrap;
pub mod emitter;
pub mod error;
pub mod module;
pub mod session;
pub mod settings;

pub use api::{HttpPreviewApi, PreviewApi};
pub use bootstrap::Bootstrapper;
pub use emitter::UiEmitter;
pub use error::BootstrapError;
pub use module::{HostSignal, LivePreviewModule};
pub use session::{SessionHandle, SessionView};
pub use settings::PreviewSettings;
