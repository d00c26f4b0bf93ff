//! livepreview-core: pure state for the live preview synchronization engine.
//! Holds the merged configuration document, decodes inbound frames,
//! classifies patch impact, debounces presence, and decides which UI events
//! to post. No IO, no async: callers pass time and a [`schedule::Scheduler`].

pub mod assets;
pub mod document;
pub mod events;
pub mod frame;
pub mod impact;
pub mod presence;
pub mod schedule;
pub mod store;
pub mod types;

pub use document::{ConfigDocument, LinkRule};
pub use events::UiEvent;
pub use frame::{FrameError, InboundFrame};
pub use impact::classify_impact;
pub use schedule::{ManualScheduler, Scheduler, Timer};
pub use store::{ConfigStore, StoreLimits};
pub use types::{ConnectionState, Connectivity, ImpactDecision, Platform, PresenceInfo};
