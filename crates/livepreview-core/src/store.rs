//! Config Store: the single writer of the preview configuration.
//!
//! Flow for one inbound socket frame:
//!
//! 1. Decode (malformed → logged, dropped).
//! 2. Presence frame → debounce roster, maybe emit connectivity.
//! 3. Content frame → platform gate → classify against the *active* config
//!    → merge → splice embedded assets → activate if live → UI events.
//!
//! Frames must be applied serially; the store is not `Sync`-shared, callers
//! own it from a single task.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::assets::extract_embedded_assets;
use crate::document::ConfigDocument;
use crate::events::UiEvent;
use crate::frame::{self, ContentFrame, InboundFrame};
use crate::impact::classify_impact;
use crate::presence::{DEFAULT_PRESENCE_GRACE_SECS, PresenceAction, PresenceTracker};
use crate::schedule::{Scheduler, Timer};
use crate::types::{ImpactDecision, Platform, PresenceInfo};

/// Tunables for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLimits {
    /// How long an empty roster must persist before it is reported.
    pub presence_grace: Duration,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            presence_grace: Duration::from_secs(DEFAULT_PRESENCE_GRACE_SECS),
        }
    }
}

/// Outcome of applying one inbound frame, for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Presence { peers: usize },
    Applied { decision: ImpactDecision },
    IgnoredPlatform { origin: Option<Platform> },
    Dropped,
}

#[derive(Debug)]
pub struct ConfigStore {
    platform: Platform,
    limits: StoreLimits,
    /// Pending preview document, mutated by every accepted patch.
    document: ConfigDocument,
    /// Configuration currently rendered by the host.
    active: ConfigDocument,
    surface_visible: bool,
    presence: PresenceTracker,
}

impl ConfigStore {
    /// `baseline` seeds the preview document; `active` is what the host is
    /// rendering right now (its app config until the preview goes live).
    pub fn new(baseline: ConfigDocument, active: ConfigDocument, platform: Platform) -> Self {
        Self {
            platform,
            limits: StoreLimits::default(),
            document: baseline,
            active,
            surface_visible: false,
            presence: PresenceTracker::new(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: StoreLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    pub fn active(&self) -> &ConfigDocument {
        &self.active
    }

    pub fn presence(&self) -> &PresenceInfo {
        self.presence.info()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn is_surface_visible(&self) -> bool {
        self.surface_visible
    }

    pub fn set_surface_visible(&mut self, visible: bool) {
        self.surface_visible = visible;
    }

    /// Merge the initial (non-socket) snapshot. Exempt from the platform
    /// gate; its `w2nHeader.images` is used for icon resolution.
    pub fn seed(&mut self, initial: &Map<String, Value>) {
        self.merge(initial);
        extract_embedded_assets(&mut self.document, initial);
        tracing::debug!(keys = initial.len(), "seeded preview document");
    }

    /// Top-level key overwrite.
    pub fn merge(&mut self, patch: &Map<String, Value>) {
        self.document.merge(patch);
    }

    /// Copy the preview document into the rendered slot when the preview
    /// surface is visible. Returns whether it did.
    pub fn activate_if_live(&mut self) -> bool {
        if self.surface_visible {
            self.active = self.document.clone();
        }
        self.surface_visible
    }

    /// Apply one inbound socket frame and return the UI events to post.
    pub fn apply_inbound_frame(
        &mut self,
        bytes: &[u8],
        now: DateTime<Utc>,
        scheduler: &mut dyn Scheduler,
    ) -> (ApplyOutcome, Vec<UiEvent>) {
        let decoded = match frame::decode(bytes) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("dropping inbound frame: {e}");
                return (ApplyOutcome::Dropped, Vec::new());
            }
        };

        match decoded {
            InboundFrame::Presence { peers } => {
                let events = self.observe_presence(peers.len(), now, scheduler);
                (ApplyOutcome::Presence { peers: peers.len() }, events)
            }
            InboundFrame::Content(content) => self.apply_content(content),
            InboundFrame::Unrecognized => {
                tracing::debug!("dropping unrecognized frame");
                (ApplyOutcome::Dropped, Vec::new())
            }
        }
    }

    /// A timer armed by this store fired.
    pub fn on_timer(&mut self, timer: Timer) -> Vec<UiEvent> {
        match timer {
            Timer::PresenceGrace => match self.presence.grace_elapsed() {
                Some(signal) => {
                    tracing::info!("peer roster stayed empty through grace window");
                    vec![UiEvent::connectivity(signal)]
                }
                None => Vec::new(),
            },
            Timer::Reconnect | Timer::Keepalive => Vec::new(),
        }
    }

    fn observe_presence(
        &mut self,
        peers: usize,
        now: DateTime<Utc>,
        scheduler: &mut dyn Scheduler,
    ) -> Vec<UiEvent> {
        let mut events = Vec::new();
        for action in self.presence.observe(peers, now) {
            match action {
                PresenceAction::ArmGrace => {
                    scheduler.arm(Timer::PresenceGrace, self.limits.presence_grace);
                }
                PresenceAction::CancelGrace => scheduler.cancel(Timer::PresenceGrace),
                PresenceAction::Emit(signal) => events.push(UiEvent::connectivity(signal)),
            }
        }
        events
    }

    fn apply_content(&mut self, content: ContentFrame) -> (ApplyOutcome, Vec<UiEvent>) {
        if content.origin != Some(self.platform) {
            tracing::debug!(origin = ?content.origin, "ignoring content frame for another platform");
            return (
                ApplyOutcome::IgnoredPlatform {
                    origin: content.origin,
                },
                Vec::new(),
            );
        }

        let decision = classify_impact(&content.patch, &self.active);
        self.merge(&content.patch);
        extract_embedded_assets(&mut self.document, &content.patch);
        let live = self.activate_if_live();
        tracing::info!(%decision, keys = content.patch.len(), live, "applied content patch");

        let mut events = Vec::new();
        if let Some(nav) = &content.navigate {
            events.push(UiEvent::SwitchScreenView {
                screen: nav.screen.clone(),
                reload: decision == ImpactDecision::Reload,
                closed_current_screen: nav.closed_current_screen,
            });
            if nav.is_loading_screen() {
                if let Some(loader) = content.patch.get("navigationLoader") {
                    let animation_url = loader
                        .get("animationJsonUrl")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    events.push(UiEvent::UpdateLoadingIndicator {
                        animation_url,
                        closed_current_screen: nav.closed_current_screen,
                    });
                }
            }
        }

        if live {
            match decision {
                ImpactDecision::Reload => events.push(UiEvent::WebToNativeApp {
                    restart_live_preview: true,
                }),
                ImpactDecision::Refresh => {
                    events.push(UiEvent::MainScreenPreviewHandler { refresh: true });
                }
                ImpactDecision::None => {}
            }
        }

        (ApplyOutcome::Applied { decision }, events)
    }
}
