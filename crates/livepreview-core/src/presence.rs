//! Presence roster debounce.
//!
//! An empty roster is only reported as a suspected disconnect after it has
//! stayed empty through a grace window. One report per empty episode; any
//! non-empty roster ends the episode and reports `Connected`.

use chrono::{DateTime, Utc};

use crate::types::{Connectivity, PresenceInfo};

/// Default grace window before an empty roster is reported.
pub const DEFAULT_PRESENCE_GRACE_SECS: u64 = 5;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No roster observed yet.
    #[default]
    Unknown,
    Populated,
    /// Empty, grace timer armed.
    PendingEmpty,
    /// Empty, suspected disconnect already reported.
    ReportedEmpty,
}

/// Side effect requested by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceAction {
    ArmGrace,
    CancelGrace,
    Emit(Connectivity),
}

#[derive(Debug, Default, Clone)]
pub struct PresenceTracker {
    info: PresenceInfo,
    phase: Phase,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self) -> &PresenceInfo {
        &self.info
    }

    /// Whether a grace timer is currently armed.
    pub fn is_pending(&self) -> bool {
        self.phase == Phase::PendingEmpty
    }

    /// Record a roster observation.
    pub fn observe(&mut self, peer_count: usize, now: DateTime<Utc>) -> Vec<PresenceAction> {
        self.info.active_peer_count = peer_count;

        if peer_count == 0 {
            return match self.phase {
                Phase::PendingEmpty | Phase::ReportedEmpty => Vec::new(),
                Phase::Unknown | Phase::Populated => {
                    self.phase = Phase::PendingEmpty;
                    self.info.pending_zero_since = Some(now);
                    vec![PresenceAction::ArmGrace]
                }
            };
        }

        let mut actions = Vec::with_capacity(2);
        if self.phase == Phase::PendingEmpty {
            actions.push(PresenceAction::CancelGrace);
        }
        self.phase = Phase::Populated;
        self.info.pending_zero_since = None;
        actions.push(PresenceAction::Emit(Connectivity::Connected));
        actions
    }

    /// The grace timer fired. Reports a suspected disconnect if the roster
    /// is still empty and this episode has not been reported yet.
    pub fn grace_elapsed(&mut self) -> Option<Connectivity> {
        if self.phase == Phase::PendingEmpty && self.info.active_peer_count == 0 {
            self.phase = Phase::ReportedEmpty;
            Some(Connectivity::SuspectedDisconnect)
        } else {
            None
        }
    }
}
