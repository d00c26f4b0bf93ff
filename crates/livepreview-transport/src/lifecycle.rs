//! Connection lifecycle bookkeeping.
//!
//! Tracks the current [`ConnectionState`] together with the derived
//! failure counter. Every `Failed`/`Cancelled` entry counts one failure;
//! the counter reaching the threshold raises a single suspected-disconnect
//! signal, and the next `Ready` clears it with a `Connected` signal.
//! Pure: the worker applies the side effects.

use std::time::Duration;

use livepreview_core::{ConnectionState, Connectivity};

/// Delay before a reconnect attempt.
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 2;
/// Keepalive ping period while Ready.
pub const DEFAULT_KEEPALIVE_SECS: u64 = 7 * 60;
/// Consecutive failures before a suspected disconnect is reported.
pub const DEFAULT_SUSPECT_THRESHOLD: u32 = 5;

/// Transport tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub reconnect_delay: Duration,
    pub keepalive_period: Duration,
    pub suspect_threshold: u32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            keepalive_period: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            suspect_threshold: DEFAULT_SUSPECT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinkTracker {
    state: ConnectionState,
    consecutive_failures: u32,
    suspected: bool,
    threshold: u32,
}

impl LinkTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            state: ConnectionState::Idle,
            consecutive_failures: 0,
            suspected: false,
            threshold,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn is_suspected(&self) -> bool {
        self.suspected
    }

    /// Enter `next` and return the connectivity signal to escalate, if any.
    pub fn enter(&mut self, next: ConnectionState) -> Option<Connectivity> {
        let signal = match &next {
            ConnectionState::Ready => {
                self.consecutive_failures = 0;
                std::mem::take(&mut self.suspected).then_some(Connectivity::Connected)
            }
            ConnectionState::Failed(_) | ConnectionState::Cancelled => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                // exactly at the threshold: further failures stay silent
                if self.consecutive_failures == self.threshold {
                    self.suspected = true;
                    Some(Connectivity::SuspectedDisconnect)
                } else {
                    None
                }
            }
            ConnectionState::Idle | ConnectionState::Connecting | ConnectionState::Waiting(_) => {
                None
            }
        };
        self.state = next;
        signal
    }

    /// Replace the state without touching the counters.
    pub fn set_quiet(&mut self, next: ConnectionState) {
        self.state = next;
    }
}

impl Default for LinkTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SUSPECT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fail(t: &mut LinkTracker) -> Option<Connectivity> {
        t.enter(ConnectionState::Connecting);
        t.enter(ConnectionState::Failed("refused".into()))
    }

    #[test]
    fn fifth_failure_signals_once() {
        let mut t = LinkTracker::default();
        for _ in 0..4 {
            assert_eq!(fail(&mut t), None);
        }
        assert_eq!(fail(&mut t), Some(Connectivity::SuspectedDisconnect));
        assert!(t.is_suspected());
        for _ in 0..10 {
            assert_eq!(fail(&mut t), None);
        }
        assert_eq!(t.consecutive_failures(), 15);
    }

    #[test]
    fn ready_resets_and_reports_recovery() {
        let mut t = LinkTracker::new(2);
        fail(&mut t);
        fail(&mut t);
        assert_eq!(
            t.enter(ConnectionState::Ready),
            Some(Connectivity::Connected)
        );
        assert_eq!(t.consecutive_failures(), 0);
        assert!(!t.is_suspected());
        // plain Ready without prior suspicion is silent
        assert_eq!(t.enter(ConnectionState::Ready), None);
    }

    #[test]
    fn ready_below_threshold_is_silent() {
        let mut t = LinkTracker::default();
        fail(&mut t);
        fail(&mut t);
        assert_eq!(t.enter(ConnectionState::Ready), None);
        assert_eq!(t.consecutive_failures(), 0);
    }

    #[test]
    fn cancelled_counts_waiting_does_not() {
        let mut t = LinkTracker::default();
        t.enter(ConnectionState::Waiting("no network".into()));
        assert_eq!(t.consecutive_failures(), 0);
        t.enter(ConnectionState::Cancelled);
        assert_eq!(t.consecutive_failures(), 1);
        assert!(t.state().is_terminal());
    }

    #[test]
    fn set_quiet_leaves_counters() {
        let mut t = LinkTracker::default();
        fail(&mut t);
        t.set_quiet(ConnectionState::Cancelled);
        assert_eq!(t.consecutive_failures(), 1);
        assert_eq!(t.state(), &ConnectionState::Cancelled);
    }
}
