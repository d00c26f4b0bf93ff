//! Deferred-work scheduling.
//!
//! Every wait in the engine (presence grace, reconnect delay, keepalive) is
//! a named, cancellable deferred item. Arming a timer replaces any pending
//! item with the same name, so a stale item never fires alongside a fresh
//! one. [`ManualScheduler`] drives tests on virtual time.

use std::collections::BTreeMap;
use std::time::Duration;

/// Named deferred work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timer {
    PresenceGrace,
    Reconnect,
    Keepalive,
}

/// Arm/cancel interface. Firing is delivered back to the owner of the
/// scheduler, which decides what the fire means.
pub trait Scheduler {
    /// Arm `timer` to fire after `after`, replacing any pending instance.
    fn arm(&mut self, timer: Timer, after: Duration);

    /// Cancel `timer` if pending. Cancelling an idle timer is a no-op.
    fn cancel(&mut self, timer: Timer);
}

/// Virtual-time scheduler.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    now: Duration,
    pending: BTreeMap<Timer, Duration>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elapsed virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn is_armed(&self, timer: Timer) -> bool {
        self.pending.contains_key(&timer)
    }

    /// Deadline of `timer`, if armed.
    pub fn deadline(&self, timer: Timer) -> Option<Duration> {
        self.pending.get(&timer).copied()
    }

    /// Advance virtual time by `by`, returning fired timers in deadline order.
    pub fn advance(&mut self, by: Duration) -> Vec<Timer> {
        self.now += by;
        let now = self.now;
        let mut fired: Vec<(Duration, Timer)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(timer, deadline)| (*deadline, *timer))
            .collect();
        fired.sort();
        for (_, timer) in &fired {
            self.pending.remove(timer);
        }
        fired.into_iter().map(|(_, timer)| timer).collect()
    }
}

impl Scheduler for ManualScheduler {
    fn arm(&mut self, timer: Timer, after: Duration) {
        self.pending.insert(timer, self.now + after);
    }

    fn cancel(&mut self, timer: Timer) {
        self.pending.remove(&timer);
    }
}
