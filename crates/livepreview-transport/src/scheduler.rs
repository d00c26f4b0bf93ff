//! Tokio-backed [`Scheduler`].
//!
//! Each armed timer is a spawned sleep that reports back over a channel.
//! Re-arming or cancelling aborts the old sleep and bumps an epoch, so a
//! fire that was already queued when it got replaced is rejected by
//! [`TokioScheduler::accept`].

use std::collections::HashMap;
use std::time::Duration;

use livepreview_core::{Scheduler, Timer};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// A timer fire as delivered to the owner's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub timer: Timer,
    epoch: u64,
}

#[derive(Debug)]
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<Fired>,
    pending: HashMap<Timer, (u64, AbortHandle)>,
    next_epoch: u64,
}

impl TokioScheduler {
    /// Create a scheduler and the receiver its fires arrive on. Must be
    /// used from within a tokio runtime.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Fired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tx,
            pending: HashMap::new(),
            next_epoch: 0,
        };
        (scheduler, rx)
    }

    /// Validate a fire. Returns the timer if it is still the armed instance.
    pub fn accept(&mut self, fired: Fired) -> Option<Timer> {
        match self.pending.get(&fired.timer) {
            Some((epoch, _)) if *epoch == fired.epoch => {
                self.pending.remove(&fired.timer);
                Some(fired.timer)
            }
            _ => {
                tracing::trace!(timer = ?fired.timer, "discarding stale timer fire");
                None
            }
        }
    }

    pub fn is_armed(&self, timer: Timer) -> bool {
        self.pending.contains_key(&timer)
    }
}

impl Scheduler for TokioScheduler {
    fn arm(&mut self, timer: Timer, after: Duration) {
        self.cancel(timer);
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // owner gone: nothing to notify
            let _ = tx.send(Fired { timer, epoch });
        });
        self.pending.insert(timer, (epoch, handle.abort_handle()));
    }

    fn cancel(&mut self, timer: Timer) {
        if let Some((_, handle)) = self.pending.remove(&timer) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, (_, handle)) in self.pending.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let (mut s, mut rx) = TokioScheduler::new();
        s.arm(Timer::Reconnect, Duration::from_secs(2));
        let fired = rx.recv().await.expect("fires");
        assert_eq!(s.accept(fired), Some(Timer::Reconnect));
        assert!(!s.is_armed(Timer::Reconnect));
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_rejects_the_replaced_fire() {
        let (mut s, mut rx) = TokioScheduler::new();
        s.arm(Timer::PresenceGrace, Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(2)).await;
        // the first fire is queued but a fresh arm supersedes it
        s.arm(Timer::PresenceGrace, Duration::from_secs(5));
        let stale = rx.recv().await.expect("queued fire");
        assert_eq!(s.accept(stale), None);
        assert!(s.is_armed(Timer::PresenceGrace));

        let fresh = rx.recv().await.expect("fresh fire");
        assert_eq!(s.accept(fresh), Some(Timer::PresenceGrace));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_fire() {
        let (mut s, mut rx) = TokioScheduler::new();
        s.arm(Timer::Keepalive, Duration::from_secs(1));
        s.cancel(Timer::Keepalive);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
