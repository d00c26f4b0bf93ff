//! Hands UI events to the rendering side.
//!
//! The emitter only forwards; the receiving end of the channel is the
//! UI-facing context. Restart and refresh events are held back for the
//! settle delay first.

use std::time::Duration;

use livepreview_core::UiEvent;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct UiEmitter {
    tx: mpsc::UnboundedSender<UiEvent>,
    settle_delay: Duration,
}

impl UiEmitter {
    pub fn channel(settle_delay: Duration) -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, settle_delay }, rx)
    }

    pub fn post(&self, event: UiEvent) {
        tracing::debug!(event = event.name(), "posting ui event");
        if event.needs_settle_delay() && !self.settle_delay.is_zero() {
            let tx = self.tx.clone();
            let delay = self.settle_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(event);
            });
        } else if self.tx.send(event).is_err() {
            tracing::debug!("ui receiver gone, event dropped");
        }
    }

    pub fn post_all(&self, events: impl IntoIterator<Item = UiEvent>) {
        for event in events {
            self.post(event);
        }
    }
}
