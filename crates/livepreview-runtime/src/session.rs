//! Session actor: the single owner of a session's [`ConfigStore`].
//!
//! Seeding, inbound frames, transport signals and presence-grace fires all
//! arrive on one channel and are applied in order, so the document never
//! sees two writers.

use chrono::Utc;
use livepreview_core::store::ApplyOutcome;
use livepreview_core::{ConfigDocument, ConfigStore, Connectivity, PresenceInfo, UiEvent};
use livepreview_transport::{FrameSink, TokioScheduler};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};

use crate::emitter::UiEmitter;

#[derive(Debug)]
pub enum SessionCommand {
    /// Merge the bootstrap snapshot (no platform gate).
    Seed(Map<String, Value>),
    /// Make the preview surface visible and render the preview document.
    ShowSurface,
    Frame(String),
    Link(Connectivity),
    Inspect(oneshot::Sender<SessionView>),
}

/// Read-only copy of the session's state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub document: ConfigDocument,
    pub active: ConfigDocument,
    pub presence: PresenceInfo,
    pub surface_visible: bool,
}

/// Sender side of a session actor. The actor stops when every handle is
/// dropped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn spawn(store: ConfigStore, emitter: UiEmitter) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(store, emitter, rx));
        Self { tx }
    }

    pub fn seed(&self, snapshot: Map<String, Value>) {
        self.send(SessionCommand::Seed(snapshot));
    }

    pub fn show_surface(&self) {
        self.send(SessionCommand::ShowSurface);
    }

    /// Current state, or `None` once the actor has stopped.
    pub async fn inspect(&self) -> Option<SessionView> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Inspect(tx));
        rx.await.ok()
    }

    /// Transport-side sink feeding this session.
    pub fn frame_sink(&self) -> SessionSink {
        SessionSink(self.clone())
    }

    fn send(&self, command: SessionCommand) {
        if self.tx.send(command).is_err() {
            tracing::debug!("session actor gone, command dropped");
        }
    }
}

/// [`FrameSink`] that forwards into the session actor's queue.
#[derive(Debug, Clone)]
pub struct SessionSink(SessionHandle);

impl FrameSink for SessionSink {
    fn on_frame(&mut self, text: String) {
        self.0.send(SessionCommand::Frame(text));
    }

    fn on_link_signal(&mut self, signal: Connectivity) {
        self.0.send(SessionCommand::Link(signal));
    }
}

async fn run(
    mut store: ConfigStore,
    emitter: UiEmitter,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
) {
    let (mut scheduler, mut fired) = TokioScheduler::new();
    loop {
        tokio::select! {
            cmd = commands.recv() => {
                let Some(cmd) = cmd else { break };
                match cmd {
                    SessionCommand::Seed(snapshot) => store.seed(&snapshot),
                    SessionCommand::ShowSurface => {
                        store.set_surface_visible(true);
                        store.activate_if_live();
                        emitter.post(UiEvent::ShowLivePreviewScreen);
                    }
                    SessionCommand::Frame(text) => {
                        let (outcome, events) =
                            store.apply_inbound_frame(text.as_bytes(), Utc::now(), &mut scheduler);
                        if let ApplyOutcome::Applied { decision } = outcome {
                            tracing::debug!(%decision, events = events.len(), "frame applied");
                        }
                        emitter.post_all(events);
                    }
                    SessionCommand::Link(signal) => emitter.post(UiEvent::connectivity(signal)),
                    SessionCommand::Inspect(reply) => {
                        let _ = reply.send(SessionView {
                            document: store.document().clone(),
                            active: store.active().clone(),
                            presence: store.presence().clone(),
                            surface_visible: store.is_surface_visible(),
                        });
                    }
                }
            }
            Some(f) = fired.recv() => {
                if let Some(timer) = scheduler.accept(f) {
                    emitter.post_all(store.on_timer(timer));
                }
            }
        }
    }
    tracing::debug!("session actor stopped");
}
