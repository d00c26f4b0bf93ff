//! Realtime transport worker.
//!
//! A single task owns the connection handle, the reconnect timer and the
//! keepalive timer. Callers hold a [`TransportHandle`] and only enqueue
//! commands; link IO (open, read, write) runs in helper tasks that report
//! back to the worker tagged with the link generation they belong to, so
//! results from a torn-down link are discarded.
//!
//! ```text
//! Idle → Connecting → Ready ⇄ Waiting → Failed | Cancelled
//!                       ↑                      │
//!                       └── reconnect (2s) ────┘   unless owner disconnected
//! ```

use std::sync::Arc;

use livepreview_core::{ConnectionState, Connectivity, Scheduler, Timer};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::error::{SendError, SendErrorKind, TransportError};
use crate::lifecycle::{LinkTracker, TransportSettings};
use crate::link::{Connector, Link, LinkEvent, LinkWriter, parse_endpoint};
use crate::scheduler::{Fired, TokioScheduler};

/// Receives inbound text frames and connectivity escalations. Called
/// synchronously on the worker task, so frames arrive strictly in order.
pub trait FrameSink: Send + 'static {
    fn on_frame(&mut self, text: String);

    fn on_link_signal(&mut self, signal: Connectivity);
}

#[derive(Debug)]
enum Command {
    Connect(Url),
    Disconnect { owner_initiated: bool },
    SendText(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outbound {
    Text,
    Ping,
}

enum Internal {
    Opened {
        generation: u64,
        result: Result<Link, TransportError>,
    },
    Event {
        generation: u64,
        event: LinkEvent,
    },
    Sent {
        generation: u64,
        what: Outbound,
        result: Result<(), SendError>,
    },
}

enum Slot {
    Empty,
    Opening {
        generation: u64,
    },
    Live {
        generation: u64,
        writer: Arc<dyn LinkWriter>,
        reader: JoinHandle<()>,
    },
}

impl Slot {
    fn generation(&self) -> Option<u64> {
        match self {
            Self::Empty => None,
            Self::Opening { generation } | Self::Live { generation, .. } => Some(*generation),
        }
    }
}

/// Cloneable front end of the transport worker. The worker stops once
/// every handle is dropped.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl TransportHandle {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn<C, S>(connector: C, sink: S, settings: TransportSettings) -> Self
    where
        C: Connector,
        S: FrameSink,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Idle);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (scheduler, fired_rx) = TokioScheduler::new();

        let worker = Worker {
            connector: Arc::new(connector),
            sink,
            tracker: LinkTracker::new(settings.suspect_threshold),
            settings,
            endpoint: None,
            auto_reconnect: false,
            slot: Slot::Empty,
            next_generation: 0,
            scheduler,
            internal_tx,
            state_tx,
        };
        tokio::spawn(worker.run(command_rx, internal_rx, fired_rx));
        Self { commands, state }
    }

    /// Connect to `endpoint`. A no-op while a connection already exists.
    /// Non-websocket endpoints are rejected without touching the worker.
    pub fn connect(&self, endpoint: &str) -> Result<(), TransportError> {
        let url = parse_endpoint(endpoint)?;
        self.send(Command::Connect(url))
    }

    /// Tear the connection down. `owner_initiated` also disables
    /// auto-reconnect until the next [`connect`](Self::connect).
    pub fn disconnect(&self, owner_initiated: bool) -> Result<(), TransportError> {
        self.send(Command::Disconnect { owner_initiated })
    }

    /// Fire-and-forget text send.
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.send(Command::SendText(text.into()))
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    fn send(&self, command: Command) -> Result<(), TransportError> {
        self.commands
            .send(command)
            .map_err(|_| TransportError::WorkerGone)
    }
}

struct Worker<C, S> {
    connector: Arc<C>,
    sink: S,
    settings: TransportSettings,
    tracker: LinkTracker,
    endpoint: Option<Url>,
    auto_reconnect: bool,
    slot: Slot,
    next_generation: u64,
    scheduler: TokioScheduler,
    internal_tx: mpsc::UnboundedSender<Internal>,
    state_tx: watch::Sender<ConnectionState>,
}

impl<C: Connector, S: FrameSink> Worker<C, S> {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
        mut fired: mpsc::UnboundedReceiver<Fired>,
    ) {
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.on_command(cmd),
                    None => break,
                },
                Some(msg) = internal.recv() => self.on_internal(msg),
                Some(f) = fired.recv() => {
                    if let Some(timer) = self.scheduler.accept(f) {
                        self.on_timer(timer);
                    }
                }
            }
        }
        tracing::debug!("transport handles dropped, worker exiting");
        self.auto_reconnect = false;
        self.teardown();
    }

    // ─── Commands ─────────────────────────────────────────────────

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect(url) => self.connect(url),
            Command::Disconnect { owner_initiated } => self.disconnect(owner_initiated),
            Command::SendText(text) => self.send_text(text),
        }
    }

    fn connect(&mut self, url: Url) {
        self.scheduler.cancel(Timer::Reconnect);
        self.auto_reconnect = true;
        self.endpoint = Some(url);
        if let Some(generation) = self.slot.generation() {
            tracing::debug!(generation, "connect ignored: connection already exists");
            return;
        }
        self.open();
    }

    fn disconnect(&mut self, owner_initiated: bool) {
        self.scheduler.cancel(Timer::Reconnect);
        if owner_initiated {
            self.auto_reconnect = false;
            self.teardown();
            self.tracker.set_quiet(ConnectionState::Cancelled);
            self.publish_state();
            tracing::info!("transport disconnected by owner");
        } else {
            self.link_lost(ConnectionState::Cancelled);
        }
    }

    fn send_text(&mut self, text: String) {
        let Slot::Live {
            generation, writer, ..
        } = &self.slot
        else {
            tracing::warn!(bytes = text.len(), "dropping outbound text: no live connection");
            return;
        };
        let (generation, writer) = (*generation, Arc::clone(writer));
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = writer.send_text(text).await;
            let _ = tx.send(Internal::Sent {
                generation,
                what: Outbound::Text,
                result,
            });
        });
    }

    // ─── Link lifecycle ───────────────────────────────────────────

    fn open(&mut self) {
        let Some(url) = self.endpoint.clone() else {
            return;
        };
        self.next_generation += 1;
        let generation = self.next_generation;
        self.slot = Slot::Opening { generation };
        self.enter(ConnectionState::Connecting);
        tracing::info!(generation, host = url.host_str().unwrap_or_default(), "opening realtime link");

        let connector = Arc::clone(&self.connector);
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = connector.open(&url).await;
            let _ = tx.send(Internal::Opened { generation, result });
        });
    }

    fn on_internal(&mut self, msg: Internal) {
        match msg {
            Internal::Opened { generation, result } => self.on_opened(generation, result),
            Internal::Event { generation, event } => {
                if self.is_live(generation) {
                    self.on_link_event(event);
                }
            }
            Internal::Sent {
                generation,
                what,
                result,
            } => {
                if let Err(e) = result {
                    self.on_send_error(generation, what, e);
                }
            }
        }
    }

    fn on_opened(&mut self, generation: u64, result: Result<Link, TransportError>) {
        if !matches!(self.slot, Slot::Opening { generation: g } if g == generation) {
            tracing::debug!(generation, "discarding stale open result");
            if let Ok(link) = result {
                tokio::spawn(async move { link.writer.close().await });
            }
            return;
        }

        let link = match result {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!(generation, "realtime link failed to open: {e}");
                self.link_lost(ConnectionState::Failed(e.to_string()));
                return;
            }
        };

        let Link { mut reader, writer } = link;
        let tx = self.internal_tx.clone();
        let reader = tokio::spawn(async move {
            loop {
                let event = reader.next_event().await;
                let done = event.ends_stream();
                if tx.send(Internal::Event { generation, event }).is_err() || done {
                    break;
                }
            }
        });
        self.slot = Slot::Live {
            generation,
            writer,
            reader,
        };
        self.enter(ConnectionState::Ready);
        self.scheduler
            .arm(Timer::Keepalive, self.settings.keepalive_period);
        tracing::info!(generation, "realtime link ready");
    }

    fn on_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Text(text) => {
                tracing::debug!(bytes = text.len(), "inbound frame");
                self.sink.on_frame(text);
            }
            LinkEvent::Binary(bytes) => {
                tracing::debug!(bytes = bytes.len(), "ignoring binary frame");
            }
            LinkEvent::Waiting(reason) => {
                tracing::info!(%reason, "realtime link waiting");
                self.enter(ConnectionState::Waiting(reason));
            }
            LinkEvent::Resumed => {
                if matches!(self.tracker.state(), ConnectionState::Waiting(_)) {
                    self.enter(ConnectionState::Ready);
                }
            }
            LinkEvent::ReceiveError(reason) => {
                tracing::warn!(%reason, "receive failed");
                self.link_lost(ConnectionState::Failed(reason));
            }
            LinkEvent::Closed => {
                tracing::info!("realtime link closed by peer");
                self.link_lost(ConnectionState::Cancelled);
            }
        }
    }

    fn on_send_error(&mut self, generation: u64, what: Outbound, e: SendError) {
        let fatal = match (what, e.kind) {
            (_, SendErrorKind::Cancelled) => true,
            (Outbound::Ping, SendErrorKind::Io) => true,
            (Outbound::Text, SendErrorKind::Io) | (_, SendErrorKind::Other) => false,
        };
        if !fatal || !self.is_live(generation) {
            tracing::warn!(generation, ?what, "send failed: {e}");
            return;
        }
        tracing::warn!(generation, ?what, "send failed, reconnecting: {e}");
        self.link_lost(ConnectionState::Cancelled);
    }

    /// Record the terminal state, release the link, and schedule a
    /// reconnect if still enabled.
    fn link_lost(&mut self, state: ConnectionState) {
        self.teardown();
        self.enter(state);
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if !self.auto_reconnect || self.endpoint.is_none() {
            return;
        }
        tracing::info!(
            delay_ms = self.settings.reconnect_delay.as_millis() as u64,
            failures = self.tracker.consecutive_failures(),
            "reconnect scheduled"
        );
        self.scheduler
            .arm(Timer::Reconnect, self.settings.reconnect_delay);
    }

    fn teardown(&mut self) {
        self.scheduler.cancel(Timer::Keepalive);
        match std::mem::replace(&mut self.slot, Slot::Empty) {
            Slot::Live {
                generation,
                writer,
                reader,
            } => {
                reader.abort();
                tokio::spawn(async move { writer.close().await });
                tracing::debug!(generation, "realtime link torn down");
            }
            Slot::Opening { generation } => {
                tracing::debug!(generation, "abandoning pending open");
            }
            Slot::Empty => {}
        }
    }

    // ─── Timers ───────────────────────────────────────────────────

    fn on_timer(&mut self, timer: Timer) {
        match timer {
            Timer::Reconnect => {
                if self.auto_reconnect && matches!(self.slot, Slot::Empty) {
                    self.open();
                }
            }
            Timer::Keepalive => self.keepalive(),
            Timer::PresenceGrace => {}
        }
    }

    fn keepalive(&mut self) {
        let Slot::Live {
            generation, writer, ..
        } = &self.slot
        else {
            return;
        };
        let (generation, writer) = (*generation, Arc::clone(writer));

        // a writer that saw its socket die leaves the link half-open
        if !writer.is_healthy() || self.tracker.state().is_terminal() {
            tracing::info!(generation, "keepalive found a dead link, reconnecting");
            self.link_lost(ConnectionState::Failed("keepalive: link unhealthy".into()));
            return;
        }

        if *self.tracker.state() == ConnectionState::Ready {
            let tx = self.internal_tx.clone();
            tokio::spawn(async move {
                let result = writer.ping().await;
                let _ = tx.send(Internal::Sent {
                    generation,
                    what: Outbound::Ping,
                    result,
                });
            });
        } else {
            tracing::debug!(generation, state = self.tracker.state().label(), "skipping keepalive ping");
        }
        self.scheduler
            .arm(Timer::Keepalive, self.settings.keepalive_period);
    }

    // ─── State ────────────────────────────────────────────────────

    fn is_live(&self, generation: u64) -> bool {
        matches!(self.slot, Slot::Live { generation: g, .. } if g == generation)
    }

    fn enter(&mut self, state: ConnectionState) {
        if let Some(signal) = self.tracker.enter(state) {
            match signal {
                Connectivity::SuspectedDisconnect => tracing::warn!(
                    failures = self.tracker.consecutive_failures(),
                    "realtime link suspected down"
                ),
                Connectivity::Connected => tracing::info!("realtime link recovered"),
            }
            self.sink.on_link_signal(signal);
        }
        self.publish_state();
    }

    fn publish_state(&self) {
        tracing::debug!(state = self.tracker.state().label(), "transport state");
        self.state_tx.send_replace(self.tracker.state().clone());
    }
}
