use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Platform ─────────────────────────────────────────────────────

/// Origin platform tag carried by content frames (`"os"`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Ios,
    Android,
    /// Any tag this build does not know about. Never matches a local platform.
    #[serde(other)]
    Unknown,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Unknown => "unknown",
        }
    }

    /// Device type sent alongside the platform on bootstrap requests.
    pub fn device_type(self) -> &'static str {
        match self {
            Self::Ios => "IOS",
            Self::Android => "ANDROID",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            _ => Err(format!("unknown platform: {s}")),
        }
    }
}

// ─── Impact ───────────────────────────────────────────────────────

/// UI impact of a patch. Ordered so that `max` picks the strongest.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ImpactDecision {
    #[default]
    None = 0,
    Refresh = 1,
    Reload = 2,
}

impl ImpactDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Refresh => "refresh",
            Self::Reload => "reload",
        }
    }
}

impl fmt::Display for ImpactDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Connection ───────────────────────────────────────────────────

/// Lifecycle state of the realtime connection.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Ready,
    Waiting(String),
    Failed(String),
    Cancelled,
}

impl ConnectionState {
    /// `Failed` and `Cancelled` end a connection object's life.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Waiting(_) => "waiting",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Coarse connectivity signal escalated to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Connected,
    SuspectedDisconnect,
}

impl Connectivity {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

// ─── Presence ─────────────────────────────────────────────────────

/// Snapshot of the peer roster sharing this preview session.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceInfo {
    pub active_peer_count: usize,
    /// When the roster was first seen empty in the current episode.
    pub pending_zero_since: Option<DateTime<Utc>>,
}

// ─── Session ──────────────────────────────────────────────────────

/// Identity of one preview activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIds {
    pub request_id: String,
    pub preview_id: String,
    pub user_id: String,
}

/// A live preview session, created on first activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSession {
    pub ids: SessionIds,
    pub endpoint: Option<String>,
    pub connection_state: ConnectionState,
    pub has_connected_once: bool,
}

impl PreviewSession {
    pub fn new(ids: SessionIds) -> Self {
        Self {
            ids,
            endpoint: None,
            connection_state: ConnectionState::Idle,
            has_connected_once: false,
        }
    }
}
