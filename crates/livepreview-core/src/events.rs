//! Events posted to the rendering layer.

use serde::{Deserialize, Serialize};

use crate::types::Connectivity;

/// A UI-impact event. Serialized with the event name in `"event"` and the
/// payload fields in camelCase, matching what the rendering layer observes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum UiEvent {
    #[serde(rename = "switchScreenView", rename_all = "camelCase")]
    SwitchScreenView {
        screen: String,
        reload: bool,
        closed_current_screen: bool,
    },
    #[serde(rename = "updateLoadingIndicator", rename_all = "camelCase")]
    UpdateLoadingIndicator {
        animation_url: String,
        closed_current_screen: bool,
    },
    /// Full reload of the hosted content.
    #[serde(rename = "webToNativeApp", rename_all = "camelCase")]
    WebToNativeApp { restart_live_preview: bool },
    /// Lighter re-render of dependent UI.
    #[serde(rename = "mainScreenPreviewHandler")]
    MainScreenPreviewHandler { refresh: bool },
    #[serde(rename = "livePreviewDataUpdated", rename_all = "camelCase")]
    LivePreviewDataUpdated { is_socket_connected: bool },
    /// One-shot signal into the hosted content.
    #[serde(rename = "showLivePreviewScreen")]
    ShowLivePreviewScreen,
}

impl UiEvent {
    pub fn connectivity(signal: Connectivity) -> Self {
        Self::LivePreviewDataUpdated {
            is_socket_connected: signal.is_connected(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SwitchScreenView { .. } => "switchScreenView",
            Self::UpdateLoadingIndicator { .. } => "updateLoadingIndicator",
            Self::WebToNativeApp { .. } => "webToNativeApp",
            Self::MainScreenPreviewHandler { .. } => "mainScreenPreviewHandler",
            Self::LivePreviewDataUpdated { .. } => "livePreviewDataUpdated",
            Self::ShowLivePreviewScreen => "showLivePreviewScreen",
        }
    }

    /// Restart and refresh events wait for the UI to settle before posting.
    pub fn needs_settle_delay(&self) -> bool {
        matches!(
            self,
            Self::WebToNativeApp { .. } | Self::MainScreenPreviewHandler { .. }
        )
    }
}
