//! Runtime tunables for a live preview session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use livepreview_core::presence::DEFAULT_PRESENCE_GRACE_SECS;
use livepreview_core::{ConfigDocument, FrameError, Platform, StoreLimits};
use livepreview_transport::TransportSettings;
use livepreview_transport::lifecycle::{
    DEFAULT_KEEPALIVE_SECS, DEFAULT_RECONNECT_DELAY_SECS, DEFAULT_SUSPECT_THRESHOLD,
};
use thiserror::Error;

pub const DEFAULT_SNAPSHOT_URL: &str = "https://www.webtonative.com/api/v1/get-ios-data-for-preview";
pub const DEFAULT_TOKEN_URL: &str = "https://www.webtonative.com/api/v1/generate-preview-token";
/// Pause before restart/refresh events reach the UI.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 300;

/// App configuration used when the host supplies none: live preview on.
pub const DEFAULT_APP_CONFIG_JSON: &str = r#"{"LIVE_PREVIEW":{"data":{"enable":true}}}"#;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse { path: PathBuf, source: FrameError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSettings {
    pub snapshot_url: String,
    pub token_url: String,
    pub platform: Platform,
    pub reconnect_delay: Duration,
    pub keepalive_period: Duration,
    pub suspect_threshold: u32,
    pub presence_grace: Duration,
    pub settle_delay: Duration,
    /// JSON file replacing the built-in preview baseline.
    pub baseline_path: Option<PathBuf>,
    /// JSON file holding the host's active app configuration.
    pub app_config_path: Option<PathBuf>,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            snapshot_url: DEFAULT_SNAPSHOT_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            platform: Platform::Ios,
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            keepalive_period: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            suspect_threshold: DEFAULT_SUSPECT_THRESHOLD,
            presence_grace: Duration::from_secs(DEFAULT_PRESENCE_GRACE_SECS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            baseline_path: None,
            app_config_path: None,
        }
    }
}

impl PreviewSettings {
    pub fn transport(&self) -> TransportSettings {
        TransportSettings {
            reconnect_delay: self.reconnect_delay,
            keepalive_period: self.keepalive_period,
            suspect_threshold: self.suspect_threshold,
        }
    }

    pub fn store_limits(&self) -> StoreLimits {
        StoreLimits {
            presence_grace: self.presence_grace,
        }
    }

    pub fn load_baseline(&self) -> Result<ConfigDocument, SettingsError> {
        match &self.baseline_path {
            Some(path) => load_document(path),
            None => Ok(ConfigDocument::preview_baseline()),
        }
    }

    pub fn load_app_config(&self) -> Result<ConfigDocument, SettingsError> {
        match &self.app_config_path {
            Some(path) => load_document(path),
            None => ConfigDocument::from_json_bytes(DEFAULT_APP_CONFIG_JSON.as_bytes()).map_err(
                |source| SettingsError::Parse {
                    path: PathBuf::from("<built-in>"),
                    source,
                },
            ),
        }
    }
}

/// Read a JSON object from disk.
pub fn load_document(path: &Path) -> Result<ConfigDocument, SettingsError> {
    let bytes = std::fs::read(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ConfigDocument::from_json_bytes(&bytes).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
