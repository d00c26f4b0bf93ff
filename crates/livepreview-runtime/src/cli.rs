//! CLI definition using clap derive.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use livepreview_core::Platform;
use livepreview_core::presence::DEFAULT_PRESENCE_GRACE_SECS;
use livepreview_core::types::SessionIds;
use livepreview_runtime::PreviewSettings;
use livepreview_runtime::settings::{DEFAULT_SETTLE_DELAY_MS, DEFAULT_SNAPSHOT_URL, DEFAULT_TOKEN_URL};
use livepreview_transport::lifecycle::{
    DEFAULT_KEEPALIVE_SECS, DEFAULT_RECONNECT_DELAY_SECS, DEFAULT_SUSPECT_THRESHOLD,
};

#[derive(Parser)]
#[command(name = "livepreview", about = "Live preview sync engine", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a preview session and print UI events as JSON lines
    Run(RunOpts),
    /// Print the impact decision of a patch against an active config
    Classify(ClassifyOpts),
}

#[derive(clap::Args)]
pub struct RunOpts {
    #[arg(long, env = "LIVEPREVIEW_REQUEST_ID")]
    pub request_id: String,

    #[arg(long, env = "LIVEPREVIEW_PREVIEW_ID")]
    pub preview_id: String,

    #[arg(long, env = "LIVEPREVIEW_USER_ID")]
    pub user_id: String,

    /// Snapshot endpoint
    #[arg(long, env = "LIVEPREVIEW_SNAPSHOT_URL", default_value = DEFAULT_SNAPSHOT_URL)]
    pub snapshot_url: String,

    /// Token endpoint returning {"url": "wss://..."}
    #[arg(long, env = "LIVEPREVIEW_TOKEN_URL", default_value = DEFAULT_TOKEN_URL)]
    pub token_url: String,

    #[arg(long, env = "LIVEPREVIEW_PLATFORM", default_value = "ios")]
    pub platform: Platform,

    #[arg(long, env = "LIVEPREVIEW_RECONNECT_MS", default_value_t = DEFAULT_RECONNECT_DELAY_SECS * 1000)]
    pub reconnect_ms: u64,

    #[arg(
        long,
        env = "LIVEPREVIEW_KEEPALIVE_SECS",
        default_value_t = DEFAULT_KEEPALIVE_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub keepalive_secs: u64,

    /// Consecutive failures before a suspected disconnect is reported
    #[arg(
        long,
        env = "LIVEPREVIEW_SUSPECT_THRESHOLD",
        default_value_t = DEFAULT_SUSPECT_THRESHOLD,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub suspect_threshold: u32,

    #[arg(long, env = "LIVEPREVIEW_PRESENCE_GRACE_MS", default_value_t = DEFAULT_PRESENCE_GRACE_SECS * 1000)]
    pub presence_grace_ms: u64,

    #[arg(long, env = "LIVEPREVIEW_SETTLE_MS", default_value_t = DEFAULT_SETTLE_DELAY_MS)]
    pub settle_ms: u64,

    /// JSON file replacing the built-in preview baseline
    #[arg(long, env = "LIVEPREVIEW_BASELINE")]
    pub baseline: Option<PathBuf>,

    /// JSON file with the host app config (defaults to live preview enabled)
    #[arg(long, env = "LIVEPREVIEW_APP_CONFIG")]
    pub app_config: Option<PathBuf>,

    /// Also accept host signals as JSON lines on stdin
    #[arg(long)]
    pub signals_from_stdin: bool,
}

impl RunOpts {
    pub fn ids(&self) -> SessionIds {
        SessionIds {
            request_id: self.request_id.clone(),
            preview_id: self.preview_id.clone(),
            user_id: self.user_id.clone(),
        }
    }

    pub fn settings(&self) -> PreviewSettings {
        PreviewSettings {
            snapshot_url: self.snapshot_url.clone(),
            token_url: self.token_url.clone(),
            platform: self.platform,
            reconnect_delay: Duration::from_millis(self.reconnect_ms),
            keepalive_period: Duration::from_secs(self.keepalive_secs),
            suspect_threshold: self.suspect_threshold,
            presence_grace: Duration::from_millis(self.presence_grace_ms),
            settle_delay: Duration::from_millis(self.settle_ms),
            baseline_path: self.baseline.clone(),
            app_config_path: self.app_config.clone(),
        }
    }
}

#[derive(clap::Args)]
pub struct ClassifyOpts {
    /// Currently rendered config (JSON object)
    #[arg(long)]
    pub active: PathBuf,

    /// Patch to classify (JSON object)
    #[arg(long)]
    pub patch: PathBuf,
}
