//! `livepreview run`: one live preview session, UI events on stdout.

use anyhow::Context;
use livepreview_core::UiEvent;
use livepreview_runtime::{BootstrapError, HostSignal, HttpPreviewApi, LivePreviewModule, UiEmitter};
use livepreview_transport::WsConnector;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;

use crate::cli::RunOpts;

type StdinLines = Lines<BufReader<Stdin>>;

pub async fn cmd_run(opts: RunOpts) -> anyhow::Result<()> {
    let settings = opts.settings();
    let app_config = settings
        .load_app_config()
        .context("loading app config")?;
    let baseline = settings.load_baseline().context("loading baseline")?;
    let api = HttpPreviewApi::new(
        settings.snapshot_url.clone(),
        settings.token_url.clone(),
        settings.platform,
    );
    let (emitter, mut events) = UiEmitter::channel(settings.settle_delay);

    let mut module = LivePreviewModule::new(
        app_config,
        baseline,
        settings,
        api,
        WsConnector,
        emitter,
        Box::new(|e: &BootstrapError| {
            println!("{}", json!({"event": "bootstrapFailed", "kind": e.kind(), "message": e.to_string()}));
        }),
    );
    if !module.is_enabled() {
        tracing::warn!("LIVE_PREVIEW.data.enable is not set in the app config, nothing to do");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    tokio::spawn(watch_shutdown(cancel.clone()));

    module
        .handle(HostSignal::InitializeLivePreviewData(opts.ids()))
        .await
        .context("bootstrapping live preview session")?;

    let mut stdin = opts
        .signals_from_stdin
        .then(|| BufReader::new(tokio::io::stdin()).lines());

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            Some(event) = events.recv() => print_event(&event)?,
            line = next_line(&mut stdin) => match line {
                Some(line) => on_signal_line(&mut module, &line).await,
                None => {
                    tracing::debug!("stdin closed, no further host signals");
                    stdin = None;
                }
            },
        }
    }

    module.close();
    tracing::info!("live preview stopped");
    Ok(())
}

fn print_event(event: &UiEvent) -> anyhow::Result<()> {
    let line = serde_json::to_string(event).context("serializing ui event")?;
    println!("{line}");
    Ok(())
}

async fn next_line(lines: &mut Option<StdinLines>) -> Option<String> {
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}

async fn on_signal_line<A, C>(module: &mut LivePreviewModule<A, C>, line: &str)
where
    A: livepreview_runtime::PreviewApi,
    C: livepreview_transport::Connector + Clone,
{
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<HostSignal>(line) {
        // failures already went through the failure callback
        Ok(signal) => {
            let _ = module.handle(signal).await;
        }
        Err(e) => tracing::warn!("ignoring unreadable host signal: {e}"),
    }
}

async fn watch_shutdown(cancel: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("received ctrl-c, closing session"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, closing session"),
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {e}");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("received ctrl-c, closing session");
    }

    cancel.cancel();
}
