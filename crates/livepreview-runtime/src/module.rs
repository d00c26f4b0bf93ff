//! Host-facing live preview module.
//!
//! Translates host signals into session lifecycle: the first activation
//! builds a session (store actor + transport worker) and bootstraps it,
//! later activations refresh the snapshot, and close/backgrounding tears
//! everything down with an owner-initiated disconnect. Every signal is
//! ignored unless the host's app config enables live preview.

use livepreview_core::types::{PreviewSession, SessionIds};
use livepreview_core::{ConfigDocument, ConfigStore};
use livepreview_transport::{Connector, TransportHandle};
use serde::Deserialize;

use crate::api::PreviewApi;
use crate::bootstrap::{Bootstrapper, FailureCallback};
use crate::emitter::UiEmitter;
use crate::error::BootstrapError;
use crate::session::{SessionHandle, SessionView};
use crate::settings::PreviewSettings;

/// Activation signals sent by the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "camelCase")]
pub enum HostSignal {
    InitializeLivePreviewData(SessionIds),
    CloseLivePreview,
    AppBackgrounded,
}

struct LiveSession {
    record: PreviewSession,
    handle: SessionHandle,
    transport: TransportHandle,
}

pub struct LivePreviewModule<A, C> {
    app_config: ConfigDocument,
    baseline: ConfigDocument,
    settings: PreviewSettings,
    bootstrapper: Bootstrapper<A>,
    connector: C,
    emitter: UiEmitter,
    session: Option<LiveSession>,
}

impl<A, C> LivePreviewModule<A, C>
where
    A: PreviewApi,
    C: Connector + Clone,
{
    pub fn new(
        app_config: ConfigDocument,
        baseline: ConfigDocument,
        settings: PreviewSettings,
        api: A,
        connector: C,
        emitter: UiEmitter,
        on_failure: FailureCallback,
    ) -> Self {
        Self {
            app_config,
            baseline,
            settings,
            bootstrapper: Bootstrapper::new(api, on_failure),
            connector,
            emitter,
            session: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.app_config.live_preview_enabled()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn transport(&self) -> Option<&TransportHandle> {
        self.session.as_ref().map(|s| &s.transport)
    }

    pub async fn inspect(&self) -> Option<SessionView> {
        match &self.session {
            Some(s) => s.handle.inspect().await,
            None => None,
        }
    }

    pub async fn handle(&mut self, signal: HostSignal) -> Result<(), BootstrapError> {
        if !self.is_enabled() {
            tracing::debug!(?signal, "live preview disabled, ignoring host signal");
            return Ok(());
        }
        match signal {
            HostSignal::InitializeLivePreviewData(ids) => self.activate(ids).await,
            HostSignal::CloseLivePreview | HostSignal::AppBackgrounded => {
                self.close();
                Ok(())
            }
        }
    }

    async fn activate(&mut self, ids: SessionIds) -> Result<(), BootstrapError> {
        if self.session.as_ref().is_some_and(|s| s.record.ids != ids) {
            tracing::info!("activation for a different session, replacing the current one");
            self.close();
        }

        let live = match self.session.take() {
            Some(live) => live,
            None => self.open_session(ids),
        };
        let LiveSession {
            mut record,
            handle,
            transport,
        } = live;

        let result = self
            .bootstrapper
            .initialize_session(&mut record, &handle, &transport)
            .await;
        record.connection_state = transport.state();
        self.session = Some(LiveSession {
            record,
            handle,
            transport,
        });
        result
    }

    fn open_session(&self, ids: SessionIds) -> LiveSession {
        tracing::info!(request_id = %ids.request_id, preview_id = %ids.preview_id, "creating live preview session");
        let store = ConfigStore::new(
            self.baseline.clone(),
            self.app_config.clone(),
            self.settings.platform,
        )
        .with_limits(self.settings.store_limits());
        let handle = SessionHandle::spawn(store, self.emitter.clone());
        let transport = TransportHandle::spawn(
            self.connector.clone(),
            handle.frame_sink(),
            self.settings.transport(),
        );
        LiveSession {
            record: PreviewSession::new(ids),
            handle,
            transport,
        }
    }

    /// Owner-initiated teardown. Dropping the handles stops both actors.
    pub fn close(&mut self) {
        let Some(live) = self.session.take() else {
            return;
        };
        if let Err(e) = live.transport.disconnect(true) {
            tracing::debug!("transport already stopped: {e}");
        }
        tracing::info!(request_id = %live.record.ids.request_id, "live preview session closed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use livepreview_core::{ConnectionState, UiEvent};
    use livepreview_transport::{Link, TransportError};
    use serde_json::{Map, Value, json};
    use url::Url;

    use super::*;

    #[derive(Default)]
    struct StaticApi {
        endpoint_calls: AtomicUsize,
    }

    #[async_trait]
    impl PreviewApi for StaticApi {
        async fn fetch_snapshot(&self, ids: &SessionIds) -> Result<Map<String, Value>, BootstrapError> {
            Ok(json!({"previewId": ids.preview_id})
                .as_object()
                .cloned()
                .unwrap_or_default())
        }

        async fn fetch_endpoint(&self, _ids: &SessionIds) -> Result<String, BootstrapError> {
            self.endpoint_calls.fetch_add(1, Ordering::SeqCst);
            Ok("wss://rt.example.com/s".into())
        }
    }

    #[derive(Clone, Default)]
    struct PendingConnector {
        opens: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connector for PendingConnector {
        async fn open(&self, _endpoint: &Url) -> Result<Link, TransportError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    fn module(
        app_config: Value,
    ) -> (
        LivePreviewModule<Arc<StaticApi>, PendingConnector>,
        Arc<StaticApi>,
        PendingConnector,
        tokio::sync::mpsc::UnboundedReceiver<UiEvent>,
    ) {
        let api = Arc::new(StaticApi::default());
        let connector = PendingConnector::default();
        let (emitter, rx) = UiEmitter::channel(Duration::ZERO);
        let m = LivePreviewModule::new(
            ConfigDocument::new(app_config.as_object().cloned().unwrap_or_default()),
            ConfigDocument::preview_baseline(),
            PreviewSettings::default(),
            Arc::clone(&api),
            connector.clone(),
            emitter,
            Box::new(|_: &BootstrapError| {}),
        );
        (m, api, connector, rx)
    }

    fn ids(preview: &str) -> SessionIds {
        SessionIds {
            request_id: "r".into(),
            preview_id: preview.into(),
            user_id: "u".into(),
        }
    }

    fn enabled() -> Value {
        json!({"LIVE_PREVIEW": {"data": {"enable": true}}})
    }

    #[test]
    fn host_signals_decode() {
        let s: HostSignal = serde_json::from_value(json!({
            "name": "initializeLivePreviewData",
            "data": {"requestId": "r", "previewId": "p", "userId": "u"}
        }))
        .expect("decodes");
        assert_eq!(s, HostSignal::InitializeLivePreviewData(ids("p")));
        let s: HostSignal =
            serde_json::from_value(json!({"name": "appBackgrounded"})).expect("decodes");
        assert_eq!(s, HostSignal::AppBackgrounded);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_module_ignores_everything() {
        let (mut m, api, connector, _rx) = module(json!({}));
        m.handle(HostSignal::InitializeLivePreviewData(ids("p")))
            .await
            .expect("ignored");
        assert!(!m.has_session());
        assert_eq!(api.endpoint_calls.load(Ordering::SeqCst), 0);
        assert_eq!(connector.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_activation_keeps_one_connection() {
        let (mut m, api, connector, mut rx) = module(enabled());
        m.handle(HostSignal::InitializeLivePreviewData(ids("p")))
            .await
            .expect("first");
        m.handle(HostSignal::InitializeLivePreviewData(ids("p")))
            .await
            .expect("second");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(api.endpoint_calls.load(Ordering::SeqCst), 1);
        assert_eq!(connector.opens.load(Ordering::SeqCst), 1);
        assert_eq!(rx.recv().await, Some(UiEvent::ShowLivePreviewScreen));
        let view = m.inspect().await.expect("session");
        assert_eq!(view.active.get("previewId"), Some(&json!("p")));
    }

    #[tokio::test(start_paused = true)]
    async fn close_disconnects_and_forgets_the_session() {
        let (mut m, _api, connector, _rx) = module(enabled());
        m.handle(HostSignal::InitializeLivePreviewData(ids("p")))
            .await
            .expect("activates");
        tokio::time::sleep(Duration::from_millis(10)).await;
        let transport = m.transport().cloned().expect("transport");

        m.handle(HostSignal::CloseLivePreview).await.expect("closes");
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(!m.has_session());
        assert_eq!(transport.state(), ConnectionState::Cancelled);
        assert_eq!(connector.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn new_ids_replace_the_session() {
        let (mut m, api, connector, _rx) = module(enabled());
        m.handle(HostSignal::InitializeLivePreviewData(ids("p1")))
            .await
            .expect("first");
        m.handle(HostSignal::InitializeLivePreviewData(ids("p2")))
            .await
            .expect("second");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(api.endpoint_calls.load(Ordering::SeqCst), 2);
        assert_eq!(connector.opens.load(Ordering::SeqCst), 2);
        let view = m.inspect().await.expect("session");
        assert_eq!(view.document.get("previewId"), Some(&json!("p2")));
    }
}
