//! Session bootstrap: snapshot → seed → show → endpoint → connect.

use livepreview_core::types::PreviewSession;
use livepreview_transport::{TransportError, TransportHandle};

use crate::api::{PreviewApi, validate_ids};
use crate::error::BootstrapError;
use crate::session::SessionHandle;

pub type FailureCallback = Box<dyn Fn(&BootstrapError) + Send + Sync>;

pub struct Bootstrapper<A> {
    api: A,
    on_failure: FailureCallback,
}

impl<A: PreviewApi> Bootstrapper<A> {
    pub fn new(api: A, on_failure: FailureCallback) -> Self {
        Self { api, on_failure }
    }

    /// Run the bootstrap for `record`. Any failure is reported once through
    /// the failure callback and returned; nothing is retried.
    ///
    /// The endpoint is only fetched and connected while the session has
    /// never connected; later activations just refresh the snapshot.
    pub async fn initialize_session(
        &self,
        record: &mut PreviewSession,
        session: &SessionHandle,
        transport: &TransportHandle,
    ) -> Result<(), BootstrapError> {
        let result = self.run(record, session, transport).await;
        if let Err(e) = &result {
            tracing::warn!(kind = e.kind(), "live preview bootstrap failed: {e}");
            (self.on_failure)(e);
        }
        result
    }

    async fn run(
        &self,
        record: &mut PreviewSession,
        session: &SessionHandle,
        transport: &TransportHandle,
    ) -> Result<(), BootstrapError> {
        validate_ids(&record.ids)?;

        let snapshot = self.api.fetch_snapshot(&record.ids).await?;
        tracing::info!(keys = snapshot.len(), "preview snapshot received");
        session.seed(snapshot);
        session.show_surface();

        if record.has_connected_once {
            tracing::debug!("session already connected, skipping endpoint fetch");
            return Ok(());
        }

        let endpoint = self.api.fetch_endpoint(&record.ids).await?;
        match transport.connect(&endpoint) {
            Ok(()) => {}
            Err(e @ (TransportError::UnsupportedScheme(_) | TransportError::InvalidEndpoint(..))) => {
                tracing::warn!("not connecting: {e}");
            }
            Err(e) => {
                tracing::warn!("transport unavailable: {e}");
                return Ok(());
            }
        }
        record.endpoint = Some(endpoint);
        record.has_connected_once = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use livepreview_core::types::SessionIds;
    use livepreview_core::{ConfigDocument, ConfigStore, ConnectionState, Platform};
    use livepreview_transport::{Connector, Link, TransportSettings};
    use serde_json::{Map, Value, json};
    use url::Url;

    use super::*;
    use crate::emitter::UiEmitter;

    #[derive(Default)]
    struct MockApi {
        snapshot_calls: AtomicUsize,
        endpoint_calls: AtomicUsize,
        snapshot_error: Option<BootstrapError>,
        endpoint: Option<String>,
    }

    #[async_trait]
    impl PreviewApi for MockApi {
        async fn fetch_snapshot(&self, _ids: &SessionIds) -> Result<Map<String, Value>, BootstrapError> {
            self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
            match &self.snapshot_error {
                Some(e) => Err(e.clone()),
                None => Ok(json!({"websiteLink": "https://example.com"})
                    .as_object()
                    .cloned()
                    .unwrap_or_default()),
            }
        }

        async fn fetch_endpoint(&self, _ids: &SessionIds) -> Result<String, BootstrapError> {
            self.endpoint_calls.fetch_add(1, Ordering::SeqCst);
            self.endpoint
                .clone()
                .ok_or_else(|| BootstrapError::Decode("no url".into()))
        }
    }

    /// Counts opens and never completes them.
    #[derive(Default)]
    struct PendingConnector {
        opens: AtomicUsize,
    }

    #[async_trait]
    impl Connector for PendingConnector {
        async fn open(&self, _endpoint: &Url) -> Result<Link, TransportError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    struct Harness {
        session: SessionHandle,
        transport: TransportHandle,
        connector: Arc<PendingConnector>,
        failures: Arc<Mutex<Vec<&'static str>>>,
    }

    fn harness() -> Harness {
        let (emitter, _rx) = UiEmitter::channel(Duration::ZERO);
        let store = ConfigStore::new(
            ConfigDocument::preview_baseline(),
            ConfigDocument::default(),
            Platform::Ios,
        );
        let session = SessionHandle::spawn(store, emitter);
        let connector = Arc::new(PendingConnector::default());
        let transport = TransportHandle::spawn(
            Arc::clone(&connector),
            session.frame_sink(),
            TransportSettings::default(),
        );
        Harness {
            session,
            transport,
            connector,
            failures: Arc::default(),
        }
    }

    fn bootstrapper(api: MockApi, failures: &Arc<Mutex<Vec<&'static str>>>) -> Bootstrapper<MockApi> {
        let failures = Arc::clone(failures);
        Bootstrapper::new(
            api,
            Box::new(move |e: &BootstrapError| failures.lock().unwrap().push(e.kind())),
        )
    }

    fn record() -> PreviewSession {
        PreviewSession::new(SessionIds {
            request_id: "r1".into(),
            preview_id: "p1".into(),
            user_id: "u1".into(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn first_activation_seeds_and_connects_once() {
        let h = harness();
        let api = MockApi {
            endpoint: Some("wss://rt.example.com/s".into()),
            ..MockApi::default()
        };
        let boot = bootstrapper(api, &h.failures);
        let mut rec = record();

        boot.initialize_session(&mut rec, &h.session, &h.transport)
            .await
            .expect("bootstraps");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(rec.has_connected_once);
        assert_eq!(rec.endpoint.as_deref(), Some("wss://rt.example.com/s"));
        assert_eq!(h.connector.opens.load(Ordering::SeqCst), 1);
        assert_eq!(h.transport.state(), ConnectionState::Connecting);
        let view = h.session.inspect().await.expect("alive");
        assert!(view.surface_visible);
        assert_eq!(
            view.active.get("websiteLink"),
            Some(&json!("https://example.com"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reactivation_skips_endpoint_and_connect() {
        let h = harness();
        let api = MockApi {
            endpoint: Some("wss://rt.example.com/s".into()),
            ..MockApi::default()
        };
        let boot = bootstrapper(api, &h.failures);
        let mut rec = record();

        boot.initialize_session(&mut rec, &h.session, &h.transport)
            .await
            .expect("first");
        boot.initialize_session(&mut rec, &h.session, &h.transport)
            .await
            .expect("second");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(boot.api.snapshot_calls.load(Ordering::SeqCst), 2);
        assert_eq!(boot.api.endpoint_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.connector.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_failure_reports_once_and_stops() {
        let h = harness();
        let api = MockApi {
            snapshot_error: Some(BootstrapError::Server(500)),
            endpoint: Some("wss://rt.example.com/s".into()),
            ..MockApi::default()
        };
        let boot = bootstrapper(api, &h.failures);
        let mut rec = record();

        let err = boot
            .initialize_session(&mut rec, &h.session, &h.transport)
            .await
            .unwrap_err();
        assert_eq!(err, BootstrapError::Server(500));
        assert_eq!(*h.failures.lock().unwrap(), vec!["SERVER_ERROR"]);
        assert_eq!(boot.api.endpoint_calls.load(Ordering::SeqCst), 0);
        assert!(!rec.has_connected_once);
        let view = h.session.inspect().await.expect("alive");
        assert!(!view.surface_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_id_fails_before_any_request() {
        let h = harness();
        let boot = bootstrapper(MockApi::default(), &h.failures);
        let mut rec = record();
        rec.ids.preview_id.clear();

        let err = boot
            .initialize_session(&mut rec, &h.session, &h.transport)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ID_MISSING");
        assert_eq!(boot.api.snapshot_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn non_websocket_endpoint_does_not_connect() {
        let h = harness();
        let api = MockApi {
            endpoint: Some("https://rt.example.com/s".into()),
            ..MockApi::default()
        };
        let boot = bootstrapper(api, &h.failures);
        let mut rec = record();

        boot.initialize_session(&mut rec, &h.session, &h.transport)
            .await
            .expect("bootstrap itself succeeds");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(h.connector.opens.load(Ordering::SeqCst), 0);
        assert!(h.failures.lock().unwrap().is_empty());
    }
}
