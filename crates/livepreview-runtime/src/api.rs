//! Snapshot/token HTTP client for session bootstrap.

use async_trait::async_trait;
use livepreview_core::Platform;
use livepreview_core::types::SessionIds;
use serde_json::{Map, Value};
use url::Url;

use crate::error::BootstrapError;

/// The two bootstrap calls. Stateless; no retries.
#[async_trait]
pub trait PreviewApi: Send + Sync + 'static {
    /// Initial configuration overlay for the session.
    async fn fetch_snapshot(&self, ids: &SessionIds) -> Result<Map<String, Value>, BootstrapError>;

    /// Realtime endpoint for the session.
    async fn fetch_endpoint(&self, ids: &SessionIds) -> Result<String, BootstrapError>;
}

#[async_trait]
impl<T: PreviewApi + ?Sized> PreviewApi for std::sync::Arc<T> {
    async fn fetch_snapshot(&self, ids: &SessionIds) -> Result<Map<String, Value>, BootstrapError> {
        (**self).fetch_snapshot(ids).await
    }

    async fn fetch_endpoint(&self, ids: &SessionIds) -> Result<String, BootstrapError> {
        (**self).fetch_endpoint(ids).await
    }
}

/// Reject empty ids before any request goes out.
pub fn validate_ids(ids: &SessionIds) -> Result<(), BootstrapError> {
    for (field, value) in [
        ("requestId", &ids.request_id),
        ("previewId", &ids.preview_id),
        ("userId", &ids.user_id),
    ] {
        if value.trim().is_empty() {
            return Err(BootstrapError::MissingId(field));
        }
    }
    Ok(())
}

/// `base?requestId=..&previewId=..&userId=..&platform=..&deviceType=..`
pub fn build_request_url(
    base: &str,
    ids: &SessionIds,
    platform: Platform,
) -> Result<Url, BootstrapError> {
    let mut url = Url::parse(base).map_err(|e| BootstrapError::InvalidUrl(format!("{base}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(BootstrapError::InvalidUrl(base.to_string()));
    }
    url.query_pairs_mut()
        .clear()
        .append_pair("requestId", &ids.request_id)
        .append_pair("previewId", &ids.preview_id)
        .append_pair("userId", &ids.user_id)
        .append_pair("platform", platform.as_str())
        .append_pair("deviceType", platform.device_type());
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct HttpPreviewApi {
    client: reqwest::Client,
    snapshot_url: String,
    token_url: String,
    platform: Platform,
}

impl HttpPreviewApi {
    pub fn new(snapshot_url: impl Into<String>, token_url: impl Into<String>, platform: Platform) -> Self {
        Self {
            client: reqwest::Client::new(),
            snapshot_url: snapshot_url.into(),
            token_url: token_url.into(),
            platform,
        }
    }

    async fn get_object(&self, base: &str, ids: &SessionIds) -> Result<Map<String, Value>, BootstrapError> {
        validate_ids(ids)?;
        let url = build_request_url(base, ids, self.platform)?;
        tracing::debug!(host = url.host_str().unwrap_or_default(), path = url.path(), "bootstrap request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BootstrapError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(BootstrapError::Server(status.as_u16()));
        }
        let body: Value = response.json().await.map_err(|e| {
            if e.is_decode() {
                BootstrapError::Decode(e.to_string())
            } else {
                BootstrapError::Network(e.to_string())
            }
        })?;
        match body {
            Value::Object(map) => Ok(map),
            _ => Err(BootstrapError::Decode("expected a JSON object".into())),
        }
    }
}

#[async_trait]
impl PreviewApi for HttpPreviewApi {
    async fn fetch_snapshot(&self, ids: &SessionIds) -> Result<Map<String, Value>, BootstrapError> {
        self.get_object(&self.snapshot_url, ids).await
    }

    async fn fetch_endpoint(&self, ids: &SessionIds) -> Result<String, BootstrapError> {
        let body = self.get_object(&self.token_url, ids).await?;
        body.get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BootstrapError::Decode("token response has no url".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> SessionIds {
        SessionIds {
            request_id: "req-1".into(),
            preview_id: "pv 2".into(),
            user_id: "u3".into(),
        }
    }

    #[test]
    fn request_url_carries_ids_and_platform() {
        let url = build_request_url("https://api.example.com/v1/preview", &ids(), Platform::Ios)
            .expect("valid");
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/preview?requestId=req-1&previewId=pv+2&userId=u3&platform=ios&deviceType=IOS"
        );
    }

    #[test]
    fn request_url_replaces_existing_query() {
        let url = build_request_url("https://api.example.com/p?stale=1", &ids(), Platform::Ios)
            .expect("valid");
        assert!(!url.as_str().contains("stale"));
    }

    #[test]
    fn bad_base_is_invalid_url() {
        assert!(matches!(
            build_request_url("not a url", &ids(), Platform::Ios),
            Err(BootstrapError::InvalidUrl(_))
        ));
        assert!(matches!(
            build_request_url("mailto:someone@example.com", &ids(), Platform::Ios),
            Err(BootstrapError::InvalidUrl(_))
        ));
    }

    #[test]
    fn blank_ids_are_missing() {
        let mut ids = ids();
        ids.user_id = "  ".into();
        assert_eq!(validate_ids(&ids), Err(BootstrapError::MissingId("userId")));
    }
}
