//! Thin HTTP layer shared by storage, publication and upload.

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use chatsync_types::FolderInfo;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// HTTP client bound to one API deployment.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<ApiConfig>,
    http: Client,
}

impl ApiClient {
    /// Creates a client. Timeouts are enforced by the underlying `reqwest`
    /// client; nothing retries.
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// `{api_base}/api/{api_id}`.
    pub fn entity_url(&self, api_id: &str) -> String {
        format!("{}/api/{api_id}", self.config.api_base())
    }

    /// `{listing_base}/{folder_id}/`; the trailing slash marks a folder.
    pub fn listing_url(&self, folder: &FolderInfo) -> String {
        format!("{}/{}/", self.config.listing_base(), folder.id())
    }

    /// `{api_base}{path}` for an endpoint path such as `/api/ops/publication/create`.
    pub fn endpoint_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.config.api_base())
        } else {
            format!("{}/{path}", self.config.api_base())
        }
    }

    /// Starts a request carrying the configured bearer token.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.config.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request and turns non-2xx answers into `RemoteStorage` errors.
    pub async fn send(&self, builder: RequestBuilder) -> ApiResult<Response> {
        let response = builder.send().await?;
        check_status(response).await
    }
}

/// Passes 2xx responses through; otherwise reads the body (JSON if it parses,
/// raw text if not) into [`ApiError::RemoteStorage`].
pub async fn check_status(response: Response) -> ApiResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
    Err(ApiError::RemoteStorage { status, body })
}

/// Reads a 2xx body as JSON. A body that does not decode is a
/// [`ApiError::Serialization`], not a transport failure.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
