//! Client configuration.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Paths of the publication endpoints, relative to `api_base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationEndpoints {
    pub create: String,
    pub approve: String,
    pub reject: String,
    pub list: String,
    pub get: String,
}

impl Default for PublicationEndpoints {
    fn default() -> Self {
        Self {
            create: "/api/ops/publication/create".to_string(),
            approve: "/api/ops/publication/approve".to_string(),
            reject: "/api/ops/publication/reject".to_string(),
            list: "/api/ops/publication/list".to_string(),
            get: "/api/ops/publication/get".to_string(),
        }
    }
}

/// Configuration for the remote API client.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the API (e.g. `http://localhost:3000`).
    pub api_base_url: String,
    /// Base URL for listings. Defaults to `{api_base_url}/api`.
    pub listing_base_url: Option<String>,
    /// Bearer token sent on every request, if any.
    pub bearer_token: Option<String>,
    /// Request timeout in seconds, enforced by the HTTP client.
    pub timeout_secs: u64,
    /// Upload body chunk size in bytes.
    pub upload_chunk_size: usize,
    pub publication: PublicationEndpoints,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            listing_base_url: None,
            bearer_token: None,
            timeout_secs: 60,
            upload_chunk_size: 64 * 1024, // 64 KiB
            publication: PublicationEndpoints::default(),
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_base_url", &self.api_base_url)
            .field("listing_base_url", &self.listing_base_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("upload_chunk_size", &self.upload_chunk_size)
            .field("publication", &self.publication)
            .finish()
    }
}

impl ApiConfig {
    /// Creates a config pointing at `api_base_url` with defaults elsewhere.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: ApiConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the values the client cannot work without.
    pub fn validate(&self) -> ApiResult<()> {
        if self.api_base_url.is_empty() {
            return Err(ApiError::Config("api_base_url is empty".to_string()));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(ApiError::Config(format!(
                "api_base_url must be http(s): {}",
                self.api_base_url
            )));
        }
        if self.upload_chunk_size == 0 {
            return Err(ApiError::Config("upload_chunk_size must be > 0".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ApiError::Config("timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }

    /// API base without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// Listing base without a trailing slash.
    pub fn listing_base(&self) -> String {
        match &self.listing_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("{}/api", self.api_base()),
        }
    }
}
