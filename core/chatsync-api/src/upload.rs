//! File upload with progress reporting.
//!
//! An upload streams the file in chunks as one multipart `attachments` part
//! and reports `Progress { percent }` as chunks are handed to the transport,
//! then exactly one `Done { success }`.

use crate::client::{read_json, ApiClient};
use crate::error::{ApiError, ApiResult};
use chatsync_types::{EntityKey, EntityKind, ProgressEvent};
use futures::stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Name of the multipart part carrying the file.
pub const ATTACHMENT_PART: &str = "attachments";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Metadata the server returns for a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(default)]
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub content_length: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

/// Sending half of a progress stream.
///
/// The sender is taken out on the first terminal event, so nothing can be
/// sent after `Done` and `Done` is sent at most once.
#[derive(Clone)]
struct ProgressReporter {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<ProgressEvent>>>>,
}

impl ProgressReporter {
    fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    fn percent(&self, percent: u8) {
        let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(ProgressEvent::Progress {
                percent: percent.min(100),
            });
        }
    }

    fn finish(&self, success: bool) {
        let mut guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = guard.take() {
            let _ = tx.send(ProgressEvent::Done { success });
        }
    }
}

/// Emits `Done { success: false }` if the upload task ends (or is aborted)
/// without reporting a result.
struct TerminalGuard(ProgressReporter);

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.0.finish(false);
    }
}

/// A running upload. Dropping the session cancels it.
pub struct UploadSession {
    events: mpsc::UnboundedReceiver<ProgressEvent>,
    handle: Option<JoinHandle<ApiResult<FileMetadata>>>,
}

impl UploadSession {
    /// Next progress event; `None` once the terminal event was consumed.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    /// Drains all remaining events, ending with the terminal one.
    pub async fn collect_events(&mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        events
    }

    /// Cancels the upload. The stream still ends with `Done { success: false }`.
    pub fn abort(&self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    /// Waits for the upload and returns the stored file's metadata.
    pub async fn finish(mut self) -> ApiResult<FileMetadata> {
        let Some(handle) = self.handle.take() else {
            return Err(ApiError::UploadAborted("already finished".to_string()));
        };
        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ApiError::UploadAborted("cancelled".to_string())),
            Err(e) => Err(ApiError::UploadAborted(e.to_string())),
        }
    }
}

impl Drop for UploadSession {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Uploads files into the `files` namespace.
#[derive(Clone)]
pub struct FileUploader {
    client: ApiClient,
}

impl FileUploader {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Starts uploading `bytes` to `key`. Must be called inside a Tokio
    /// runtime.
    ///
    /// An invalid key or content type fails here, before any request.
    pub fn start(
        &self,
        key: &EntityKey,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> ApiResult<UploadSession> {
        let url = self.client.entity_url(&key.api_id(EntityKind::File)?);
        let chunk_size = self.client.config().upload_chunk_size;

        let (tx, events) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(tx);
        let form = build_form(
            key.name.clone(),
            bytes,
            content_type.unwrap_or(DEFAULT_CONTENT_TYPE),
            chunk_size,
            reporter.clone(),
        )?;

        let client = self.client.clone();
        // Moved into the task so that even an abort before the first poll
        // ends the stream.
        let guard = TerminalGuard(reporter.clone());

        let handle = tokio::spawn(async move {
            let result = send_form(&client, &url, form).await;

            match &result {
                Ok(meta) => info!("Uploaded {} ({:?} bytes)", meta.url, meta.content_length),
                Err(e) => warn!("Upload to {} failed: {}", url, e),
            }
            reporter.finish(result.is_ok());
            drop(guard);
            result
        });

        Ok(UploadSession {
            events,
            handle: Some(handle),
        })
    }

    /// Reads a local file and starts uploading it.
    pub async fn start_path(
        &self,
        key: &EntityKey,
        path: impl AsRef<Path>,
        content_type: Option<&str>,
    ) -> ApiResult<UploadSession> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        self.start(key, bytes, content_type)
    }

    /// Uploads and waits, ignoring progress.
    pub async fn upload(
        &self,
        key: &EntityKey,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> ApiResult<FileMetadata> {
        self.start(key, bytes, content_type)?.finish().await
    }
}

/// Wraps the file in a chunked body that reports progress as the transport
/// consumes it.
fn build_form(
    file_name: String,
    bytes: Vec<u8>,
    content_type: &str,
    chunk_size: usize,
    reporter: ProgressReporter,
) -> ApiResult<Form> {
    let total = bytes.len() as u64;
    let chunks: Vec<Vec<u8>> = bytes.chunks(chunk_size.max(1)).map(<[u8]>::to_vec).collect();
    let mut sent = 0u64;
    let body_stream = stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        reporter.percent((sent * 100 / total) as u8);
        Ok::<_, std::io::Error>(chunk)
    }));

    let part = Part::stream_with_length(Body::wrap_stream(body_stream), total)
        .file_name(file_name)
        .mime_str(content_type)
        .map_err(|_| ApiError::Validation(format!("invalid content type {content_type:?}")))?;
    Ok(Form::new().part(ATTACHMENT_PART, part))
}

async fn send_form(client: &ApiClient, url: &str, form: Form) -> ApiResult<FileMetadata> {
    debug!("Uploading to {}", url);
    let response = client
        .send(client.request(Method::PUT, url).multipart(form))
        .await?;
    read_json(response).await
}
