mod common;

use chatsync_api::{ApiClient, ApiError, FileUploader};
use chatsync_types::ProgressEvent;
use common::{key, mock_config};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn uploader(server: &MockServer, chunk_size: usize) -> FileUploader {
    let mut config = mock_config(server);
    config.upload_chunk_size = chunk_size;
    FileUploader::new(ApiClient::new(config).unwrap())
}

fn metadata_json() -> serde_json::Value {
    serde_json::json!({
        "name": "doc.txt",
        "url": "files/u1/doc.txt",
        "contentLength": 10,
        "contentType": "text/plain",
        "updatedAt": 1_700_000_000_000i64
    })
}

fn assert_single_terminal(events: &[ProgressEvent], success: bool) {
    let terminal = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminal, 1, "expected exactly one Done in {events:?}");
    assert_eq!(events.last(), Some(&ProgressEvent::Done { success }));
}

// ── Success ─────────────────────────────────────────────────────

#[tokio::test]
async fn upload_reports_progress_then_done() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/files/u1/doc.txt"))
        .and(body_string_contains("name=\"attachments\""))
        .and(body_string_contains("0123456789"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = uploader(&server, 4)
        .start(&key(&[], "doc.txt"), b"0123456789".to_vec(), Some("text/plain"))
        .unwrap();

    let events = session.collect_events().await;
    assert_single_terminal(&events, true);

    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Progress { percent } => Some(*percent),
            ProgressEvent::Done { .. } => None,
        })
        .collect();
    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.last(), Some(&100));

    let meta = session.finish().await.unwrap();
    assert_eq!(meta.url, "files/u1/doc.txt");
    assert_eq!(meta.content_length, Some(10));
}

#[tokio::test]
async fn upload_without_progress_returns_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/files/u1/docs/doc.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
        .mount(&server)
        .await;

    let meta = uploader(&server, 1024)
        .upload(&key(&["docs"], "doc.txt"), b"hello".to_vec(), None)
        .await
        .unwrap();
    assert_eq!(meta.name, "doc.txt");
}

#[tokio::test]
async fn upload_from_path_reads_file() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/files/u1/doc.txt"))
        .and(body_string_contains("from disk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"from disk").unwrap();

    let mut session = uploader(&server, 3)
        .start_path(&key(&[], "doc.txt"), file.path(), Some("text/plain"))
        .await
        .unwrap();

    assert_single_terminal(&session.collect_events().await, true);
    session.finish().await.unwrap();
}

#[tokio::test]
async fn upload_from_missing_path_fails_early() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let result = uploader(&server, 3)
        .start_path(&key(&[], "doc.txt"), dir.path().join("missing"), None)
        .await;
    assert!(matches!(result, Err(ApiError::Io(_))));
}

// ── Failure ─────────────────────────────────────────────────────

#[tokio::test]
async fn server_error_ends_with_failed_done() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "disk full"})))
        .mount(&server)
        .await;

    let mut session = uploader(&server, 4)
        .start(&key(&[], "doc.txt"), b"0123456789".to_vec(), None)
        .unwrap();

    assert_single_terminal(&session.collect_events().await, false);
    let err = session.finish().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn unreachable_server_ends_with_failed_done() {
    let config = chatsync_api::ApiConfig::new("http://127.0.0.1:1");
    let uploader = FileUploader::new(ApiClient::new(config).unwrap());

    let mut session = uploader
        .start(&key(&[], "doc.txt"), b"data".to_vec(), None)
        .unwrap();

    assert_single_terminal(&session.collect_events().await, false);
    assert!(matches!(
        session.finish().await.unwrap_err(),
        ApiError::Transport(_)
    ));
}

#[tokio::test]
async fn abort_ends_with_failed_done() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(metadata_json())
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let mut session = uploader(&server, 4)
        .start(&key(&[], "doc.txt"), b"0123456789".to_vec(), None)
        .unwrap();
    session.abort();

    let events = tokio::time::timeout(Duration::from_secs(5), session.collect_events())
        .await
        .unwrap();
    assert_single_terminal(&events, false);
    assert!(matches!(
        session.finish().await.unwrap_err(),
        ApiError::UploadAborted(_)
    ));
}

#[tokio::test]
async fn invalid_key_fails_before_spawning() {
    let server = MockServer::start().await;
    let bad = chatsync_types::EntityKey {
        bucket: String::new(),
        folder_path: Vec::new(),
        name: "doc.txt".to_string(),
    };

    let result = uploader(&server, 4).start(&bad, b"x".to_vec(), None);
    assert!(matches!(result, Err(ApiError::MalformedKey(_))));
}

#[tokio::test]
async fn invalid_content_type_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
        .expect(0)
        .mount(&server)
        .await;

    let result = uploader(&server, 4).start(&key(&[], "doc.txt"), b"x".to_vec(), Some("not a mime"));
    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn undecodable_metadata_is_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
        .mount(&server)
        .await;

    let mut session = uploader(&server, 4)
        .start(&key(&[], "doc.txt"), b"0123456789".to_vec(), None)
        .unwrap();

    assert_single_terminal(&session.collect_events().await, false);
    assert!(matches!(
        session.finish().await.unwrap_err(),
        ApiError::Serialization(_)
    ));
}

// ── Cancellation ────────────────────────────────────────────────

#[tokio::test]
async fn dropping_session_cancels_upload() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_json()))
        .expect(0)
        .mount(&server)
        .await;

    let session = uploader(&server, 4)
        .start(&key(&[], "doc.txt"), b"0123456789".to_vec(), None)
        .unwrap();
    drop(session);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let received = server.received_requests().await.unwrap();
    assert!(received.is_empty(), "upload still sent: {received:?}");
}
