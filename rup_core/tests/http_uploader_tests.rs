use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rup_core::body::{BytesBody, FileBody, RequestBody};
use rup_core::progress::{ProgressListener, UploadProgress, WatchProgressListener};
use rup_core::types::types::{MediaType, UploadError};
use rup_core::uploader::{HttpUploader, UploadConfig};

/// Generates deterministic test data.
fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

type Calls = Arc<Mutex<Vec<(u64, Option<u64>, bool)>>>;

fn recording_listener() -> (Arc<dyn ProgressListener>, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();
    let listener: Arc<dyn ProgressListener> =
        Arc::new(move |written: u64, total: Option<u64>, done: bool| {
            recorded.lock().unwrap().push((written, total, done));
        });
    (listener, calls)
}

/// A body that does not know its size up front.
struct UnsizedBody(Vec<u8>);

#[async_trait]
impl RequestBody for UnsizedBody {
    fn content_type(&self) -> Option<MediaType> {
        None
    }

    async fn write_to(&self, sink: &mut (dyn AsyncWrite + Send + Unpin)) -> io::Result<()> {
        for chunk in self.0.chunks(10_000) {
            sink.write_all(chunk).await?;
        }
        Ok(())
    }
}

/// Reads from `socket` until the end of the request head.
async fn read_request_head(socket: &mut TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }
}

// ---------------------------------------------------------------
// Successful uploads
// ---------------------------------------------------------------

#[tokio::test]
async fn test_upload_sends_identical_bytes_with_headers() {
    let server = MockServer::start().await;
    let data = generate_test_data(256 * 1024);

    Mock::given(method("PUT"))
        .and(path("/upload"))
        .and(header("content-type", "application/octet-stream"))
        .and(header("content-length", "262144"))
        .respond_with(ResponseTemplate::new(201).set_body_string("stored"))
        .expect(1)
        .mount(&server)
        .await;

    let config = UploadConfig::builder(format!("{}/upload", server.uri()))
        .with_method(reqwest::Method::PUT)
        .build();
    let uploader = HttpUploader::new(config).unwrap();
    let (listener, calls) = recording_listener();

    let body = BytesBody::new(data.clone(), Some(MediaType::octet_stream()));
    let response = uploader.upload(body, listener).await.unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.body, "stored");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body, data);

    let calls = calls.lock().unwrap();
    let total = data.len() as u64;
    assert_eq!(calls.last().copied(), Some((total, Some(total), true)));
    assert!(calls.windows(2).all(|w| w[0].0 <= w[1].0));
    assert_eq!(calls.iter().filter(|c| c.2).count(), 1);
}

#[tokio::test]
async fn test_upload_file_body_with_watch_listener() {
    let server = MockServer::start().await;
    let data = generate_test_data(100_000);
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("upload.bin");
    std::fs::write(&file_path, &data).unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let uploader = HttpUploader::new(UploadConfig::builder(server.uri()).build()).unwrap();
    let (listener, rx) = WatchProgressListener::new();

    let body = FileBody::open(&file_path, None).await.unwrap();
    uploader.upload(body, Arc::new(listener)).await.unwrap();

    assert_eq!(*rx.borrow(), UploadProgress::new(100_000, Some(100_000), true));
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, data);
}

#[tokio::test]
async fn test_upload_unsized_body_streams_without_length() {
    let server = MockServer::start().await;
    let data = generate_test_data(30_000);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let uploader = HttpUploader::new(UploadConfig::builder(server.uri()).build()).unwrap();
    let (listener, calls) = recording_listener();

    uploader
        .upload(UnsizedBody(data.clone()), listener)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].body, data);

    let calls = calls.lock().unwrap();
    assert!(calls.iter().all(|&(_, total, done)| total.is_none() && !done));
    assert_eq!(calls.last().unwrap().0, 30_000);
}

#[tokio::test]
async fn test_upload_sends_basic_auth_and_custom_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(header("x-upload-tag", "nightly"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = UploadConfig::builder(server.uri())
        .with_basic_auth("user", "pass")
        .with_header("X-Upload-Tag", "nightly")
        // Ignored: the body decides the content type.
        .with_header("Content-Type", "text/html")
        .build();
    let uploader = HttpUploader::new(config).unwrap();
    let (listener, _calls) = recording_listener();

    let response = uploader
        .upload(BytesBody::text("hello"), listener)
        .await
        .unwrap();
    assert_eq!(response.status, 204);

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    assert_eq!(content_type.as_deref(), Some("text/plain; charset=utf-8"));
}

#[tokio::test]
async fn test_uploads_can_share_one_client() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let first = HttpUploader::with_client(
        client.clone(),
        UploadConfig::builder(format!("{}/first", server.uri())).build(),
    );
    let second = HttpUploader::with_client(
        client,
        UploadConfig::builder(format!("{}/second", server.uri())).build(),
    );

    let (listener, _calls) = recording_listener();
    first
        .upload(BytesBody::text("one"), listener.clone())
        .await
        .unwrap();
    second
        .upload(BytesBody::text("two"), listener)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let paths: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
    assert_eq!(paths, vec!["/first", "/second"]);
    assert_eq!(requests[1].body, b"two");
}

// ---------------------------------------------------------------
// Failures
// ---------------------------------------------------------------

#[tokio::test]
async fn test_upload_non_success_status_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
        .mount(&server)
        .await;

    let uploader = HttpUploader::new(UploadConfig::builder(server.uri()).build()).unwrap();
    let (listener, _calls) = recording_listener();

    let result = uploader
        .upload(BytesBody::new(vec![1u8; 1024], None), listener)
        .await;

    match result {
        Err(UploadError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "disk full");
        }
        other => panic!("expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_connection_refused_reports_request_error() {
    // Nothing listens on port 1, so the connection is refused immediately
    let uploader = HttpUploader::new(UploadConfig::builder("http://127.0.0.1:1/upload").build()).unwrap();
    let (listener, _calls) = recording_listener();

    let result = uploader
        .upload(BytesBody::new(generate_test_data(200_000), None), listener)
        .await;

    match result {
        Err(UploadError::Request(_)) => {} // expected
        other => panic!("expected Request error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_invalid_header_value_is_rejected() {
    let config = UploadConfig::builder("http://127.0.0.1:1/upload")
        .with_header("X-Bad", "line\nbreak")
        .build();
    let uploader = HttpUploader::new(config).unwrap();
    let (listener, calls) = recording_listener();

    let result = uploader
        .upload(BytesBody::new(vec![0u8; 16], None), listener)
        .await;

    assert!(matches!(result, Err(UploadError::InvalidHeader(_))));
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_rejected_before_body_is_read_returns_status() {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = tcp.accept().await.unwrap();
        read_request_head(&mut socket).await;
        socket
            .write_all(b"HTTP/1.1 413 Payload Too Large\r\ncontent-length: 3\r\n\r\nbig")
            .await
            .unwrap();
        // Keep the connection open but never read the body.
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(socket);
    });

    let uploader =
        HttpUploader::new(UploadConfig::builder(format!("http://{}/upload", addr)).build()).unwrap();
    let (listener, _calls) = recording_listener();
    let body = BytesBody::new(vec![0u8; 64 * 1024 * 1024], None);

    let result = timeout(Duration::from_secs(30), uploader.upload(body, listener))
        .await
        .expect("upload must finish once the server has answered");

    match result {
        Err(UploadError::Status { status, .. }) => assert_eq!(status, 413),
        other => panic!("expected Status error, got {:?}", other),
    }
    server.abort();
}

#[tokio::test]
async fn test_upload_connection_dropped_mid_body_reports_request_error() {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = tcp.accept().await.unwrap();
        read_request_head(&mut socket).await;
        let mut buf = vec![0u8; 64 * 1024];
        let _ = socket.read(&mut buf).await;
        // Hang up without answering.
    });

    let uploader =
        HttpUploader::new(UploadConfig::builder(format!("http://{}/upload", addr)).build()).unwrap();
    let (listener, calls) = recording_listener();
    let body = BytesBody::new(vec![0u8; 64 * 1024 * 1024], None);

    let result = timeout(Duration::from_secs(30), uploader.upload(body, listener))
        .await
        .expect("upload must finish once the connection is gone");

    match result {
        Err(UploadError::Request(_)) => {} // the pipe error stays in the debug log
        other => panic!("expected Request error, got {:?}", other),
    }
    let calls = calls.lock().unwrap();
    assert!(!calls.is_empty());
    assert!(calls.iter().all(|&(_, _, done)| !done));
    server.await.unwrap();
}
