use super::*;
use crate::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::path::Path;
use std::time::Duration;
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

mod system;

const BOUNDARY: &str = "manifest-dl-test-boundary";

/// Config rooted in a temp dir, without pacing
fn test_config(temp: &TempDir) -> Config {
    let mut config = Config::default();
    config.upload.upload_dir = temp.path().join("uploads");
    config.pipeline.pacing_delay = Duration::ZERO;
    config.fetch.timeout = Duration::from_secs(5);
    config
}

fn test_router(config: Config) -> Router {
    let pipeline = Arc::new(BatchPipeline::from_config(&config).unwrap());
    create_router(pipeline, Arc::new(config))
}

/// Hand-built multipart/form-data body with optional `file` and `directory` parts
fn multipart_request(file: Option<&[u8]>, directory: Option<&str>) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();

    if let Some(bytes) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"file\"; filename=\"manifest.csv\"\r\n\
                 Content-Type: text/csv\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(directory) = directory {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"directory\"\r\n\r\n\
                 {directory}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Split an SSE body into event payloads, joining multi-line data with `\n`
fn sse_payloads(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter_map(|frame| {
            let lines: Vec<&str> = frame
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|data| data.strip_prefix(' ').unwrap_or(data))
                .collect();
            (!lines.is_empty()).then(|| lines.join("\n"))
        })
        .collect()
}

fn files_in(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn test_cors_enabled() {
    let temp = tempdir().unwrap();
    let mut config = test_config(&temp);
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["*".to_string()];
    let app = test_router(config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let temp = tempdir().unwrap();
    let mut config = test_config(&temp);
    config.api.cors_enabled = false;
    let app = test_router(config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let temp = tempdir().unwrap();
    let mut config = test_config(&temp);
    config.api.cors_origins = vec!["http://allowed.example".to_string()];
    let app = test_router(config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://allowed.example")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://allowed.example"
    );
}

#[tokio::test]
async fn test_serve_stops_on_signal() {
    let temp = tempdir().unwrap();
    let config = Arc::new(test_config(&temp));
    let upload_dir = config.upload.upload_dir.clone();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, config, async move {
        stop_rx.await.ok();
    }));

    let response = reqwest::get(format!("http://{address}/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(upload_dir.is_dir(), "upload directory created at startup");

    stop_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after the signal")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_serve_rejects_invalid_config() {
    let temp = tempdir().unwrap();
    let mut config = test_config(&temp);
    config.fetch.timeout = Duration::ZERO;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let result = serve(listener, Arc::new(config), async {}).await;

    assert!(matches!(result, Err(crate::Error::Config { .. })));
}
