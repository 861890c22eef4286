//! Run handlers: the upload form, the bare event stream and batch runs.

use crate::api::AppState;
use crate::error::ApiError;
use crate::pipeline::TempManifest;
use crate::progress::{CONNECTED, sse_frame};
use axum::{
    Json,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode, header},
    response::{
        Html, IntoResponse, Response,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use std::convert::Infallible;
use std::path::PathBuf;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

/// Text sent instead of a run when the upload is incomplete
pub const MISSING_INPUT: &str = "Error: Missing file or directory";

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>manifest-dl</title></head>
<body>
<h1>Batch document download</h1>
<form method="post" action="/" enctype="multipart/form-data">
  <p><label>Manifest (CSV) <input type="file" name="file" accept=".csv"></label></p>
  <p><label>Target directory <input type="text" name="directory"></label></p>
  <p><button type="submit">Start</button></p>
</form>
</body>
</html>
"#;

fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"))
}

// SSE data may not carry carriage returns
fn sse_event(payload: &str) -> SseEvent {
    SseEvent::default().data(payload.replace('\r', ""))
}

/// GET / - Upload form, or a one-frame event stream for SSE clients
#[utoipa::path(
    get,
    path = "/",
    tag = "runs",
    responses(
        (status = 200, description = "HTML upload form, or a single `Connected` frame when the client accepts text/event-stream", content_type = "text/html")
    )
)]
pub async fn index(headers: HeaderMap) -> Response {
    if wants_event_stream(&headers) {
        let stream = tokio_stream::once(Ok::<_, Infallible>(sse_event(CONNECTED)));
        return Sse::new(stream).into_response();
    }
    Html(INDEX_PAGE).into_response()
}

/// POST / - Upload a manifest and stream the run's progress
///
/// The response is always `text/event-stream`. An upload without a manifest
/// or without a target directory gets a single error frame and no run.
#[utoipa::path(
    post,
    path = "/",
    tag = "runs",
    request_body(content = Vec<u8>, description = "Multipart form with `file` (CSV manifest) and `directory` (target directory)", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Progress events, ending with COMPLETE", content_type = "text/event-stream"),
        (status = 413, description = "Manifest exceeds the configured upload limit", body = ApiError),
        (status = 500, description = "Upload could not be stored", body = ApiError)
    )
)]
pub async fn start_run(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut manifest_bytes: Option<Vec<u8>> = None;
    let mut directory: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "rejected multipart upload");
                return (
                    e.status(),
                    Json(ApiError::new("invalid_upload", e.body_text())),
                )
                    .into_response();
            }
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => match field.bytes().await {
                Ok(bytes) => manifest_bytes = Some(bytes.to_vec()),
                Err(e) => {
                    return (
                        e.status(),
                        Json(ApiError::new(
                            "invalid_file",
                            format!("Failed to read file: {}", e.body_text()),
                        )),
                    )
                        .into_response();
                }
            },
            "directory" => {
                if let Ok(text) = field.text().await {
                    directory = Some(text);
                }
            }
            _ => {}
        }
    }

    let (Some(bytes), Some(directory)) = (
        manifest_bytes.filter(|bytes| !bytes.is_empty()),
        directory
            .map(|dir| dir.trim().to_string())
            .filter(|dir| !dir.is_empty()),
    ) else {
        tracing::debug!("upload without manifest or directory");
        return missing_input_response();
    };

    let manifest = match TempManifest::create(&state.config.upload.upload_dir, &bytes).await {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::error!(error = %e, "failed to store uploaded manifest");
            return e.into_response();
        }
    };

    tracing::info!(
        manifest = %manifest.path().display(),
        directory = %directory,
        bytes = bytes.len(),
        "starting run"
    );

    let events = state.pipeline.spawn_run(manifest, PathBuf::from(directory));
    let stream = ReceiverStream::new(events)
        .map(|event| Ok::<_, Infallible>(sse_event(&event.payload())));

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn missing_input_response() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/event-stream")],
        sse_frame(MISSING_INPUT),
    )
        .into_response()
}
