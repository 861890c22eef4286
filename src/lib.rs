//! # manifest-dl
//!
//! Batch downloader for documents listed in a CSV manifest, with live
//! progress streamed as server-sent events.
//!
//! A run takes one uploaded manifest and a target directory. Every data row
//! is validated, its document URL fetched with a single GET and the body
//! stored as `resume_<run timestamp>_<row index>.pdf`. Progress, per-row
//! results and a final summary are pushed to the uploader as they happen,
//! and every stream ends with a `COMPLETE` frame.
//!
//! ## Quick Start
//!
//! ```no_run
//! use manifest_dl::{BatchPipeline, Config, TempManifest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let pipeline = Arc::new(BatchPipeline::from_config(&config)?);
//!
//!     let csv = std::fs::read("people.csv")?;
//!     let manifest = TempManifest::create(&config.upload.upload_dir, &csv).await?;
//!
//!     let mut events = pipeline.spawn_run(manifest, "downloads".into());
//!     while let Some(event) = events.recv().await {
//!         println!("{}", event.payload());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! To serve the upload form and event streams over HTTP, see
//! [`api::start_api_server`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Document fetching
pub mod fetcher;
/// Manifest parsing and row validation
pub mod manifest;
/// Batch run orchestration
pub mod pipeline;
/// Progress events and their wire text
pub mod progress;
/// Core types
pub mod types;
/// Document persistence
pub mod writer;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, Error, ErrorDetail, ManifestError, Result, ToHttpStatus};
pub use fetcher::{DocumentFetcher, HttpFetcher};
pub use pipeline::{BatchPipeline, TempManifest};
pub use progress::ProgressEmitter;
pub use types::{
    FetchOutcome, Manifest, ProgressEvent, Row, RowOutcome, RunCounters, RunOutcome, RunReport,
    UsableRow, ValidationFailure,
};
pub use writer::{FsOutputWriter, OutputWriter};

/// Resolve when the process is asked to terminate
///
/// On unix this is SIGTERM or SIGINT; elsewhere Ctrl+C. Used by
/// [`api::start_api_server`] to trigger graceful shutdown.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // registration can fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Ok(mut remaining), Err(e)) | (Err(e), Ok(mut remaining)) => {
            tracing::warn!(error = %e, "Could not register both signal handlers, waiting on the other");
            remaining.recv().await;
            tracing::info!("Received termination signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

/// Resolve when the process is asked to terminate (Ctrl+C)
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
