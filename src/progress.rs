//! Progress protocol
//!
//! A run reports through a bounded channel of [`ProgressEvent`]s. The HTTP
//! layer turns each event into one server-sent event whose data is
//! [`ProgressEvent::payload`]. Event order per row is: optional info text,
//! one result text, one `PROGRESS:` value. After the last row come the
//! summary and the `COMPLETE` sentinel, or a fatal error text and the
//! sentinel.

use crate::error::{Error, Result};
use crate::types::{ProgressEvent, RowOutcome, RunCounters, ValidationFailure};
use std::path::Path;
use tokio::sync::mpsc;

/// Payload of the terminal frame of every run
pub const SENTINEL: &str = "COMPLETE";

/// Payload sent when a bare event stream is opened without a run
pub const CONNECTED: &str = "Connected";

/// Prefix of percentage payloads
pub const PROGRESS_PREFIX: &str = "PROGRESS:";

impl ProgressEvent {
    /// Text carried in the event's `data` field
    pub fn payload(&self) -> String {
        match self {
            ProgressEvent::Info(text)
            | ProgressEvent::RowResult(text)
            | ProgressEvent::Summary(text) => text.clone(),
            ProgressEvent::PercentComplete(percent) => format!("{PROGRESS_PREFIX}{percent:?}"),
            ProgressEvent::Done => SENTINEL.to_string(),
        }
    }

    /// Whether this is the terminal sentinel
    pub fn is_done(&self) -> bool {
        matches!(self, ProgressEvent::Done)
    }
}

/// Render a payload as a complete server-sent event frame
///
/// Multi-line payloads become one `data:` line per line, which clients
/// reassemble with `\n`.
pub fn sse_frame(payload: &str) -> String {
    let mut frame = String::with_capacity(payload.len() + 8);
    for line in payload.split('\n') {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

/// Percentage of the manifest processed after `row_index` (1-based) rows
pub fn percent_complete(row_index: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (row_index as f64 / total as f64) * 100.0
}

/// Text for a row's final outcome
pub fn row_result_text(row_index: usize, outcome: &RowOutcome) -> String {
    match outcome {
        RowOutcome::Downloaded { filename, .. } => {
            format!("✅ Successfully downloaded: {filename}")
        }
        RowOutcome::Invalid(reason) => invalid_row_text(row_index, *reason),
        RowOutcome::HttpFailure { url, status } => {
            format!("❌ Failed to download (Status {status}): {url}")
        }
        RowOutcome::TransportFailure { url, message }
        | RowOutcome::WriteFailure { url, message } => {
            format!("❌ Error downloading {url}: {message}")
        }
    }
}

fn invalid_row_text(row_index: usize, reason: ValidationFailure) -> String {
    format!("⚠️ Row {row_index}: {reason}")
}

/// Final multi-line report for a run
pub fn summary(counters: &RunCounters, directory: &Path) -> String {
    format!(
        "📊 Download Summary:\n\
         Total Files: {}\n\
         Successfully Downloaded: {}\n\
         Failed: {}\n\
         Download Directory: {}",
        counters.total,
        counters.downloaded,
        counters.failed,
        directory.display()
    )
}

/// Producer side of a run's event stream
///
/// Every send fails with [`Error::Cancelled`] once the consumer has dropped
/// its receiver, which is how a run notices a disconnected client.
#[derive(Clone, Debug)]
pub struct ProgressEmitter {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressEmitter {
    /// Wrap the sending half of a run's channel
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Create an emitter and the matching receiver
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }

    /// Whether the consumer has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer has gone away
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    async fn send(&self, event: ProgressEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::Cancelled)
    }

    /// Announce the run and its row count
    pub async fn started(&self, total: usize) -> Result<()> {
        self.send(ProgressEvent::Info(format!(
            "Starting to process {total} files"
        )))
        .await
    }

    /// Announce that a row's document is about to be fetched
    pub async fn fetching(&self, label: &str) -> Result<()> {
        self.send(ProgressEvent::Info(format!("Downloading for {label}")))
            .await
    }

    /// Report a row's final outcome
    pub async fn row_result(&self, row_index: usize, outcome: &RowOutcome) -> Result<()> {
        self.send(ProgressEvent::RowResult(row_result_text(row_index, outcome)))
            .await
    }

    /// Report overall progress after `row_index` rows
    pub async fn progress(&self, row_index: usize, total: usize) -> Result<()> {
        self.send(ProgressEvent::PercentComplete(percent_complete(
            row_index, total,
        )))
        .await
    }

    /// Emit the final report
    pub async fn summary(&self, counters: &RunCounters, directory: &Path) -> Result<()> {
        self.send(ProgressEvent::Summary(summary(counters, directory)))
            .await
    }

    /// Report a run-level error
    pub async fn fatal(&self, message: &str) -> Result<()> {
        self.send(ProgressEvent::Info(format!("❌ Fatal Error: {message}")))
            .await
    }

    /// Emit the terminal sentinel
    pub async fn done(&self) -> Result<()> {
        self.send(ProgressEvent::Done).await
    }
}
