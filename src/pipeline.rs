//! Batch pipeline: one run over one uploaded manifest
//!
//! A run reads its manifest, announces the row count, prepares the target
//! directory and then walks the rows strictly in order. Each row moves through
//! [`RowState`] on its own; whatever happens to it is recorded in
//! [`RunCounters`] and reported, and the run continues with the next row.
//! Only a manifest that cannot be read or a target directory that cannot be
//! created ends a run early.
//!
//! The temporary manifest is deleted exactly once per run, before the final
//! `COMPLETE` frame is sent, on every path: finished, fatal or cancelled.

use crate::config::{Config, PipelineConfig};
use crate::error::{Error, Result};
use crate::fetcher::{DocumentFetcher, HttpFetcher};
use crate::manifest::{read_manifest, validate_row};
use crate::progress::ProgressEmitter;
use crate::types::{
    FetchOutcome, ProgressEvent, Row, RowOutcome, RunCounters, RunOutcome, RunReport, UsableRow,
};
use crate::writer::{self, FsOutputWriter, OutputWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// An uploaded manifest on disk, owned by exactly one run
///
/// [`release`](Self::release) consumes the handle, so the file cannot be
/// released twice. A handle dropped without being released (for example when
/// the run's task is aborted) removes the file synchronously.
#[derive(Debug)]
pub struct TempManifest {
    path: PathBuf,
    released: bool,
}

impl TempManifest {
    /// Take ownership of an existing file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            released: false,
        }
    }

    /// Store uploaded bytes as `uploaded_<timestamp>_<random>.csv` in `upload_dir`
    ///
    /// The directory is created if needed and is left in place afterwards.
    pub async fn create(upload_dir: &Path, contents: &[u8]) -> Result<Self> {
        tokio::fs::create_dir_all(upload_dir).await?;

        let suffix: u32 = rand::random();
        let name = format!("uploaded_{}_{:08x}.csv", writer::run_timestamp(), suffix);
        let manifest = Self::new(upload_dir.join(name));

        tokio::fs::write(&manifest.path, contents).await?;
        debug!(path = ?manifest.path, bytes = contents.len(), "manifest stored");

        Ok(manifest)
    }

    /// Location of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file; a file that is already gone is not an error
    pub async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = ?self.path, "temporary manifest removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "temporary manifest already gone")
            }
            Err(e) => warn!(path = ?self.path, error = %e, "failed to remove temporary manifest"),
        }
    }
}

impl Drop for TempManifest {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = ?self.path, error = %e, "failed to remove abandoned manifest");
        }
    }
}

/// Where a single row is in its lifecycle
#[derive(Debug)]
enum RowState {
    Validating,
    Fetching(UsableRow),
    Persisting { url: String, bytes: Vec<u8> },
    Reporting(RowOutcome),
}

/// Per-run values fixed when the run starts
struct RunContext<'a> {
    directory: &'a Path,
    run_timestamp: String,
}

/// Sequential batch downloader
///
/// The pipeline itself is stateless between runs and can be shared behind an
/// `Arc`; every run gets its own manifest, counters and event channel.
///
/// # Examples
///
/// ```no_run
/// use manifest_dl::{BatchPipeline, Config, TempManifest};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pipeline = Arc::new(BatchPipeline::from_config(&Config::default())?);
/// let manifest = TempManifest::create("uploads".as_ref(), b"header\n").await?;
///
/// let mut events = pipeline.spawn_run(manifest, "downloads".into());
/// while let Some(event) = events.recv().await {
///     println!("{}", event.payload());
/// }
/// # Ok(())
/// # }
/// ```
pub struct BatchPipeline {
    fetcher: Arc<dyn DocumentFetcher>,
    writer: Arc<dyn OutputWriter>,
    config: PipelineConfig,
    shutdown: CancellationToken,
}

impl BatchPipeline {
    /// Build a pipeline from explicit collaborators
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        writer: Arc<dyn OutputWriter>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            writer,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Build a pipeline that fetches over HTTP and writes to the local filesystem
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(FsOutputWriter),
            config.pipeline.clone(),
        ))
    }

    /// Stop in-flight runs when `token` is cancelled
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Token that cancels every run of this pipeline
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Start a run on its own task and return its event stream
    ///
    /// Dropping the receiver cancels the run at the next suspension point.
    pub fn spawn_run(
        self: &Arc<Self>,
        manifest: TempManifest,
        directory: PathBuf,
    ) -> mpsc::Receiver<ProgressEvent> {
        let (emitter, rx) = ProgressEmitter::channel(self.config.event_buffer.max(1));
        let pipeline = Arc::clone(self);

        debug!(manifest = %manifest.path().display(), ?directory, "spawning run");
        tokio::spawn(async move {
            pipeline.run(manifest, directory, emitter).await;
        });

        rx
    }

    /// Execute a full run, always ending the event stream with `COMPLETE`
    /// unless the consumer is already gone
    ///
    /// A run stopped by the shutdown token reports `❌ Fatal Error: run
    /// cancelled` before the sentinel.
    pub async fn run(
        &self,
        manifest: TempManifest,
        directory: PathBuf,
        emitter: ProgressEmitter,
    ) -> RunReport {
        let mut counters = RunCounters::default();
        let result = self
            .process_manifest(manifest.path(), &directory, &emitter, &mut counters)
            .await;

        manifest.release().await;

        let outcome = match result {
            Ok(()) => {
                info!(
                    total = counters.total,
                    downloaded = counters.downloaded,
                    failed = counters.failed,
                    ?directory,
                    "run finished"
                );
                if emitter.summary(&counters, &directory).await.is_ok() {
                    emitter.done().await.ok();
                }
                RunOutcome::Finished
            }
            Err(Error::Cancelled) => {
                info!(processed = counters.processed(), "run cancelled");
                // on server shutdown the client may still be listening
                if !emitter.is_closed()
                    && emitter
                        .fatal(&Error::Cancelled.to_string())
                        .await
                        .is_ok()
                {
                    emitter.done().await.ok();
                }
                RunOutcome::Cancelled
            }
            Err(e) => {
                error!(error = %e, processed = counters.processed(), "run aborted");
                let message = e.to_string();
                if emitter.fatal(&message).await.is_ok() {
                    emitter.done().await.ok();
                }
                RunOutcome::Fatal(message)
            }
        };

        RunReport { counters, outcome }
    }

    async fn process_manifest(
        &self,
        manifest_path: &Path,
        directory: &Path,
        emitter: &ProgressEmitter,
        counters: &mut RunCounters,
    ) -> Result<()> {
        let rows = read_manifest(manifest_path).await?;
        *counters = RunCounters::new(rows.len());
        emitter.started(rows.len()).await?;

        self.writer.prepare(directory).await?;

        let ctx = RunContext {
            directory,
            run_timestamp: writer::run_timestamp(),
        };
        info!(total = rows.len(), run_timestamp = %ctx.run_timestamp, "run started");

        for (i, row) in rows.iter().enumerate() {
            let row_index = i + 1;
            if self.shutdown.is_cancelled() || emitter.is_closed() {
                return Err(Error::Cancelled);
            }

            let outcome = self.process_row(&ctx, row_index, row, emitter).await?;
            counters.record(&outcome);
            if !outcome.is_success() {
                warn!(row = row_index, ?outcome, "row failed");
            }

            emitter.row_result(row_index, &outcome).await?;
            emitter.progress(row_index, counters.total).await?;

            if !self.config.pacing_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.pacing_delay) => {}
                    _ = self.shutdown.cancelled() => return Err(Error::Cancelled),
                }
            }
        }

        Ok(())
    }

    /// Drive one row to its outcome
    ///
    /// Only fails with [`Error::Cancelled`]; every row-level problem is an outcome.
    async fn process_row(
        &self,
        ctx: &RunContext<'_>,
        row_index: usize,
        row: &Row,
        emitter: &ProgressEmitter,
    ) -> Result<RowOutcome> {
        let mut state = RowState::Validating;

        loop {
            state = match state {
                RowState::Validating => match validate_row(row) {
                    Ok(usable) => RowState::Fetching(usable),
                    Err(reason) => RowState::Reporting(RowOutcome::Invalid(reason)),
                },
                RowState::Fetching(usable) => {
                    emitter.fetching(&usable.label).await?;
                    let UsableRow { url, .. } = usable;

                    let outcome = tokio::select! {
                        outcome = self.fetcher.fetch(&url) => outcome,
                        _ = self.shutdown.cancelled() => return Err(Error::Cancelled),
                        _ = emitter.closed() => return Err(Error::Cancelled),
                    };

                    match outcome {
                        FetchOutcome::Success(bytes) => RowState::Persisting { url, bytes },
                        FetchOutcome::HttpFailure(status) => {
                            RowState::Reporting(RowOutcome::HttpFailure { url, status })
                        }
                        FetchOutcome::TransportFailure(message) => {
                            RowState::Reporting(RowOutcome::TransportFailure { url, message })
                        }
                    }
                }
                RowState::Persisting { url, bytes } => {
                    match self
                        .writer
                        .write(ctx.directory, &ctx.run_timestamp, row_index, &bytes)
                        .await
                    {
                        Ok(filename) => RowState::Reporting(RowOutcome::Downloaded {
                            filename,
                            bytes: bytes.len(),
                        }),
                        Err(e) => RowState::Reporting(RowOutcome::WriteFailure {
                            url,
                            message: e.to_string(),
                        }),
                    }
                }
                RowState::Reporting(outcome) => return Ok(outcome),
            };
        }
    }
}
