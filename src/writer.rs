//! Persisting fetched documents
//!
//! Files are named `resume_<run timestamp>_<row index>.pdf`. The timestamp is
//! taken once when a run starts and the row index is the 1-based position in
//! the manifest, so names never collide inside a run. Two runs started in the
//! same second into the same directory would collide; that is accepted.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use std::path::Path;
use tracing::debug;

/// Prefix of every written document
pub const FILE_PREFIX: &str = "resume";

/// Extension of every written document
pub const FILE_EXTENSION: &str = "pdf";

/// Format a run timestamp as `YYYYMMDD_HHMMSS`
pub fn format_run_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Timestamp for a run starting now, in local time
pub fn run_timestamp() -> String {
    format_run_timestamp(&Local::now())
}

/// Deterministic filename for the document of `row_index` (1-based)
pub fn document_filename(run_timestamp: &str, row_index: usize) -> String {
    format!("{FILE_PREFIX}_{run_timestamp}_{row_index}.{FILE_EXTENSION}")
}

/// Destination for fetched documents
#[async_trait]
pub trait OutputWriter: Send + Sync {
    /// Create `directory` and its parents if missing
    ///
    /// Must be idempotent: calling it again on an existing directory is a no-op.
    async fn prepare(&self, directory: &Path) -> Result<()>;

    /// Store `bytes` for the given row and return the filename used
    async fn write(
        &self,
        directory: &Path,
        run_timestamp: &str,
        row_index: usize,
        bytes: &[u8],
    ) -> Result<String>;
}

/// [`OutputWriter`] that writes plain files with tokio::fs
#[derive(Clone, Copy, Debug, Default)]
pub struct FsOutputWriter;

#[async_trait]
impl OutputWriter for FsOutputWriter {
    async fn prepare(&self, directory: &Path) -> Result<()> {
        tokio::fs::create_dir_all(directory).await?;
        debug!(?directory, "output directory ready");
        Ok(())
    }

    async fn write(
        &self,
        directory: &Path,
        run_timestamp: &str,
        row_index: usize,
        bytes: &[u8],
    ) -> Result<String> {
        let filename = document_filename(run_timestamp, row_index);
        let path = directory.join(&filename);

        tokio::fs::write(&path, bytes).await?;
        debug!(?path, bytes = bytes.len(), "document written");

        Ok(filename)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn timestamp_has_second_granularity_layout() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(format_run_timestamp(&at), "20240307_090502");
    }

    #[test]
    fn filename_is_deterministic() {
        assert_eq!(
            document_filename("20240307_090502", 2),
            "resume_20240307_090502_2.pdf"
        );
        assert_eq!(
            document_filename("20240307_090502", 2),
            document_filename("20240307_090502", 2)
        );
    }

    #[test]
    fn live_timestamp_matches_pattern() {
        let stamp = run_timestamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'_');
        assert!(
            stamp
                .chars()
                .enumerate()
                .all(|(i, c)| i == 8 || c.is_ascii_digit())
        );
    }

    #[tokio::test]
    async fn prepare_creates_nested_directories_idempotently() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("a").join("b");

        FsOutputWriter.prepare(&target).await.unwrap();
        assert!(target.is_dir());

        std::fs::write(target.join("keep.txt"), b"x").unwrap();
        FsOutputWriter.prepare(&target).await.unwrap();

        assert!(target.is_dir());
        assert!(
            target.join("keep.txt").exists(),
            "second prepare must not disturb contents"
        );
    }

    #[tokio::test]
    async fn write_stores_bytes_under_deterministic_name() {
        let temp = tempfile::tempdir().unwrap();
        let bytes = vec![1u8; 1024];

        let filename = FsOutputWriter
            .write(temp.path(), "20240307_090502", 3, &bytes)
            .await
            .unwrap();

        assert_eq!(filename, "resume_20240307_090502_3.pdf");
        assert_eq!(std::fs::read(temp.path().join(&filename)).unwrap(), bytes);
    }

    #[tokio::test]
    async fn write_into_missing_directory_fails_with_io() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("never-created");

        let err = FsOutputWriter
            .write(&missing, "20240307_090502", 1, b"x")
            .await
            .unwrap_err();

        assert!(matches!(err, crate::Error::Io(_)));
    }

    #[tokio::test]
    async fn prepare_fails_when_path_is_a_file() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        assert!(FsOutputWriter.prepare(&file).await.is_err());
    }
}
