//! Manifest parsing and row validation
//!
//! A manifest is comma-separated text with one header line followed by one
//! line per subject. Lines are split individually, so the number of rows is
//! always the number of input lines minus one; a blank line becomes an empty
//! row and is rejected later by [`validate_row`]. A quoted field cannot span
//! lines: a newline inside quotes ends the row like any other, unlike a
//! record-oriented CSV reader.

use crate::error::{ManifestError, Result};
use crate::types::{Manifest, Row, URL_COLUMN, UsableRow, ValidationFailure};

const UTF8_BOM: &str = "\u{feff}";

/// Parse raw manifest bytes, discarding the header line
///
/// Tolerates a leading UTF-8 byte-order mark and both `\n` and `\r\n` line
/// endings. Fields may be double-quoted to contain commas; stray or
/// unbalanced quotes are read leniently rather than rejected.
///
/// # Errors
///
/// - [`ManifestError::Empty`] when the input has no lines at all
/// - [`ManifestError::Encoding`] when the input is not UTF-8
pub fn parse_manifest(bytes: Vec<u8>) -> Result<Manifest> {
    let text = String::from_utf8(bytes).map_err(ManifestError::Encoding)?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(&text);

    let mut lines = text.lines();
    let header = lines.next().ok_or(ManifestError::Empty)?;
    tracing::trace!(header, "skipping manifest header");

    Ok(lines.map(parse_line).collect())
}

/// Read and parse a manifest file
pub async fn read_manifest(path: &std::path::Path) -> Result<Manifest> {
    let bytes = tokio::fs::read(path).await?;
    parse_manifest(bytes)
}

fn parse_line(line: &str) -> Row {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    // a flexible reader over valid UTF-8 has no error path
    match reader.records().next() {
        Some(Ok(record)) => record.iter().collect(),
        _ => Row::default(),
    }
}

/// Decide whether a row can be fetched
///
/// Runs before any network access for the row.
pub fn validate_row(row: &Row) -> std::result::Result<UsableRow, ValidationFailure> {
    if row.len() <= URL_COLUMN {
        return Err(ValidationFailure::InsufficientColumns);
    }

    let url = row.field(URL_COLUMN).map(str::trim).unwrap_or("");
    if url.is_empty() {
        return Err(ValidationFailure::EmptyUrl);
    }

    Ok(UsableRow {
        url: url.to_string(),
        label: row.label().to_string(),
    })
}
