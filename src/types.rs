//! Core types for manifest-dl

use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// Zero-based index of the column holding the subject's display label
pub const LABEL_COLUMN: usize = 6;

/// Zero-based index of the column holding the document URL
pub const URL_COLUMN: usize = 8;

/// One data line of a manifest, as positional fields
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<String>,
}

impl Row {
    /// Create a row from its fields
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Number of fields on the line
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the line had no fields at all (a blank line)
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field at `index`, if present
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Display label (7th column), trimmed; empty when the column is missing
    pub fn label(&self) -> &str {
        self.field(LABEL_COLUMN).map(str::trim).unwrap_or("")
    }
}

impl<S: Into<String>> FromIterator<S> for Row {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Parsed manifest: every line after the header, in input order
pub type Manifest = Vec<Row>;

/// A row that passed validation, with its URL already trimmed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsableRow {
    /// Document URL (trimmed, non-empty)
    pub url: String,
    /// Display label (trimmed, may be empty)
    pub label: String,
}

/// Why a row was rejected before any network access
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFailure {
    /// The row has 8 or fewer fields, so there is no URL column
    InsufficientColumns,
    /// The URL column is blank after trimming
    EmptyUrl,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::InsufficientColumns => f.write_str("Not enough columns"),
            ValidationFailure::EmptyUrl => f.write_str("Empty PDF URL"),
        }
    }
}

/// Result of a single document GET
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Status 200 with the full response body
    Success(Vec<u8>),
    /// Any status other than exactly 200
    HttpFailure(u16),
    /// DNS, connect, timeout or body-read failure
    TransportFailure(String),
}

/// Final outcome for one manifest row
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowOutcome {
    /// Document fetched and written to `filename`
    Downloaded {
        /// Name of the file inside the target directory
        filename: String,
        /// Number of bytes written
        bytes: usize,
    },
    /// Row rejected before fetching
    Invalid(ValidationFailure),
    /// Server answered with a non-200 status
    HttpFailure {
        /// Requested URL
        url: String,
        /// Observed status code
        status: u16,
    },
    /// Request never produced a usable response
    TransportFailure {
        /// Requested URL
        url: String,
        /// Underlying error message
        message: String,
    },
    /// Document fetched but could not be written
    WriteFailure {
        /// Requested URL
        url: String,
        /// Underlying error message
        message: String,
    },
}

impl RowOutcome {
    /// Whether this outcome counts toward `downloaded`
    pub fn is_success(&self) -> bool {
        matches!(self, RowOutcome::Downloaded { .. })
    }
}

/// Running tallies for one run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RunCounters {
    /// Number of rows in the manifest
    pub total: usize,
    /// Rows whose document was written
    pub downloaded: usize,
    /// Rows that failed for any reason
    pub failed: usize,
}

impl RunCounters {
    /// Start a run over `total` rows
    pub fn new(total: usize) -> Self {
        Self {
            total,
            downloaded: 0,
            failed: 0,
        }
    }

    /// Account for one resolved row
    pub fn record(&mut self, outcome: &RowOutcome) {
        if outcome.is_success() {
            self.downloaded += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Rows resolved so far
    pub fn processed(&self) -> usize {
        self.downloaded + self.failed
    }
}

/// One unit of the progress protocol
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// Informational text (run start, "downloading for ...", fatal error)
    Info(String),
    /// Per-row result text
    RowResult(String),
    /// Percentage of rows processed, 0 to 100
    PercentComplete(f64),
    /// Multi-line final report
    Summary(String),
    /// Terminal sentinel; nothing follows it
    Done,
}

/// How a run ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every row was processed and the summary was emitted
    Finished,
    /// A run-level error aborted the remaining rows
    Fatal(String),
    /// The event consumer disconnected or the server is shutting down
    Cancelled,
}

/// What a finished run reports back to its caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Counters at the moment the run stopped
    pub counters: RunCounters,
    /// Terminal state
    pub outcome: RunOutcome,
}
