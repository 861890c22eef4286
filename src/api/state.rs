//! Application state for the API server

use crate::{BatchPipeline, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request; both fields are behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Pipeline that executes uploaded manifests
    pub pipeline: Arc<BatchPipeline>,

    /// Configuration (read only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(pipeline: Arc<BatchPipeline>, config: Arc<Config>) -> Self {
        Self { pipeline, config }
    }
}
