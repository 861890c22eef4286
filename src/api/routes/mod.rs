//! Route handlers for the HTTP API
//!
//! - [`runs`] — Upload form and batch runs streamed as server-sent events
//! - [`system`] — Health and OpenAPI

mod runs;
mod system;

pub use runs::*;
pub use system::*;
