//! Configuration types for manifest-dl
//!
//! The target directory for fetched documents is deliberately absent here: it
//! is chosen per run by the caller and handed to the pipeline when the run
//! starts.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Document fetching configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FetchConfig {
    /// Per-request timeout in seconds (default: 60)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub timeout: Duration,

    /// Optional User-Agent header sent with every request
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            user_agent: None,
        }
    }
}

/// Batch run behavior
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PipelineConfig {
    /// Delay inserted after each row's events, in milliseconds (default: 100)
    ///
    /// Zero disables pacing.
    #[serde(default = "default_pacing_delay", with = "millis_serde")]
    #[schema(value_type = u64)]
    pub pacing_delay: Duration,

    /// Capacity of the channel between a run and its event consumer (default: 64)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pacing_delay: default_pacing_delay(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Manifest upload handling
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadConfig {
    /// Directory holding uploaded manifests while their run is in progress (default: "./uploads")
    ///
    /// Shared by all runs. Runs delete only their own manifest file, never this directory.
    #[serde(default = "default_upload_dir")]
    #[schema(value_type = String)]
    pub upload_dir: PathBuf,

    /// Maximum accepted request body size for uploads in bytes (default: 10 MiB)
    #[serde(default = "default_max_manifest_bytes")]
    pub max_manifest_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_manifest_bytes: default_max_manifest_bytes(),
        }
    }
}

/// HTTP API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:5000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration
///
/// Every section has defaults, so `{}` is a complete configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// HTTP fetching of manifest documents
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Batch run pacing and buffering
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Temporary manifest storage
    #[serde(default)]
    pub upload: UploadConfig,

    /// HTTP API server
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Check values that deserialize fine but cannot work at runtime
    pub fn validate(&self) -> Result<()> {
        if self.fetch.timeout.is_zero() {
            return Err(Error::Config {
                message: "fetch timeout must be greater than zero".to_string(),
                key: Some("fetch.timeout".to_string()),
            });
        }
        if self.pipeline.event_buffer == 0 {
            return Err(Error::Config {
                message: "event buffer must hold at least one event".to_string(),
                key: Some("pipeline.event_buffer".to_string()),
            });
        }
        Ok(())
    }
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_pacing_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_event_buffer() -> usize {
    64
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_max_manifest_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Duration serialization helper (milliseconds)
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
