//! HTTP API server module
//!
//! Serves the upload form, accepts manifests and streams each run's progress
//! back to the uploader as server-sent events.

use crate::{BatchPipeline, Config, Result};
use axum::{Router, extract::DefaultBodyLimit, http::HeaderValue, routing::get};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Runs
/// - `GET /` - Upload form, or a single `Connected` frame for SSE clients
/// - `POST /` - Upload a manifest (`file`) and target `directory`, stream progress
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(pipeline: Arc<BatchPipeline>, config: Arc<Config>) -> Router {
    let state = AppState::new(pipeline, config.clone());

    let router = Router::new()
        // Runs
        .route("/", get(routes::index).post(routes::start_run))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec));

    // Swagger UI gets its own document path; /openapi.json is already taken
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.upload.max_manifest_bytes))
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` anywhere in the list, or an empty list, allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address
///
/// Runs until SIGINT/SIGTERM (Ctrl+C on non-unix platforms). In-flight runs
/// are cancelled when the signal arrives and the server waits for their
/// streams to finish.
///
/// # Example
///
/// ```no_run
/// use manifest_dl::Config;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
///
/// // blocks until shutdown
/// manifest_dl::api::start_api_server(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    serve(listener, config, crate::shutdown_signal()).await
}

/// Serve the API on an already bound listener until `signal` resolves
///
/// Creates the upload directory, builds the pipeline from `config` and wires
/// the shutdown token so that `signal` also cancels in-flight runs.
pub async fn serve<F>(listener: TcpListener, config: Arc<Config>, signal: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;
    tokio::fs::create_dir_all(&config.upload.upload_dir).await?;

    let pipeline = Arc::new(BatchPipeline::from_config(&config)?);
    let shutdown = pipeline.shutdown_token();
    let app = create_router(pipeline, config);

    if let Ok(address) = listener.local_addr() {
        tracing::info!(address = %address, "API server listening");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            tracing::info!("shutting down, cancelling in-flight runs");
            shutdown.cancel();
        })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
