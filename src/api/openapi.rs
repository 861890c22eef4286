//! OpenAPI documentation and schema generation
//!
//! The document is generated at compile time with utoipa and served from
//! `/openapi.json`; Swagger UI (when enabled) reads its own copy from
//! `/api-docs/openapi.json`.

use utoipa::OpenApi;

/// OpenAPI documentation for the manifest-dl HTTP API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "manifest-dl HTTP API",
        version = "0.1.0",
        description = "Upload a CSV manifest of document URLs and follow the batch download as server-sent events",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        // Runs
        crate::api::routes::index,
        crate::api::routes::start_run,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::config::Config,
        crate::config::FetchConfig,
        crate::config::PipelineConfig,
        crate::config::UploadConfig,
        crate::config::ApiConfig,
        crate::types::RunCounters,
        crate::types::ValidationFailure,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "runs", description = "Manifest upload and progress streaming"),
        (name = "system", description = "Health and API documentation")
    )
)]
pub struct ApiDoc;
