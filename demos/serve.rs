//! Upload server demo
//!
//! Serves the upload form on http://127.0.0.1:5000 (or the address from the
//! config file). Pick a CSV manifest and a target directory in the browser
//! and watch the progress frames arrive.
//!
//! ```sh
//! cargo run --example serve
//! cargo run --example serve -- config.json
//! RUST_LOG=manifest_dl=debug,tower_http=debug cargo run --example serve
//! ```
//!
//! The optional config file is JSON; every section may be omitted:
//!
//! ```json
//! { "fetch": { "timeout": 30 }, "pipeline": { "pacing_delay": 0 }, "api": { "bind_address": "0.0.0.0:5000" } }
//! ```

use manifest_dl::Config;
use manifest_dl::api::start_api_server;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };

    println!("Upload form:  http://{}/", config.api.bind_address);
    if config.api.swagger_ui {
        println!("Swagger UI:   http://{}/swagger-ui", config.api.bind_address);
    }

    start_api_server(Arc::new(config)).await?;
    Ok(())
}
