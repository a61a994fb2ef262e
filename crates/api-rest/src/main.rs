//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! This binary is useful for development and debugging when you only want the REST
//! server (with OpenAPI/Swagger UI). The workspace's main `nir-run` binary is the
//! usual entry point for deployments.

use std::path::Path;
use std::sync::Arc;

use nir_core::{constants::DEFAULT_REGULATION_DATA_DIR, CoreConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the regulation REST API server.
///
/// Starts the REST API server on the configured address (default: 0.0.0.0:3000).
///
/// # Environment Variables
/// - `NIR_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `REGULATION_DATA_DIR`: Record storage root (default: "/regulation_data")
/// - `NIR_FACILITY`: Facility name for commit metadata (required)
/// - `API_KEY`: Optional API key; when unset the API runs open
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the storage directory does not exist,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("NIR_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting regulation REST API on {}", addr);

    let regulation_data_dir =
        std::env::var("REGULATION_DATA_DIR").unwrap_or_else(|_| DEFAULT_REGULATION_DATA_DIR.into());
    let regulation_data_path = Path::new(&regulation_data_dir);
    if !regulation_data_path.exists() {
        anyhow::bail!(
            "Regulation data directory does not exist: {}",
            regulation_data_path.display()
        );
    }

    let facility_name = std::env::var("NIR_FACILITY")
        .map_err(|_| anyhow::anyhow!("NIR_FACILITY must be set to the facility name"))?;
    let api_key = std::env::var("API_KEY").ok();

    let cfg = Arc::new(CoreConfig::new(
        regulation_data_path.to_path_buf(),
        facility_name,
    )?);

    let app = api_rest::router(api_rest::AppState::new(cfg, api_key));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
