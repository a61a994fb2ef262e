use std::path::PathBuf;
use std::sync::Arc;

use nir_core::{constants::DEFAULT_REGULATION_DATA_DIR, CoreConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the regulation service.
///
/// Starts the REST server (with OpenAPI/Swagger UI) and creates the storage root
/// on first run.
///
/// # Environment Variables
/// - `NIR_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `REGULATION_DATA_DIR`: Directory for regulation record storage (default: "/regulation_data")
/// - `NIR_FACILITY`: Facility name stamped into commit metadata (required)
/// - `API_KEY`: Optional API key for the regulation endpoints; unset means open access
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("nir=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("NIR_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let regulation_data_dir: PathBuf = std::env::var("REGULATION_DATA_DIR")
        .unwrap_or_else(|_| DEFAULT_REGULATION_DATA_DIR.into())
        .into();
    std::fs::create_dir_all(&regulation_data_dir)?;

    let facility_name = std::env::var("NIR_FACILITY")
        .map_err(|_| anyhow::anyhow!("NIR_FACILITY must be set to the facility name"))?;
    let api_key = std::env::var("API_KEY").ok();
    if api_key.is_none() {
        tracing::warn!("API_KEY not set; regulation endpoints run without authentication");
    }

    let cfg = Arc::new(CoreConfig::new(regulation_data_dir, facility_name)?);

    tracing::info!("++ Starting regulation REST API on {}", rest_addr);
    tracing::info!(
        "++ Regulation data directory: {}",
        cfg.regulation_data_dir().display()
    );

    let app = api_rest::router(api_rest::AppState::new(cfg, api_key));

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
