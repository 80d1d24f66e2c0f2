//! umr-ri - Reading Ingest service
//!
//! Accepts photographed utility-meter uploads, extracts the numeric value
//! through the Gemini vision API, and manages the reading lifecycle
//! (unconfirmed → confirmed).

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use umr_common::config::{self, RootFolder};
use umr_ri::services::GeminiVision;
use umr_ri::AppState;

const LISTEN_ADDR: &str = "127.0.0.1:5810";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting UMR Reading Ingest (umr-ri) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // Resolve root folder (ENV → TOML → OS default) and create the layout
    let toml_config = config::load_default_config();
    let root = RootFolder::new(config::resolve_root_folder(&toml_config));
    root.ensure_directories()?;

    let db_path = root.database_path();
    info!("Database: {}", db_path.display());

    let db_pool = umr_ri::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Recognition provider: Gemini, keyed via Database → ENV → TOML
    let api_key = umr_ri::config::resolve_gemini_api_key(&db_pool, &toml_config).await?;
    let recognition = GeminiVision::new(api_key)
        .map_err(|e| anyhow::anyhow!("Failed to construct Gemini client: {}", e))?;

    let staging = umr_ri::services::StagingArea::new(root.staging_dir())?;
    info!("Staging directory: {}", staging.dir().display());

    let state = AppState::new(db_pool, Arc::new(recognition), staging);
    let app = umr_ri::build_router(state);

    let listener = tokio::net::TcpListener::bind(LISTEN_ADDR).await?;
    info!("Listening on http://{}", LISTEN_ADDR);
    info!("Health check: http://{}/health", LISTEN_ADDR);

    axum::serve(listener, app).await?;

    Ok(())
}
