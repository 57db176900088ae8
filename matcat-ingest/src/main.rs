//! matcat-ingest - Catalog Ingest Microservice
//!
//! **Module Identity:**
//! - Name: matcat-ingest (Catalog Ingest)
//! - Port: 5730
//!
//! Responsible for importing candidate materials and manufacturers into the
//! studio catalog with duplicate-aware matching, human resolution, and a
//! reviewer approval gate.

use anyhow::Result;
use matcat_common::events::EventBus;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use matcat_ingest::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting matcat-ingest (Catalog Ingest) microservice");
    info!("Port: 5730");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Step 1: Resolve root folder
    let resolver = matcat_common::config::RootFolderResolver::new("catalog-ingest");
    let root_folder = resolver.resolve();

    // Step 2: Create root folder directory if missing
    let initializer = matcat_common::config::RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;

    // Step 3: Open or create database
    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());

    let db_pool = matcat_ingest::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Step 4: Regress submissions orphaned by a previous run
    let regressed = matcat_ingest::db::submissions::cleanup_stale_processing(&db_pool).await?;
    if regressed > 0 {
        info!(
            regressed,
            "Regressed stale processing submissions to pending"
        );
    }

    // Create event bus for SSE broadcasting
    let event_bus = EventBus::new(100); // 100 event capacity
    info!("Event bus initialized");

    // Create application state
    let state = AppState::new(db_pool, event_bus);

    // Build router
    let app = matcat_ingest::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind("127.0.0.1:5730").await?;
    info!("Listening on http://127.0.0.1:5730");
    info!("Health check: http://127.0.0.1:5730/health");

    axum::serve(listener, app).await?;

    Ok(())
}
