//! Database access for matcat-ingest
//!
//! Shared SQLite database access, tenant-scoped throughout.

pub mod manufacturers;
pub mod materials;
pub mod pending;
pub mod projects;
pub mod schema;
pub mod settings;
pub mod submissions;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to the shared matcat.db in the root folder and initializes the
/// ingest service's tables.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let pool = matcat_common::db::connect_pool(db_path).await?;

    schema::initialize_schema(&pool).await?;

    Ok(pool)
}
