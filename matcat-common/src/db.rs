//! Shared database pool initialization

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (or create) the shared SQLite database at the given path.
///
/// Uses mode=rwc (read, write, create). Schema initialization is the
/// responsibility of each service; this only establishes the pool.
pub async fn connect_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    Ok(pool)
}
