//! Database schema for matcat-ingest
//!
//! Hand-written CREATE TABLE IF NOT EXISTS statements run on startup.
//! All identifiers are TEXT UUIDs; timestamps are RFC3339 TEXT.

use anyhow::Result;
use sqlx::SqlitePool;

/// Create ingest tables if they don't exist
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS studios (
            studio_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS manufacturers (
            manufacturer_id TEXT PRIMARY KEY,
            studio_id TEXT NOT NULL,
            name TEXT NOT NULL,
            website TEXT,
            contact_email TEXT,
            contact_phone TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_manufacturers_studio ON manufacturers(studio_id, name)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS materials (
            material_id TEXT PRIMARY KEY,
            studio_id TEXT NOT NULL,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            subcategory TEXT,
            reference_code TEXT,
            dimensions TEXT,
            manufacturer_id TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_materials_studio ON materials(studio_id, name)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            project_id TEXT PRIMARY KEY,
            studio_id TEXT NOT NULL,
            name TEXT NOT NULL,
            client_name TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one association per (project, material); duplicate inserts are
    // absorbed with INSERT OR IGNORE against this primary key.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_materials (
            project_id TEXT NOT NULL,
            material_id TEXT NOT NULL,
            studio_id TEXT NOT NULL,
            quantity REAL,
            unit_cost REAL,
            notes TEXT,
            added_at TEXT NOT NULL,
            PRIMARY KEY (project_id, material_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pending_entities (
            pending_id TEXT PRIMARY KEY,
            studio_id TEXT NOT NULL,
            submission_id TEXT,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            project_id TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            linked_entity_id TEXT,
            created_entity_id TEXT,
            reviewer_id TEXT,
            reviewed_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pending_submission ON pending_entities(submission_id, status)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pending_studio ON pending_entities(studio_id, status, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            submission_id TEXT PRIMARY KEY,
            studio_id TEXT NOT NULL,
            state TEXT NOT NULL,
            source_label TEXT NOT NULL,
            project_id TEXT,
            candidate_count INTEGER NOT NULL DEFAULT 0,
            skipped_count INTEGER NOT NULL DEFAULT 0,
            candidates TEXT NOT NULL DEFAULT '[]',
            error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_submissions_studio ON submissions(studio_id, state)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized");

    Ok(())
}
