//! Database test utilities
//!
//! Pools, schema setup, and seed helpers shared across integration tests.

#![allow(dead_code)]

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

use matcat_ingest::db;
use matcat_ingest::db::manufacturers::Manufacturer;
use matcat_ingest::db::materials::Material;
use matcat_ingest::db::projects::Project;
use matcat_ingest::models::{Candidate, EntityKind, Submission, SubmissionState};

/// In-memory pool with schema applied
///
/// Single connection: every sqlite::memory: connection is its own database,
/// so the pool must not open a second one.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    db::schema::initialize_schema(&pool)
        .await
        .expect("Schema initialization failed");

    pool
}

/// File-backed pool for tests that exercise real connection concurrency
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for the
/// duration of the test.
pub async fn file_pool() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test_matcat.db");

    let pool = db::init_database_pool(&db_path)
        .await
        .expect("Failed to initialize test database");

    (temp_dir, pool)
}

/// Minimal material candidate
pub fn material_candidate(name: &str, category: &str) -> Candidate {
    Candidate {
        kind: EntityKind::Material,
        name: name.to_string(),
        category: Some(category.to_string()),
        subcategory: None,
        reference_code: None,
        dimensions: None,
        manufacturer_id: None,
        manufacturer_name: None,
        website: None,
        contact_email: None,
        contact_phone: None,
        notes: None,
    }
}

/// Minimal manufacturer candidate
pub fn manufacturer_candidate(name: &str) -> Candidate {
    let mut candidate = material_candidate(name, "");
    candidate.kind = EntityKind::Manufacturer;
    candidate.category = None;
    candidate
}

/// Seed a canonical manufacturer, returning its id
pub async fn seed_manufacturer(pool: &SqlitePool, studio_id: Uuid, name: &str) -> Uuid {
    let manufacturer = Manufacturer::new(studio_id, name.to_string());
    let id = manufacturer.manufacturer_id;
    db::manufacturers::save_manufacturer(pool, &manufacturer)
        .await
        .expect("Failed to seed manufacturer");
    id
}

/// Seed a canonical material, returning its id
pub async fn seed_material(
    pool: &SqlitePool,
    studio_id: Uuid,
    name: &str,
    category: &str,
    reference_code: Option<&str>,
    manufacturer_id: Option<Uuid>,
) -> Uuid {
    let mut material = Material::new(studio_id, name.to_string(), category.to_string());
    material.reference_code = reference_code.map(|s| s.to_string());
    material.manufacturer_id = manufacturer_id;
    let id = material.material_id;
    db::materials::save_material(pool, &material)
        .await
        .expect("Failed to seed material");
    id
}

/// Seed a project, returning its id
pub async fn seed_project(pool: &SqlitePool, studio_id: Uuid, name: &str) -> Uuid {
    let project = Project::new(studio_id, name.to_string());
    let id = project.project_id;
    db::projects::save_project(pool, &project)
        .await
        .expect("Failed to seed project");
    id
}

/// Create a submission already in ready_for_review with stored candidates
pub async fn ready_submission(
    pool: &SqlitePool,
    studio_id: Uuid,
    project_id: Option<Uuid>,
    candidates: Vec<Candidate>,
) -> Uuid {
    let mut submission = Submission::new(studio_id, "test batch".to_string(), project_id);
    submission.candidate_count = candidates.len();
    submission.state = SubmissionState::ReadyForReview;
    let id = submission.submission_id;

    db::submissions::save_submission(pool, &submission)
        .await
        .expect("Failed to seed submission");
    db::submissions::set_candidates(pool, id, &candidates)
        .await
        .expect("Failed to store candidates");

    id
}

/// Count materials for a studio
pub async fn count_materials(pool: &SqlitePool, studio_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM materials WHERE studio_id = ?")
        .bind(studio_id.to_string())
        .fetch_one(pool)
        .await
        .expect("Failed to count materials")
}
