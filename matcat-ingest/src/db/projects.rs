//! Project and project-association persistence
//!
//! Associations are the many-to-many link between projects and catalog
//! entities. At most one association exists per (project, material) pair;
//! duplicate creation is a no-op, never an error.

use matcat_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Project record (collaborator data; owned by the wider catalog, read here)
#[derive(Debug, Clone)]
pub struct Project {
    pub project_id: Uuid,
    pub studio_id: Uuid,
    pub name: String,
    pub client_name: Option<String>,
}

impl Project {
    pub fn new(studio_id: Uuid, name: String) -> Self {
        Self {
            project_id: Uuid::new_v4(),
            studio_id,
            name,
            client_name: None,
        }
    }
}

/// Project association with optional quantity/cost metadata
#[derive(Debug, Clone)]
pub struct ProjectAssociation {
    pub project_id: Uuid,
    pub material_id: Uuid,
    pub studio_id: Uuid,
    pub quantity: Option<f64>,
    pub unit_cost: Option<f64>,
    pub notes: Option<String>,
}

/// Save project
pub async fn save_project(pool: &SqlitePool, project: &Project) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO projects (project_id, studio_id, name, client_name, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(project_id) DO UPDATE SET
            name = excluded.name,
            client_name = excluded.client_name
        "#,
    )
    .bind(project.project_id.to_string())
    .bind(project.studio_id.to_string())
    .bind(&project.name)
    .bind(&project.client_name)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one project by id, tenant-scoped
pub async fn load_project(
    pool: &SqlitePool,
    studio_id: Uuid,
    project_id: Uuid,
) -> Result<Option<Project>> {
    let row = sqlx::query(
        "SELECT project_id, studio_id, name, client_name FROM projects
         WHERE studio_id = ? AND project_id = ?",
    )
    .bind(studio_id.to_string())
    .bind(project_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let id: String = row.get("project_id");
            let studio: String = row.get("studio_id");
            Ok(Some(Project {
                project_id: Uuid::parse_str(&id)
                    .map_err(|e| Error::Internal(format!("Failed to parse project_id: {}", e)))?,
                studio_id: Uuid::parse_str(&studio)
                    .map_err(|e| Error::Internal(format!("Failed to parse studio_id: {}", e)))?,
                name: row.get("name"),
                client_name: row.get("client_name"),
            }))
        }
        None => Ok(None),
    }
}

/// Create a project association if absent
///
/// Single conditional insert (INSERT OR IGNORE against the primary key) so
/// concurrent approvals targeting the same pair cannot race a check-then-insert
/// window. Returns true when a row was actually inserted.
pub async fn associate_if_absent(
    pool: &SqlitePool,
    association: &ProjectAssociation,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO project_materials (
            project_id, material_id, studio_id, quantity, unit_cost, notes, added_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(association.project_id.to_string())
    .bind(association.material_id.to_string())
    .bind(association.studio_id.to_string())
    .bind(association.quantity)
    .bind(association.unit_cost)
    .bind(&association.notes)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Transaction-scoped variant of [`associate_if_absent`]
pub async fn associate_if_absent_tx(
    tx: &mut sqlx::SqliteConnection,
    association: &ProjectAssociation,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO project_materials (
            project_id, material_id, studio_id, quantity, unit_cost, notes, added_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(association.project_id.to_string())
    .bind(association.material_id.to_string())
    .bind(association.studio_id.to_string())
    .bind(association.quantity)
    .bind(association.unit_cost)
    .bind(&association.notes)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Count associations for a (project, material) pair
pub async fn count_associations(
    pool: &SqlitePool,
    project_id: Uuid,
    material_id: Uuid,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM project_materials WHERE project_id = ? AND material_id = ?",
    )
    .bind(project_id.to_string())
    .bind(material_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Material ids already associated with a project, for match enrichment
pub async fn material_ids_for_project(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<Uuid>> {
    let ids: Vec<String> =
        sqlx::query_scalar("SELECT material_id FROM project_materials WHERE project_id = ?")
            .bind(project_id.to_string())
            .fetch_all(pool)
            .await?;

    ids.iter()
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|e| Error::Internal(format!("Failed to parse material_id: {}", e)))
        })
        .collect()
}
