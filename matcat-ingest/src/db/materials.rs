//! Material catalog persistence

use matcat_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Canonical material record
#[derive(Debug, Clone)]
pub struct Material {
    pub material_id: Uuid,
    pub studio_id: Uuid,
    pub name: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub reference_code: Option<String>,
    pub dimensions: Option<String>,
    pub manufacturer_id: Option<Uuid>,
    pub notes: Option<String>,
}

impl Material {
    pub fn new(studio_id: Uuid, name: String, category: String) -> Self {
        Self {
            material_id: Uuid::new_v4(),
            studio_id,
            name,
            category,
            subcategory: None,
            reference_code: None,
            dimensions: None,
            manufacturer_id: None,
            notes: None,
        }
    }
}

fn row_to_material(row: &sqlx::sqlite::SqliteRow) -> Result<Material> {
    let id: String = row.get("material_id");
    let studio: String = row.get("studio_id");
    let manufacturer: Option<String> = row.get("manufacturer_id");

    Ok(Material {
        material_id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("Failed to parse material_id: {}", e)))?,
        studio_id: Uuid::parse_str(&studio)
            .map_err(|e| Error::Internal(format!("Failed to parse studio_id: {}", e)))?,
        name: row.get("name"),
        category: row.get("category"),
        subcategory: row.get("subcategory"),
        reference_code: row.get("reference_code"),
        dimensions: row.get("dimensions"),
        manufacturer_id: manufacturer
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| Error::Internal(format!("Failed to parse manufacturer_id: {}", e)))?,
        notes: row.get("notes"),
    })
}

/// Save material (insert or update by id)
pub async fn save_material(pool: &SqlitePool, material: &Material) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO materials (
            material_id, studio_id, name, category, subcategory, reference_code,
            dimensions, manufacturer_id, notes, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(material_id) DO UPDATE SET
            name = excluded.name,
            category = excluded.category,
            subcategory = excluded.subcategory,
            reference_code = excluded.reference_code,
            dimensions = excluded.dimensions,
            manufacturer_id = excluded.manufacturer_id,
            notes = excluded.notes,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(material.material_id.to_string())
    .bind(material.studio_id.to_string())
    .bind(&material.name)
    .bind(&material.category)
    .bind(&material.subcategory)
    .bind(&material.reference_code)
    .bind(&material.dimensions)
    .bind(material.manufacturer_id.map(|id| id.to_string()))
    .bind(&material.notes)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one material by id, tenant-scoped
pub async fn load_material(
    pool: &SqlitePool,
    studio_id: Uuid,
    material_id: Uuid,
) -> Result<Option<Material>> {
    let row = sqlx::query(
        r#"
        SELECT material_id, studio_id, name, category, subcategory, reference_code,
               dimensions, manufacturer_id, notes
        FROM materials
        WHERE studio_id = ? AND material_id = ?
        "#,
    )
    .bind(studio_id.to_string())
    .bind(material_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(|r| row_to_material(&r)).transpose()
}

/// List all materials for a studio
pub async fn list_materials(pool: &SqlitePool, studio_id: Uuid) -> Result<Vec<Material>> {
    let rows = sqlx::query(
        r#"
        SELECT material_id, studio_id, name, category, subcategory, reference_code,
               dimensions, manufacturer_id, notes
        FROM materials
        WHERE studio_id = ?
        ORDER BY name
        "#,
    )
    .bind(studio_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_material).collect()
}

/// Delete a material, removing dependent project associations first
///
/// A material is never hard-deleted while associations reference it; the
/// associations go in the same transaction, preserving referential integrity.
pub async fn delete_material(pool: &SqlitePool, studio_id: Uuid, material_id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM project_materials WHERE studio_id = ? AND material_id = ?")
        .bind(studio_id.to_string())
        .bind(material_id.to_string())
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM materials WHERE studio_id = ? AND material_id = ?")
        .bind(studio_id.to_string())
        .bind(material_id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::projects::{self, Project, ProjectAssociation};

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        crate::db::schema::initialize_schema(&pool)
            .await
            .expect("Schema initialization failed");

        let studio = Uuid::new_v4();
        let mut material = Material::new(studio, "White Oak Flooring".into(), "Flooring".into());
        material.reference_code = Some("WO-3-NAT".into());

        save_material(&pool, &material).await.unwrap();

        let loaded = load_material(&pool, studio, material.material_id)
            .await
            .unwrap()
            .expect("Material not found");
        assert_eq!(loaded.name, "White Oak Flooring");
        assert_eq!(loaded.reference_code.as_deref(), Some("WO-3-NAT"));
    }

    #[tokio::test]
    async fn delete_removes_dependent_associations_first() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::schema::initialize_schema(&pool).await.unwrap();

        let studio = Uuid::new_v4();
        let material = Material::new(studio, "White Oak Flooring".into(), "Flooring".into());
        save_material(&pool, &material).await.unwrap();

        let project = Project::new(studio, "Hotel Lobby".into());
        projects::save_project(&pool, &project).await.unwrap();
        projects::associate_if_absent(
            &pool,
            &ProjectAssociation {
                project_id: project.project_id,
                material_id: material.material_id,
                studio_id: studio,
                quantity: None,
                unit_cost: None,
                notes: None,
            },
        )
        .await
        .unwrap();

        delete_material(&pool, studio, material.material_id)
            .await
            .unwrap();

        assert!(load_material(&pool, studio, material.material_id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            projects::count_associations(&pool, project.project_id, material.material_id)
                .await
                .unwrap(),
            0
        );
    }
}

