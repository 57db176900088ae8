//! Manufacturer catalog persistence

use matcat_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Canonical manufacturer record
#[derive(Debug, Clone)]
pub struct Manufacturer {
    pub manufacturer_id: Uuid,
    pub studio_id: Uuid,
    pub name: String,
    pub website: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

impl Manufacturer {
    pub fn new(studio_id: Uuid, name: String) -> Self {
        Self {
            manufacturer_id: Uuid::new_v4(),
            studio_id,
            name,
            website: None,
            contact_email: None,
            contact_phone: None,
            notes: None,
        }
    }
}

fn row_to_manufacturer(row: &sqlx::sqlite::SqliteRow) -> Result<Manufacturer> {
    let id: String = row.get("manufacturer_id");
    let studio: String = row.get("studio_id");
    Ok(Manufacturer {
        manufacturer_id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("Failed to parse manufacturer_id: {}", e)))?,
        studio_id: Uuid::parse_str(&studio)
            .map_err(|e| Error::Internal(format!("Failed to parse studio_id: {}", e)))?,
        name: row.get("name"),
        website: row.get("website"),
        contact_email: row.get("contact_email"),
        contact_phone: row.get("contact_phone"),
        notes: row.get("notes"),
    })
}

/// Save manufacturer (insert or update by id)
pub async fn save_manufacturer(pool: &SqlitePool, manufacturer: &Manufacturer) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO manufacturers (
            manufacturer_id, studio_id, name, website, contact_email,
            contact_phone, notes, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(manufacturer_id) DO UPDATE SET
            name = excluded.name,
            website = excluded.website,
            contact_email = excluded.contact_email,
            contact_phone = excluded.contact_phone,
            notes = excluded.notes,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(manufacturer.manufacturer_id.to_string())
    .bind(manufacturer.studio_id.to_string())
    .bind(&manufacturer.name)
    .bind(&manufacturer.website)
    .bind(&manufacturer.contact_email)
    .bind(&manufacturer.contact_phone)
    .bind(&manufacturer.notes)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one manufacturer by id, tenant-scoped
pub async fn load_manufacturer(
    pool: &SqlitePool,
    studio_id: Uuid,
    manufacturer_id: Uuid,
) -> Result<Option<Manufacturer>> {
    let row = sqlx::query(
        r#"
        SELECT manufacturer_id, studio_id, name, website, contact_email, contact_phone, notes
        FROM manufacturers
        WHERE studio_id = ? AND manufacturer_id = ?
        "#,
    )
    .bind(studio_id.to_string())
    .bind(manufacturer_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(|r| row_to_manufacturer(&r)).transpose()
}

/// List all manufacturers for a studio
pub async fn list_manufacturers(pool: &SqlitePool, studio_id: Uuid) -> Result<Vec<Manufacturer>> {
    let rows = sqlx::query(
        r#"
        SELECT manufacturer_id, studio_id, name, website, contact_email, contact_phone, notes
        FROM manufacturers
        WHERE studio_id = ?
        ORDER BY name
        "#,
    )
    .bind(studio_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_manufacturer).collect()
}

/// Case-insensitive, whitespace-trimmed exact name lookup
///
/// Failure to resolve is not an error; the caller drops the manufacturer
/// term from its composite score.
pub async fn find_by_name(
    pool: &SqlitePool,
    studio_id: Uuid,
    name: &str,
) -> Result<Option<Manufacturer>> {
    let row = sqlx::query(
        r#"
        SELECT manufacturer_id, studio_id, name, website, contact_email, contact_phone, notes
        FROM manufacturers
        WHERE studio_id = ? AND LOWER(TRIM(name)) = LOWER(TRIM(?))
        "#,
    )
    .bind(studio_id.to_string())
    .bind(name)
    .fetch_optional(pool)
    .await?;

    row.map(|r| row_to_manufacturer(&r)).transpose()
}
