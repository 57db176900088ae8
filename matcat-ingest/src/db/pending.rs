//! Approval queue persistence
//!
//! Pending entity rows carry the candidate's descriptive fields as a JSON
//! payload plus the review metadata needed for the commit algorithm:
//! status, reviewer, commit marker, link target.

use matcat_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Candidate, EntityKind, PendingEntity, PendingStatus};

fn parse_uuid(s: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("Failed to parse {}: {}", field, e)))
}

fn parse_opt_uuid(s: Option<String>, field: &str) -> Result<Option<Uuid>> {
    s.map(|s| parse_uuid(&s, field)).transpose()
}

pub(crate) fn row_to_pending(row: &sqlx::sqlite::SqliteRow) -> Result<PendingEntity> {
    let pending_id: String = row.get("pending_id");
    let studio_id: String = row.get("studio_id");
    let kind: String = row.get("kind");
    let payload: String = row.get("payload");
    let status: String = row.get("status");

    let candidate: Candidate = serde_json::from_str(&payload)
        .map_err(|e| Error::Internal(format!("Failed to deserialize payload: {}", e)))?;

    let kind = match kind.as_str() {
        "material" => EntityKind::Material,
        "manufacturer" => EntityKind::Manufacturer,
        other => return Err(Error::Internal(format!("Unknown entity kind: {}", other))),
    };

    let status = PendingStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown pending status: {}", status)))?;

    let reviewed_at: Option<String> = row.get("reviewed_at");
    let reviewed_at = reviewed_at
        .map(|s| chrono::DateTime::parse_from_rfc3339(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse reviewed_at: {}", e)))?
        .map(|dt| dt.with_timezone(&chrono::Utc));

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    Ok(PendingEntity {
        pending_id: parse_uuid(&pending_id, "pending_id")?,
        studio_id: parse_uuid(&studio_id, "studio_id")?,
        submission_id: parse_opt_uuid(row.get("submission_id"), "submission_id")?,
        kind,
        candidate,
        project_id: parse_opt_uuid(row.get("project_id"), "project_id")?,
        status,
        linked_entity_id: parse_opt_uuid(row.get("linked_entity_id"), "linked_entity_id")?,
        created_entity_id: parse_opt_uuid(row.get("created_entity_id"), "created_entity_id")?,
        reviewer_id: parse_opt_uuid(row.get("reviewer_id"), "reviewer_id")?,
        reviewed_at,
        created_at,
    })
}

pub(crate) const SELECT_COLUMNS: &str = "pending_id, studio_id, submission_id, kind, payload, project_id, \
                              status, linked_entity_id, created_entity_id, reviewer_id, \
                              reviewed_at, created_at";

/// Insert a new queue entry
pub async fn enqueue(pool: &SqlitePool, entity: &PendingEntity) -> Result<()> {
    let payload = serde_json::to_string(&entity.candidate)
        .map_err(|e| Error::Internal(format!("Failed to serialize payload: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO pending_entities (
            pending_id, studio_id, submission_id, kind, payload, project_id,
            status, linked_entity_id, created_entity_id, reviewer_id, reviewed_at, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entity.pending_id.to_string())
    .bind(entity.studio_id.to_string())
    .bind(entity.submission_id.map(|id| id.to_string()))
    .bind(entity.kind.as_str())
    .bind(&payload)
    .bind(entity.project_id.map(|id| id.to_string()))
    .bind(entity.status.as_str())
    .bind(entity.linked_entity_id.map(|id| id.to_string()))
    .bind(entity.created_entity_id.map(|id| id.to_string()))
    .bind(entity.reviewer_id.map(|id| id.to_string()))
    .bind(entity.reviewed_at.map(|dt| dt.to_rfc3339()))
    .bind(entity.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one queue entry
pub async fn load(pool: &SqlitePool, pending_id: Uuid) -> Result<Option<PendingEntity>> {
    let sql = format!(
        "SELECT {} FROM pending_entities WHERE pending_id = ?",
        SELECT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(pending_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_to_pending(&r)).transpose()
}

/// List queue entries for a studio, ordered by enqueue time
pub async fn list(
    pool: &SqlitePool,
    studio_id: Uuid,
    status: Option<PendingStatus>,
) -> Result<Vec<PendingEntity>> {
    let rows = match status {
        Some(status) => {
            let sql = format!(
                "SELECT {} FROM pending_entities
                 WHERE studio_id = ? AND status = ? ORDER BY created_at, pending_id",
                SELECT_COLUMNS
            );
            sqlx::query(&sql)
                .bind(studio_id.to_string())
                .bind(status.as_str())
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!(
                "SELECT {} FROM pending_entities
                 WHERE studio_id = ? ORDER BY created_at, pending_id",
                SELECT_COLUMNS
            );
            sqlx::query(&sql)
                .bind(studio_id.to_string())
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(row_to_pending).collect()
}

/// List a submission's queue entries with the given status
pub async fn list_for_submission(
    pool: &SqlitePool,
    submission_id: Uuid,
    status: PendingStatus,
) -> Result<Vec<PendingEntity>> {
    let sql = format!(
        "SELECT {} FROM pending_entities
         WHERE submission_id = ? AND status = ? ORDER BY created_at, pending_id",
        SELECT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(submission_id.to_string())
        .bind(status.as_str())
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_pending).collect()
}

/// Remaining `pending` children of a submission
pub async fn count_pending_for_submission(pool: &SqlitePool, submission_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pending_entities WHERE submission_id = ? AND status = 'pending'",
    )
    .bind(submission_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(count)
}
