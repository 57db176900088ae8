//! Reviewer approval operations
//!
//! The commit algorithm for `approve` runs in one transaction:
//! 1. Compare-and-swap the status from `pending`; zero rows updated means a
//!    concurrent reviewer got there first (`AlreadyResolved`).
//! 2. The same UPDATE records reviewer and timestamp.
//! 3. Canonical entity insert, guarded by the `created_entity_id` commit
//!    marker so a replay cannot double-insert.
//! 4. Idempotent project association (single conditional insert).
//! 5. Submission completion check.
//! A storage failure rolls everything back; the row stays `pending` and the
//! approval is safe to retry.

use matcat_common::events::{CatalogEvent, EventBus};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db;
use crate::error::IngestError;
use crate::models::{EntityKind, PendingEntity, PendingStatus};

/// Result of a successful approval
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApprovalOutcome {
    pub pending_id: Uuid,
    /// Canonical entity created (or found via the commit marker on replay)
    pub entity_id: Uuid,
    pub association_created: bool,
    pub submission_completed: bool,
}

/// Result of a bulk approval pass
#[derive(Debug, Default, serde::Serialize)]
pub struct BulkApprovalOutcome {
    pub approved: Vec<ApprovalOutcome>,
    /// Items that resolved concurrently while the pass ran
    pub skipped: usize,
}

/// List queue entries for a studio, ordered by enqueue time
pub async fn list(
    pool: &SqlitePool,
    studio_id: Uuid,
    status: Option<PendingStatus>,
) -> Result<Vec<PendingEntity>, IngestError> {
    Ok(db::pending::list(pool, studio_id, status).await?)
}

fn commit_err(err: sqlx::Error) -> IngestError {
    IngestError::Commit(err.to_string())
}

/// Approve a pending entity
///
/// Effectively atomic: a crash mid-sequence cannot leave an item that is both
/// `pending` and already duplicated into the catalog. Concurrent attempts on
/// the same id are serialized by the status CAS; exactly one proceeds, the
/// rest get `AlreadyResolved`.
pub async fn approve(
    pool: &SqlitePool,
    bus: &EventBus,
    pending_id: Uuid,
    reviewer_id: Uuid,
) -> Result<ApprovalOutcome, IngestError> {
    let mut tx = pool.begin().await.map_err(commit_err)?;
    let now = chrono::Utc::now();

    // Steps 1+2: status CAS with reviewer + timestamp
    let updated = sqlx::query(
        r#"
        UPDATE pending_entities
        SET status = 'approved', reviewer_id = ?, reviewed_at = ?
        WHERE pending_id = ? AND status = 'pending'
        "#,
    )
    .bind(reviewer_id.to_string())
    .bind(now.to_rfc3339())
    .bind(pending_id.to_string())
    .execute(&mut *tx)
    .await
    .map_err(commit_err)?;

    if updated.rows_affected() == 0 {
        tx.rollback().await.ok();
        return match db::pending::load(pool, pending_id).await? {
            None => Err(IngestError::Common(matcat_common::Error::NotFound(format!(
                "Pending entity not found: {}",
                pending_id
            )))),
            Some(_) => Err(IngestError::AlreadyResolved(pending_id)),
        };
    }

    let sql = format!(
        "SELECT {} FROM pending_entities WHERE pending_id = ?",
        db::pending::SELECT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(pending_id.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(commit_err)?;
    let entity = db::pending::row_to_pending(&row)?;

    // Step 3: canonical insert, idempotent via the commit marker
    let entity_id = match entity.created_entity_id {
        Some(existing) => existing,
        None => {
            let entity_id = insert_canonical(&mut tx, &entity).await?;
            sqlx::query("UPDATE pending_entities SET created_entity_id = ? WHERE pending_id = ?")
                .bind(entity_id.to_string())
                .bind(pending_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(commit_err)?;
            entity_id
        }
    };

    // Step 4: project association, absorbed when it already exists
    let mut association_created = false;
    if let (Some(project_id), EntityKind::Material) = (entity.project_id, entity.kind) {
        let association = db::projects::ProjectAssociation {
            project_id,
            material_id: entity_id,
            studio_id: entity.studio_id,
            quantity: None,
            unit_cost: None,
            notes: None,
        };
        association_created = db::projects::associate_if_absent_tx(&mut *tx, &association)
            .await
            .map_err(|e| IngestError::Commit(e.to_string()))?;
    }

    // Step 5: last outstanding pending child completes the submission
    let mut submission_completed = false;
    if let Some(submission_id) = entity.submission_id {
        let remaining: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pending_entities WHERE submission_id = ? AND status = 'pending'",
        )
        .bind(submission_id.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(commit_err)?;

        if remaining == 0 {
            let completed = sqlx::query(
                r#"
                UPDATE submissions
                SET state = 'completed', completed_at = ?, updated_at = ?
                WHERE submission_id = ? AND state = 'ready_for_review'
                "#,
            )
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .bind(submission_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(commit_err)?;
            submission_completed = completed.rows_affected() > 0;
        }
    }

    tx.commit().await.map_err(commit_err)?;

    tracing::info!(
        pending_id = %pending_id,
        entity_id = %entity_id,
        reviewer_id = %reviewer_id,
        association_created,
        submission_completed,
        "Pending entity approved"
    );

    bus.emit(CatalogEvent::PendingApproved {
        pending_id,
        entity_id,
        reviewer_id,
        timestamp: now,
    })
    .ok();

    if association_created {
        if let Some(project_id) = entity.project_id {
            bus.emit(CatalogEvent::AssociationCreated {
                project_id,
                entity_id,
                timestamp: now,
            })
            .ok();
        }
    }

    if submission_completed {
        if let Some(submission_id) = entity.submission_id {
            bus.emit(CatalogEvent::SubmissionStateChanged {
                submission_id,
                old_state: "ready_for_review".to_string(),
                new_state: "completed".to_string(),
                timestamp: now,
            })
            .ok();
            bus.emit(CatalogEvent::SubmissionCompleted {
                submission_id,
                timestamp: now,
            })
            .ok();
        }
    }

    Ok(ApprovalOutcome {
        pending_id,
        entity_id,
        association_created,
        submission_completed,
    })
}

/// Insert the canonical entity for an approved row
async fn insert_canonical(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    entity: &PendingEntity,
) -> Result<Uuid, IngestError> {
    let now = chrono::Utc::now().to_rfc3339();
    let candidate = &entity.candidate;

    match entity.kind {
        EntityKind::Material => {
            // Resolve free-text manufacturer name inside the transaction
            let manufacturer_id = match candidate.manufacturer_id {
                Some(id) => Some(id.to_string()),
                None => match candidate.manufacturer_name.as_deref() {
                    Some(name) => sqlx::query(
                        "SELECT manufacturer_id FROM manufacturers
                         WHERE studio_id = ? AND LOWER(TRIM(name)) = LOWER(TRIM(?))",
                    )
                    .bind(entity.studio_id.to_string())
                    .bind(name)
                    .fetch_optional(&mut **tx)
                    .await
                    .map_err(commit_err)?
                    .map(|row| row.get::<String, _>("manufacturer_id")),
                    None => None,
                },
            };

            let material_id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO materials (
                    material_id, studio_id, name, category, subcategory, reference_code,
                    dimensions, manufacturer_id, notes, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(material_id.to_string())
            .bind(entity.studio_id.to_string())
            .bind(&candidate.name)
            .bind(candidate.category.clone().unwrap_or_default())
            .bind(&candidate.subcategory)
            .bind(&candidate.reference_code)
            .bind(&candidate.dimensions)
            .bind(manufacturer_id)
            .bind(&candidate.notes)
            .bind(&now)
            .bind(&now)
            .execute(&mut **tx)
            .await
            .map_err(commit_err)?;

            Ok(material_id)
        }
        EntityKind::Manufacturer => {
            let manufacturer_id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO manufacturers (
                    manufacturer_id, studio_id, name, website, contact_email,
                    contact_phone, notes, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(manufacturer_id.to_string())
            .bind(entity.studio_id.to_string())
            .bind(&candidate.name)
            .bind(&candidate.website)
            .bind(&candidate.contact_email)
            .bind(&candidate.contact_phone)
            .bind(&candidate.notes)
            .bind(&now)
            .bind(&now)
            .execute(&mut **tx)
            .await
            .map_err(commit_err)?;

            Ok(manufacturer_id)
        }
    }
}

/// Reject a pending entity
///
/// Single-step terminal transition; no canonical record is ever created.
/// Resolves the pending count the same way approve does.
pub async fn reject(
    pool: &SqlitePool,
    bus: &EventBus,
    pending_id: Uuid,
    reviewer_id: Uuid,
) -> Result<(), IngestError> {
    let mut tx = pool.begin().await.map_err(commit_err)?;
    let now = chrono::Utc::now();

    let updated = sqlx::query(
        r#"
        UPDATE pending_entities
        SET status = 'rejected', reviewer_id = ?, reviewed_at = ?
        WHERE pending_id = ? AND status = 'pending'
        "#,
    )
    .bind(reviewer_id.to_string())
    .bind(now.to_rfc3339())
    .bind(pending_id.to_string())
    .execute(&mut *tx)
    .await
    .map_err(commit_err)?;

    if updated.rows_affected() == 0 {
        tx.rollback().await.ok();
        return match db::pending::load(pool, pending_id).await? {
            None => Err(IngestError::Common(matcat_common::Error::NotFound(format!(
                "Pending entity not found: {}",
                pending_id
            )))),
            Some(_) => Err(IngestError::AlreadyResolved(pending_id)),
        };
    }

    let submission_id: Option<String> =
        sqlx::query_scalar("SELECT submission_id FROM pending_entities WHERE pending_id = ?")
            .bind(pending_id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(commit_err)?;

    let mut submission_completed = None;
    if let Some(submission_id) = submission_id {
        let remaining: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pending_entities WHERE submission_id = ? AND status = 'pending'",
        )
        .bind(&submission_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(commit_err)?;

        if remaining == 0 {
            let completed = sqlx::query(
                r#"
                UPDATE submissions
                SET state = 'completed', completed_at = ?, updated_at = ?
                WHERE submission_id = ? AND state = 'ready_for_review'
                "#,
            )
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .bind(&submission_id)
            .execute(&mut *tx)
            .await
            .map_err(commit_err)?;
            if completed.rows_affected() > 0 {
                submission_completed = Some(submission_id);
            }
        }
    }

    tx.commit().await.map_err(commit_err)?;

    tracing::info!(
        pending_id = %pending_id,
        reviewer_id = %reviewer_id,
        "Pending entity rejected"
    );

    bus.emit(CatalogEvent::PendingRejected {
        pending_id,
        reviewer_id,
        timestamp: now,
    })
    .ok();

    if let Some(submission_id) = submission_completed {
        if let Ok(submission_id) = Uuid::parse_str(&submission_id) {
            bus.emit(CatalogEvent::SubmissionStateChanged {
                submission_id,
                old_state: "ready_for_review".to_string(),
                new_state: "completed".to_string(),
                timestamp: now,
            })
            .ok();
            bus.emit(CatalogEvent::SubmissionCompleted {
                submission_id,
                timestamp: now,
            })
            .ok();
        }
    }

    Ok(())
}

/// Approve every pending child of a submission
///
/// Per-item commit semantics apply uniformly in bulk: each row runs the full
/// approve path (canonical insert, association, completion check). Rows that
/// resolve concurrently while the pass runs are skipped, not errors.
pub async fn approve_all(
    pool: &SqlitePool,
    bus: &EventBus,
    submission_id: Uuid,
    reviewer_id: Uuid,
) -> Result<BulkApprovalOutcome, IngestError> {
    let pending =
        db::pending::list_for_submission(pool, submission_id, PendingStatus::Pending).await?;

    let mut outcome = BulkApprovalOutcome::default();
    for entity in pending {
        match approve(pool, bus, entity.pending_id, reviewer_id).await {
            Ok(approved) => outcome.approved.push(approved),
            Err(IngestError::AlreadyResolved(_)) => outcome.skipped += 1,
            Err(err) => return Err(err),
        }
    }

    tracing::info!(
        submission_id = %submission_id,
        approved = outcome.approved.len(),
        skipped = outcome.skipped,
        "Bulk approval complete"
    );

    Ok(outcome)
}
