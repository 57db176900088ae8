//! Submission ledger persistence

use matcat_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Submission, SubmissionState};

fn row_to_submission(row: &sqlx::sqlite::SqliteRow) -> Result<Submission> {
    let submission_id: String = row.get("submission_id");
    let studio_id: String = row.get("studio_id");
    let state: String = row.get("state");
    let project_id: Option<String> = row.get("project_id");

    let state = SubmissionState::parse(&state)
        .ok_or_else(|| Error::Internal(format!("Unknown submission state: {}", state)))?;

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    let updated_at: String = row.get("updated_at");
    let updated_at = chrono::DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| Error::Internal(format!("Failed to parse updated_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    let completed_at: Option<String> = row.get("completed_at");
    let completed_at = completed_at
        .map(|s| chrono::DateTime::parse_from_rfc3339(&s))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse completed_at: {}", e)))?
        .map(|dt| dt.with_timezone(&chrono::Utc));

    Ok(Submission {
        submission_id: Uuid::parse_str(&submission_id)
            .map_err(|e| Error::Internal(format!("Failed to parse submission_id: {}", e)))?,
        studio_id: Uuid::parse_str(&studio_id)
            .map_err(|e| Error::Internal(format!("Failed to parse studio_id: {}", e)))?,
        state,
        source_label: row.get("source_label"),
        project_id: project_id
            .map(|s| Uuid::parse_str(&s))
            .transpose()
            .map_err(|e| Error::Internal(format!("Failed to parse project_id: {}", e)))?,
        candidate_count: row.get::<i64, _>("candidate_count") as usize,
        skipped_count: row.get::<i64, _>("skipped_count") as usize,
        error: row.get("error"),
        created_at,
        updated_at,
        completed_at,
    })
}

const SELECT_COLUMNS: &str = "submission_id, studio_id, state, source_label, project_id, \
                              candidate_count, skipped_count, error, created_at, updated_at, \
                              completed_at";

/// Save submission (insert or update by id)
pub async fn save_submission(pool: &SqlitePool, submission: &Submission) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO submissions (
            submission_id, studio_id, state, source_label, project_id,
            candidate_count, skipped_count, error, created_at, updated_at, completed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(submission_id) DO UPDATE SET
            state = excluded.state,
            candidate_count = excluded.candidate_count,
            skipped_count = excluded.skipped_count,
            error = excluded.error,
            updated_at = excluded.updated_at,
            completed_at = excluded.completed_at
        "#,
    )
    .bind(submission.submission_id.to_string())
    .bind(submission.studio_id.to_string())
    .bind(submission.state.as_str())
    .bind(&submission.source_label)
    .bind(submission.project_id.map(|id| id.to_string()))
    .bind(submission.candidate_count as i64)
    .bind(submission.skipped_count as i64)
    .bind(&submission.error)
    .bind(submission.created_at.to_rfc3339())
    .bind(submission.updated_at.to_rfc3339())
    .bind(submission.completed_at.map(|dt| dt.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load submission by id
pub async fn load_submission(pool: &SqlitePool, submission_id: Uuid) -> Result<Option<Submission>> {
    let sql = format!(
        "SELECT {} FROM submissions WHERE submission_id = ?",
        SELECT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(submission_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|r| row_to_submission(&r)).transpose()
}

/// List a studio's submissions, newest first
pub async fn list_submissions(pool: &SqlitePool, studio_id: Uuid) -> Result<Vec<Submission>> {
    let sql = format!(
        "SELECT {} FROM submissions WHERE studio_id = ? ORDER BY created_at DESC",
        SELECT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(studio_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_submission).collect()
}

/// Store a submission's validated candidate batch (serialized JSON)
pub async fn set_candidates(
    pool: &SqlitePool,
    submission_id: Uuid,
    candidates: &[crate::models::Candidate],
) -> Result<()> {
    let payload = serde_json::to_string(candidates)
        .map_err(|e| Error::Internal(format!("Failed to serialize candidates: {}", e)))?;

    sqlx::query("UPDATE submissions SET candidates = ?, updated_at = ? WHERE submission_id = ?")
        .bind(&payload)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(submission_id.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Load a submission's stored candidate batch
pub async fn load_candidates(
    pool: &SqlitePool,
    submission_id: Uuid,
) -> Result<Vec<crate::models::Candidate>> {
    let payload: Option<String> =
        sqlx::query_scalar("SELECT candidates FROM submissions WHERE submission_id = ?")
            .bind(submission_id.to_string())
            .fetch_optional(pool)
            .await?;

    match payload {
        Some(payload) => serde_json::from_str(&payload)
            .map_err(|e| Error::Internal(format!("Failed to deserialize candidates: {}", e))),
        None => Err(Error::NotFound(format!(
            "Submission not found: {}",
            submission_id
        ))),
    }
}

/// Guarded state update: succeeds only when the row is still in `expected`
///
/// Returns true when the transition was applied. The WHERE clause is the
/// compare-and-swap that serializes concurrent transitions.
pub async fn transition_state(
    pool: &SqlitePool,
    submission_id: Uuid,
    expected: SubmissionState,
    next: SubmissionState,
) -> Result<bool> {
    if !expected.can_transition_to(next) {
        return Err(Error::InvalidInput(format!(
            "Invalid submission transition: {} -> {}",
            expected.as_str(),
            next.as_str()
        )));
    }

    let now = chrono::Utc::now().to_rfc3339();
    let completed_at = (next == SubmissionState::Completed).then(|| now.clone());

    let result = sqlx::query(
        r#"
        UPDATE submissions
        SET state = ?, updated_at = ?, completed_at = COALESCE(?, completed_at)
        WHERE submission_id = ? AND state = ?
        "#,
    )
    .bind(next.as_str())
    .bind(&now)
    .bind(completed_at)
    .bind(submission_id.to_string())
    .bind(expected.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Explicit terminal override: reject from any non-completed state
pub async fn reject_submission(
    pool: &SqlitePool,
    submission_id: Uuid,
    error: Option<String>,
) -> Result<bool> {
    let now = chrono::Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE submissions
        SET state = 'rejected', error = COALESCE(?, error), updated_at = ?
        WHERE submission_id = ? AND state NOT IN ('completed', 'rejected')
        "#,
    )
    .bind(error)
    .bind(&now)
    .bind(submission_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Child-resolution hook from the approval queue
///
/// Recomputes the remaining-pending count and performs the
/// `ready_for_review → completed` transition when zero remain. This is the
/// only write path into `completed`. Returns true when the submission
/// completed on this call.
pub async fn on_child_resolved(pool: &SqlitePool, submission_id: Uuid) -> Result<bool> {
    let remaining = crate::db::pending::count_pending_for_submission(pool, submission_id).await?;
    if remaining > 0 {
        return Ok(false);
    }

    transition_state(
        pool,
        submission_id,
        SubmissionState::ReadyForReview,
        SubmissionState::Completed,
    )
    .await
}

/// Regress submissions orphaned in `processing` by a previous run
///
/// The extraction task dies with the process, so a `processing` submission at
/// startup will never progress. Returning it to `pending` lets extraction be
/// re-run without losing the batch.
pub async fn cleanup_stale_processing(pool: &SqlitePool) -> Result<usize> {
    let result = sqlx::query(
        r#"
        UPDATE submissions
        SET state = 'pending', updated_at = ?
        WHERE state = 'processing'
        "#,
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() as usize)
}
