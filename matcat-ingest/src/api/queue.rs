//! Approval queue API handlers
//!
//! GET /queue, POST /queue/{id}/approve, POST /queue/{id}/reject,
//! POST /submissions/{id}/approve-all

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{PendingEntity, PendingStatus},
    queue::{self, ApprovalOutcome, BulkApprovalOutcome},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub studio_id: Uuid,
    /// pending | approved | rejected | linked; omit for all
    #[serde(default)]
    pub status: Option<String>,
}

/// Reviewer identity for approve/reject calls
#[derive(Debug, Deserialize)]
pub struct ReviewerRequest {
    pub reviewer_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RejectResponse {
    pub pending_id: Uuid,
    pub status: PendingStatus,
}

/// GET /queue?studio_id={uuid}&status={status}
pub async fn list_queue(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> ApiResult<Json<Vec<PendingEntity>>> {
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(PendingStatus::parse(raw).ok_or_else(|| {
            ApiError::BadRequest(format!("Unknown queue status: {}", raw))
        })?),
    };

    let entries = queue::list(&state.db, query.studio_id, status).await?;
    Ok(Json(entries))
}

/// POST /queue/{id}/approve
///
/// Runs the atomic commit algorithm. A concurrent resolution surfaces as
/// 409 ALREADY_RESOLVED; storage failures as 503 retryable.
pub async fn approve_pending(
    State(state): State<AppState>,
    Path(pending_id): Path<Uuid>,
    Json(request): Json<ReviewerRequest>,
) -> ApiResult<Json<ApprovalOutcome>> {
    let result =
        queue::approve(&state.db, &state.event_bus, pending_id, request.reviewer_id).await;

    if let Err(crate::error::IngestError::Commit(msg)) = &result {
        *state.last_error.write().await = Some(msg.clone());
        state
            .event_bus
            .emit(matcat_common::events::CatalogEvent::CommitFailed {
                pending_id,
                error: msg.clone(),
                timestamp: chrono::Utc::now(),
            })
            .ok();
    }

    Ok(Json(result?))
}

/// POST /queue/{id}/reject
pub async fn reject_pending(
    State(state): State<AppState>,
    Path(pending_id): Path<Uuid>,
    Json(request): Json<ReviewerRequest>,
) -> ApiResult<Json<RejectResponse>> {
    queue::reject(&state.db, &state.event_bus, pending_id, request.reviewer_id).await?;

    Ok(Json(RejectResponse {
        pending_id,
        status: PendingStatus::Rejected,
    }))
}

/// POST /submissions/{id}/approve-all
///
/// Bulk approval with per-item commit semantics; items resolved concurrently
/// are skipped, not errors.
pub async fn approve_all(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
    Json(request): Json<ReviewerRequest>,
) -> ApiResult<Json<BulkApprovalOutcome>> {
    let outcome = queue::approve_all(
        &state.db,
        &state.event_bus,
        submission_id,
        request.reviewer_id,
    )
    .await?;

    Ok(Json(outcome))
}

/// Build queue routes
pub fn queue_routes() -> Router<AppState> {
    Router::new()
        .route("/queue", get(list_queue))
        .route("/queue/:id/approve", post(approve_pending))
        .route("/queue/:id/reject", post(reject_pending))
        .route("/submissions/:id/approve-all", post(approve_all))
}
