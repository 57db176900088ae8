//! Submission ledger API handlers
//!
//! POST /submissions, POST /submissions/{id}/processing,
//! POST /submissions/{id}/candidates, POST /submissions/{id}/reject,
//! GET /submissions, GET /submissions/{id}

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use matcat_common::events::CatalogEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db,
    error::{ApiError, ApiResult},
    models::{partition_valid, CandidateBatch, Submission, SubmissionState},
    AppState,
};

/// POST /submissions request
#[derive(Debug, Deserialize)]
pub struct CreateSubmissionRequest {
    pub studio_id: Uuid,
    pub source_label: String,
    #[serde(default)]
    pub project_id: Option<Uuid>,
}

/// POST /submissions/{id}/candidates request
#[derive(Debug, Deserialize)]
pub struct AttachCandidatesRequest {
    /// Flat list or nested-by-manufacturer-key shape
    pub candidates: CandidateBatch,
}

/// POST /submissions/{id}/candidates response
#[derive(Debug, Serialize)]
pub struct AttachCandidatesResponse {
    pub submission_id: Uuid,
    pub state: SubmissionState,
    pub accepted: usize,
    pub skipped: usize,
}

/// POST /submissions/{id}/reject request
#[derive(Debug, Default, Deserialize)]
pub struct RejectSubmissionRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub studio_id: Uuid,
}

/// POST /submissions
///
/// Create a submission in the `pending` state. Extraction is an external
/// collaborator; this only opens the ledger entry.
pub async fn create_submission(
    State(state): State<AppState>,
    Json(request): Json<CreateSubmissionRequest>,
) -> ApiResult<Json<Submission>> {
    if request.source_label.trim().is_empty() {
        return Err(ApiError::BadRequest("source_label is required".to_string()));
    }

    // A project reference must point at a project owned by the same studio
    if let Some(project_id) = request.project_id {
        db::projects::load_project(&state.db, request.studio_id, project_id)
            .await?
            .ok_or_else(|| {
                ApiError::BadRequest(format!("Project not found in studio: {}", project_id))
            })?;
    }

    let submission = Submission::new(request.studio_id, request.source_label, request.project_id);
    db::submissions::save_submission(&state.db, &submission).await?;

    tracing::info!(
        submission_id = %submission.submission_id,
        studio_id = %submission.studio_id,
        "Submission created"
    );

    Ok(Json(submission))
}

/// POST /submissions/{id}/processing
///
/// Marks the start of extraction / candidate generation.
pub async fn mark_processing(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
) -> ApiResult<Json<Submission>> {
    let transitioned = db::submissions::transition_state(
        &state.db,
        submission_id,
        SubmissionState::Pending,
        SubmissionState::Processing,
    )
    .await?;

    let submission = load_or_404(&state, submission_id).await?;

    if !transitioned {
        return Err(ApiError::Conflict(format!(
            "Submission not in pending state: {}",
            submission.state.as_str()
        )));
    }

    state
        .event_bus
        .emit(CatalogEvent::SubmissionStateChanged {
            submission_id,
            old_state: "pending".to_string(),
            new_state: "processing".to_string(),
            timestamp: chrono::Utc::now(),
        })
        .ok();

    Ok(Json(submission))
}

/// POST /submissions/{id}/candidates
///
/// Attach the extracted candidate batch. The nested per-manufacturer-key
/// shape is flattened here; invalid candidates are skipped with a count and
/// the batch continues. Marks the submission ready for review.
pub async fn attach_candidates(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
    Json(request): Json<AttachCandidatesRequest>,
) -> ApiResult<Json<AttachCandidatesResponse>> {
    let submission = load_or_404(&state, submission_id).await?;

    if submission.state != SubmissionState::Processing {
        return Err(ApiError::Conflict(format!(
            "Submission not in processing state: {}",
            submission.state.as_str()
        )));
    }

    let (valid, skipped) = partition_valid(request.candidates.flatten());
    if valid.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "No valid candidates in batch ({} skipped)",
            skipped
        )));
    }

    db::submissions::set_candidates(&state.db, submission_id, &valid).await?;

    let mut submission = submission;
    submission.candidate_count = valid.len();
    submission.skipped_count = skipped;
    submission.transition_to(SubmissionState::ReadyForReview)?;
    db::submissions::save_submission(&state.db, &submission).await?;

    tracing::info!(
        submission_id = %submission_id,
        accepted = valid.len(),
        skipped,
        "Candidate batch attached"
    );

    state
        .event_bus
        .emit(CatalogEvent::SubmissionStateChanged {
            submission_id,
            old_state: "processing".to_string(),
            new_state: "ready_for_review".to_string(),
            timestamp: chrono::Utc::now(),
        })
        .ok();
    state
        .event_bus
        .emit(CatalogEvent::CandidatesAccepted {
            submission_id,
            accepted: valid.len(),
            skipped,
            timestamp: chrono::Utc::now(),
        })
        .ok();

    Ok(Json(AttachCandidatesResponse {
        submission_id,
        state: SubmissionState::ReadyForReview,
        accepted: valid.len(),
        skipped,
    }))
}

/// POST /submissions/{id}/reject
///
/// Explicit terminal override, available from any non-completed state.
pub async fn reject_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
    Json(request): Json<RejectSubmissionRequest>,
) -> ApiResult<Json<Submission>> {
    let before = load_or_404(&state, submission_id).await?;

    let rejected =
        db::submissions::reject_submission(&state.db, submission_id, request.reason).await?;

    if !rejected {
        return Err(ApiError::Conflict(format!(
            "Submission already terminal: {}",
            before.state.as_str()
        )));
    }

    state
        .event_bus
        .emit(CatalogEvent::SubmissionStateChanged {
            submission_id,
            old_state: before.state.as_str().to_string(),
            new_state: "rejected".to_string(),
            timestamp: chrono::Utc::now(),
        })
        .ok();

    Ok(Json(load_or_404(&state, submission_id).await?))
}

/// GET /submissions/{id}
pub async fn get_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<Uuid>,
) -> ApiResult<Json<Submission>> {
    Ok(Json(load_or_404(&state, submission_id).await?))
}

/// GET /submissions?studio_id={uuid}
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Submission>>> {
    Ok(Json(
        db::submissions::list_submissions(&state.db, query.studio_id).await?,
    ))
}

async fn load_or_404(state: &AppState, submission_id: Uuid) -> ApiResult<Submission> {
    db::submissions::load_submission(&state.db, submission_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Submission not found: {}", submission_id)))
}

/// Build submission routes
pub fn submission_routes() -> Router<AppState> {
    Router::new()
        .route("/submissions", post(create_submission).get(list_submissions))
        .route("/submissions/:id", get(get_submission))
        .route("/submissions/:id/processing", post(mark_processing))
        .route("/submissions/:id/candidates", post(attach_candidates))
        .route("/submissions/:id/reject", post(reject_submission))
}
