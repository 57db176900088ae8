//! Resolution session API handlers
//!
//! One logical operator drives a session through its candidates. Matches for
//! the current candidate are computed lazily against a fresh catalog
//! snapshot so mid-session catalog edits are always visible.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use matcat_common::events::CatalogEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config,
    db,
    error::{ApiError, ApiResult},
    matching::{self, CatalogSnapshot, MatchCandidate},
    models::{partition_valid, Candidate, CandidateBatch, DecisionAction, EntityKind,
             SubmissionState},
    queue::{self, CommitMode, CommitOutcome},
    session::{ResolutionSession, SuggestedAction},
    AppState,
};

/// POST /sessions request
///
/// Opens a session either over a submission's stored candidates or over an
/// inline batch (plain import with no parent document).
#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub studio_id: Uuid,
    #[serde(default)]
    pub submission_id: Option<Uuid>,
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub candidates: Option<CandidateBatch>,
}

/// POST /sessions response
#[derive(Debug, Serialize)]
pub struct OpenSessionResponse {
    pub session_id: Uuid,
    pub candidate_count: usize,
    /// Candidates dropped by validation before the session started
    pub skipped: usize,
}

/// A ranked match enriched for display
///
/// Enrichment (project usage) is layered on here, lazily, per candidate; the
/// engine itself stays pure.
#[derive(Debug, Serialize)]
pub struct EnrichedMatch {
    #[serde(flatten)]
    pub matched: MatchCandidate,
    /// The session's target project already uses this entity
    pub already_in_project: bool,
}

/// GET /sessions/{id}/current response
#[derive(Debug, Serialize)]
pub struct CurrentCandidateResponse {
    pub session_id: Uuid,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub total: usize,
    pub decided: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<Candidate>,
    pub matches: Vec<EnrichedMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested: Option<SuggestedAction>,
    /// Decision previously recorded at this position (after back())
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_decision: Option<PriorDecision>,
}

#[derive(Debug, Serialize)]
pub struct PriorDecision {
    pub action: DecisionAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_entity_id: Option<Uuid>,
}

/// POST /sessions/{id}/decide request
#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub action: DecisionAction,
    #[serde(default)]
    pub linked_entity_id: Option<Uuid>,
}

/// POST /sessions/{id}/decide response
#[derive(Debug, Serialize)]
pub struct DecideResponse {
    pub session_id: Uuid,
    pub decided: usize,
    pub total: usize,
    pub complete: bool,
}

/// POST /sessions/{id}/complete request
#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub mode: CommitMode,
}

/// POST /sessions/{id}/complete response
#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub outcome: CommitOutcome,
}

/// POST /sessions
pub async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSessionRequest>,
) -> ApiResult<Json<OpenSessionResponse>> {
    let (candidates, submission_id) = match request.submission_id {
        Some(submission_id) => {
            let submission = db::submissions::load_submission(&state.db, submission_id)
                .await?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("Submission not found: {}", submission_id))
                })?;

            if submission.state != SubmissionState::ReadyForReview {
                return Err(ApiError::Conflict(format!(
                    "Submission not ready for review: {}",
                    submission.state.as_str()
                )));
            }

            let candidates = db::submissions::load_candidates(&state.db, submission_id).await?;
            (candidates, Some(submission_id))
        }
        None => {
            let batch = request.candidates.ok_or_else(|| {
                ApiError::BadRequest(
                    "Either submission_id or candidates must be provided".to_string(),
                )
            })?;
            (batch.flatten(), None)
        }
    };

    // Submission candidates were validated at attach time; inline batches
    // are validated here. Running both through keeps one code path.
    let (valid, skipped) = partition_valid(candidates);
    if valid.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "No valid candidates ({} skipped)",
            skipped
        )));
    }

    let session = ResolutionSession::new(
        request.studio_id,
        submission_id,
        request.project_id,
        valid,
    );
    let session_id = session.session_id;
    let candidate_count = session.len();

    state.sessions.write().await.insert(session_id, session);

    tracing::info!(
        session_id = %session_id,
        submission_id = ?submission_id,
        candidate_count,
        skipped,
        "Resolution session opened"
    );

    state
        .event_bus
        .emit(CatalogEvent::SessionOpened {
            session_id,
            submission_id,
            candidate_count,
            timestamp: chrono::Utc::now(),
        })
        .ok();

    Ok(Json(OpenSessionResponse {
        session_id,
        candidate_count,
        skipped,
    }))
}

/// GET /sessions/{id}/current
///
/// Matches are computed only for the current candidate, against a snapshot
/// loaded now. Snapshot failure degrades to an empty match list ("treat as
/// new"), logged but non-fatal.
pub async fn current_candidate(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<CurrentCandidateResponse>> {
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", session_id)))?;

    let Some((index, candidate)) = session.current() else {
        return Ok(Json(CurrentCandidateResponse {
            session_id,
            complete: true,
            index: None,
            total: session.len(),
            decided: session.decided_count(),
            candidate: None,
            matches: Vec::new(),
            suggested: None,
            prior_decision: None,
        }));
    };

    let matching_config = config::resolve_matching_config(&state.db).await?;

    let matches = match CatalogSnapshot::load(&state.db, session.studio_id).await {
        Ok(snapshot) => matching::score_candidate(
            candidate,
            &snapshot,
            matching_config.review_threshold,
            matching_config.max_matches,
        ),
        Err(err) => {
            // Absence of matches degrades safely to "treat as new"
            let err = crate::error::IngestError::MatchUnavailable(err.to_string());
            tracing::warn!(
                session_id = %session_id,
                error = %err,
                "Match computation unavailable, returning empty match list"
            );
            Vec::new()
        }
    };

    let suggested = SuggestedAction::from_matches(&matches);
    let prior_decision = session
        .decision_at(index)
        .map(|(action, linked_entity_id)| PriorDecision {
            action,
            linked_entity_id,
        });

    // Enrich matches with project usage when the session targets a project
    let in_project: std::collections::HashSet<Uuid> = match session.project_id {
        Some(project_id) if candidate.kind == EntityKind::Material => {
            db::projects::material_ids_for_project(&state.db, project_id)
                .await?
                .into_iter()
                .collect()
        }
        _ => Default::default(),
    };
    let matches = matches
        .into_iter()
        .map(|matched| EnrichedMatch {
            already_in_project: in_project.contains(&matched.entity_id),
            matched,
        })
        .collect();

    Ok(Json(CurrentCandidateResponse {
        session_id,
        complete: false,
        index: Some(index),
        total: session.len(),
        decided: session.decided_count(),
        candidate: Some(candidate.clone()),
        matches,
        suggested: Some(suggested),
        prior_decision,
    }))
}

/// POST /sessions/{id}/decide
///
/// Link targets are verified against the tenant catalog before the decision
/// is recorded.
pub async fn decide(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<DecideRequest>,
) -> ApiResult<Json<DecideResponse>> {
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", session_id)))?;

    if request.action == DecisionAction::Link {
        let linked_id = request.linked_entity_id.ok_or_else(|| {
            ApiError::BadRequest("Link decision requires linked_entity_id".to_string())
        })?;

        let kind = session
            .current()
            .map(|(_, candidate)| candidate.kind)
            .ok_or_else(|| ApiError::Conflict("Session already fully decided".to_string()))?;

        let exists = match kind {
            EntityKind::Material => {
                db::materials::load_material(&state.db, session.studio_id, linked_id)
                    .await?
                    .is_some()
            }
            EntityKind::Manufacturer => {
                db::manufacturers::load_manufacturer(&state.db, session.studio_id, linked_id)
                    .await?
                    .is_some()
            }
        };

        if !exists {
            return Err(ApiError::BadRequest(format!(
                "Link target does not exist in catalog: {}",
                linked_id
            )));
        }
    }

    session.decide(request.action, request.linked_entity_id)?;

    Ok(Json(DecideResponse {
        session_id,
        decided: session.decided_count(),
        total: session.len(),
        complete: session.is_complete(),
    }))
}

/// POST /sessions/{id}/back
///
/// Step back for review; re-display only, no side effects.
pub async fn back(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<DecideResponse>> {
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", session_id)))?;

    session.back()?;

    Ok(Json(DecideResponse {
        session_id,
        decided: session.decided_count(),
        total: session.len(),
        complete: session.is_complete(),
    }))
}

/// POST /sessions/{id}/complete
///
/// Terminal action: emits the decision list to the committer. The session is
/// removed only after the commit succeeds, so a retryable commit failure
/// leaves it intact.
pub async fn complete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<CompleteRequest>,
) -> ApiResult<Json<CompleteResponse>> {
    // Clone out under the lock; commit happens without holding it
    let session = {
        let sessions = state.sessions.read().await;
        sessions
            .get(&session_id)
            .ok_or_else(|| ApiError::NotFound(format!("Session not found: {}", session_id)))?
            .clone()
    };

    let studio_id = session.studio_id;
    let submission_id = session.submission_id;
    let project_id = session.project_id;
    let decisions = session.complete()?;

    let outcome = queue::commit_decisions(
        &state.db,
        &state.event_bus,
        studio_id,
        submission_id,
        project_id,
        decisions,
        request.mode,
    )
    .await?;

    state.sessions.write().await.remove(&session_id);

    state
        .event_bus
        .emit(CatalogEvent::SessionCompleted {
            session_id,
            created: outcome.created.len(),
            linked: outcome.linked,
            enqueued: outcome.enqueued.len(),
            timestamp: chrono::Utc::now(),
        })
        .ok();

    Ok(Json(CompleteResponse {
        session_id,
        outcome,
    }))
}

/// DELETE /sessions/{id}
///
/// Abandon the session. No partial writes were made, so there is nothing to
/// unwind.
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let removed = state.sessions.write().await.remove(&session_id);
    if removed.is_none() {
        return Err(ApiError::NotFound(format!(
            "Session not found: {}",
            session_id
        )));
    }

    tracing::info!(session_id = %session_id, "Resolution session cancelled");

    state
        .event_bus
        .emit(CatalogEvent::SessionCancelled {
            session_id,
            timestamp: chrono::Utc::now(),
        })
        .ok();

    Ok(Json(serde_json::json!({ "session_id": session_id, "cancelled": true })))
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(open_session))
        .route("/sessions/:id/current", get(current_candidate))
        .route("/sessions/:id/decide", post(decide))
        .route("/sessions/:id/back", post(back))
        .route("/sessions/:id/complete", post(complete_session))
        .route("/sessions/:id", delete(cancel_session))
}
