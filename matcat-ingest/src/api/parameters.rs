//! Matching parameter API handlers
//!
//! GET /parameters, PUT /parameters

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    config::{self, MatchingConfig},
    db,
    error::{ApiError, ApiResult},
    AppState,
};

/// PUT /parameters request: partial update, omitted fields keep their value
#[derive(Debug, Deserialize)]
pub struct UpdateParametersRequest {
    #[serde(default)]
    pub import_threshold: Option<f64>,
    #[serde(default)]
    pub review_threshold: Option<f64>,
    #[serde(default)]
    pub max_matches: Option<usize>,
}

/// GET /parameters
pub async fn get_parameters(State(state): State<AppState>) -> ApiResult<Json<MatchingConfig>> {
    Ok(Json(config::resolve_matching_config(&state.db).await?))
}

/// PUT /parameters
pub async fn update_parameters(
    State(state): State<AppState>,
    Json(request): Json<UpdateParametersRequest>,
) -> ApiResult<Json<MatchingConfig>> {
    for threshold in [request.import_threshold, request.review_threshold]
        .into_iter()
        .flatten()
    {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ApiError::BadRequest(format!(
                "Threshold out of range [0,1]: {}",
                threshold
            )));
        }
    }

    if let Some(value) = request.import_threshold {
        db::settings::set_setting(
            &state.db,
            "ingest_match_threshold_import",
            &value.to_string(),
        )
        .await?;
    }
    if let Some(value) = request.review_threshold {
        db::settings::set_setting(
            &state.db,
            "ingest_match_threshold_review",
            &value.to_string(),
        )
        .await?;
    }
    if let Some(value) = request.max_matches {
        db::settings::set_setting(&state.db, "ingest_max_matches", &value.to_string()).await?;
    }

    Ok(Json(config::resolve_matching_config(&state.db).await?))
}

/// Build parameter routes
pub fn parameter_routes() -> Router<AppState> {
    Router::new().route("/parameters", get(get_parameters).put(update_parameters))
}
