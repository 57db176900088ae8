//! Configuration resolution for matcat-ingest
//!
//! Provides multi-tier resolution for matching parameters with
//! Database → ENV → compiled-default priority.

use matcat_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::warn;

/// Matching parameters used by the similarity call sites
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MatchingConfig {
    /// Threshold applied when scoring an import batch
    pub import_threshold: f64,
    /// Threshold applied during an interactive review session
    pub review_threshold: f64,
    /// Maximum matches returned per candidate
    pub max_matches: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            import_threshold: 0.6,
            review_threshold: 0.5,
            max_matches: 10,
        }
    }
}

/// Resolve matching parameters from 3-tier configuration
///
/// **Priority:** Database settings → environment variables → defaults.
/// Unparseable values fall through to the next tier with a warning.
pub async fn resolve_matching_config(db: &Pool<Sqlite>) -> Result<MatchingConfig> {
    let defaults = MatchingConfig::default();

    let import_threshold = resolve_f64(
        db,
        "ingest_match_threshold_import",
        "MATCAT_MATCH_THRESHOLD_IMPORT",
        defaults.import_threshold,
    )
    .await?;

    let review_threshold = resolve_f64(
        db,
        "ingest_match_threshold_review",
        "MATCAT_MATCH_THRESHOLD_REVIEW",
        defaults.review_threshold,
    )
    .await?;

    let max_matches = resolve_f64(
        db,
        "ingest_max_matches",
        "MATCAT_MAX_MATCHES",
        defaults.max_matches as f64,
    )
    .await? as usize;

    Ok(MatchingConfig {
        import_threshold,
        review_threshold,
        max_matches,
    })
}

async fn resolve_f64(db: &Pool<Sqlite>, key: &str, env_var: &str, default: f64) -> Result<f64> {
    // Tier 1: Database (authoritative)
    if let Some(raw) = crate::db::settings::get_setting(db, key).await? {
        match raw.parse::<f64>() {
            Ok(value) => return Ok(value),
            Err(_) => warn!(key, raw, "Unparseable setting value, trying next tier"),
        }
    }

    // Tier 2: Environment variable
    if let Ok(raw) = std::env::var(env_var) {
        match raw.parse::<f64>() {
            Ok(value) => return Ok(value),
            Err(_) => warn!(env_var, raw, "Unparseable environment value, using default"),
        }
    }

    // Tier 3: Compiled default
    Ok(default)
}
