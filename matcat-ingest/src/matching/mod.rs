//! Duplicate-detection matching
//!
//! The similarity engine is pure and deterministic: callers load a
//! tenant-scoped [`CatalogSnapshot`] and the engine only computes scores.
//! It never touches the catalog.

pub mod similarity;
pub mod snapshot;

pub use similarity::{
    score_candidate, score_manufacturer, score_material, text_similarity, MatchBand,
    MatchCandidate, EXACT_REFERENCE_SCORE,
};
pub use snapshot::CatalogSnapshot;
