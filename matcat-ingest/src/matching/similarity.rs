//! Similarity scoring for candidate entities
//!
//! Field-wise normalized edit distance combined into a weighted composite,
//! with an exact-match override for reference code + manufacturer identity.
//! Deterministic and side-effect-free: identical inputs produce identical
//! ranked output.

use serde::Serialize;
use uuid::Uuid;

use super::snapshot::CatalogSnapshot;
use crate::models::{Candidate, EntityKind};

/// Fixed score for exact reference-code + manufacturer identity.
/// SKU identity is a stronger duplicate signal than fuzzy name similarity
/// and must not be diluted by the weighted text score.
pub const EXACT_REFERENCE_SCORE: f64 = 0.97;

// Material composite weights
const W_NAME: f64 = 0.50;
const W_CATEGORY: f64 = 0.20;
const W_MANUFACTURER: f64 = 0.15;
const W_SUBCATEGORY: f64 = 0.10;
const W_REFERENCE: f64 = 0.05;

// Manufacturer composite weights
const W_MFR_NAME: f64 = 0.80;
const W_MFR_WEBSITE: f64 = 0.20;

/// Presentation band for a similarity score
///
/// Bands label the UI only; they never change the create/link default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBand {
    VeryHigh,
    High,
    Medium,
    Low,
}

impl MatchBand {
    pub fn for_score(score: f64) -> Self {
        if score >= 0.9 {
            Self::VeryHigh
        } else if score >= 0.8 {
            Self::High
        } else if score >= 0.7 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One plausible duplicate for a candidate
///
/// Ephemeral value: produced on demand, never persisted. Enrichment data
/// (e.g. which projects already use the entity) is added lazily by callers.
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    pub entity_id: Uuid,
    pub name: String,
    pub score: f64,
    pub matched_fields: Vec<&'static str>,
    pub band: MatchBand,
}

/// Symmetric text similarity in [0,1]; identical strings score 1.0
///
/// Normalized Levenshtein over lowercase-trimmed input.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}

fn eq_normalized(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Resolve the candidate's manufacturer identity against the snapshot
///
/// An explicit id wins; otherwise the free-text name goes through the
/// snapshot's case-insensitive exact lookup. None simply drops the
/// manufacturer term from the composite.
fn candidate_manufacturer(candidate: &Candidate, snapshot: &CatalogSnapshot) -> Option<Uuid> {
    if let Some(id) = candidate.manufacturer_id {
        return Some(id);
    }
    candidate
        .manufacturer_name
        .as_deref()
        .and_then(|name| snapshot.resolve_manufacturer(name))
}

/// Score a candidate against the catalog, dispatching on its kind
pub fn score_candidate(
    candidate: &Candidate,
    snapshot: &CatalogSnapshot,
    threshold: f64,
    max_matches: usize,
) -> Vec<MatchCandidate> {
    match candidate.kind {
        EntityKind::Material => score_material(candidate, snapshot, threshold, max_matches),
        EntityKind::Manufacturer => score_manufacturer(candidate, snapshot, threshold, max_matches),
    }
}

/// Rank a material candidate's plausible duplicates
///
/// Returns the subset of the catalog whose composite score exceeds
/// `threshold`, sorted descending by score (ties broken by entity id so the
/// ordering is total and repeatable).
pub fn score_material(
    candidate: &Candidate,
    snapshot: &CatalogSnapshot,
    threshold: f64,
    max_matches: usize,
) -> Vec<MatchCandidate> {
    let candidate_mfr = candidate_manufacturer(candidate, snapshot);
    let candidate_ref = non_blank(&candidate.reference_code);

    let mut matches: Vec<MatchCandidate> = snapshot
        .materials
        .iter()
        .filter_map(|existing| {
            let mut matched_fields = Vec::new();

            // Exact-match override: same non-empty reference code and same
            // resolved manufacturer identity.
            if let (Some(c_ref), Some(e_ref)) = (candidate_ref, non_blank(&existing.reference_code))
            {
                let same_mfr = matches!(
                    (candidate_mfr, existing.manufacturer_id),
                    (Some(a), Some(b)) if a == b
                );
                if same_mfr && eq_normalized(c_ref, e_ref) {
                    matched_fields.push("reference_code");
                    matched_fields.push("manufacturer");
                    if text_similarity(&candidate.name, &existing.name) >= 0.8 {
                        matched_fields.push("name");
                    }
                    return Some(MatchCandidate {
                        entity_id: existing.material_id,
                        name: existing.name.clone(),
                        score: EXACT_REFERENCE_SCORE,
                        matched_fields,
                        band: MatchBand::for_score(EXACT_REFERENCE_SCORE),
                    });
                }
            }

            // Weighted composite over fields present on both sides
            let mut score_sum = 0.0;
            let mut weight_sum = 0.0;

            let name_sim = text_similarity(&candidate.name, &existing.name);
            score_sum += W_NAME * name_sim;
            weight_sum += W_NAME;
            if name_sim >= 0.8 {
                matched_fields.push("name");
            }

            if let Some(category) = non_blank(&candidate.category) {
                // Category must match or contribute near-zero
                let category_sim = if eq_normalized(category, &existing.category) {
                    matched_fields.push("category");
                    1.0
                } else {
                    0.0
                };
                score_sum += W_CATEGORY * category_sim;
                weight_sum += W_CATEGORY;
            }

            if let (Some(c_mfr), Some(e_mfr)) = (candidate_mfr, existing.manufacturer_id) {
                let mfr_sim = if c_mfr == e_mfr {
                    matched_fields.push("manufacturer");
                    1.0
                } else {
                    0.0
                };
                score_sum += W_MANUFACTURER * mfr_sim;
                weight_sum += W_MANUFACTURER;
            }

            if let (Some(c_sub), Some(e_sub)) =
                (non_blank(&candidate.subcategory), non_blank(&existing.subcategory))
            {
                let sub_sim = text_similarity(c_sub, e_sub);
                score_sum += W_SUBCATEGORY * sub_sim;
                weight_sum += W_SUBCATEGORY;
                if sub_sim >= 0.8 {
                    matched_fields.push("subcategory");
                }
            }

            if let (Some(c_ref), Some(e_ref)) = (candidate_ref, non_blank(&existing.reference_code))
            {
                let ref_sim = if eq_normalized(c_ref, e_ref) {
                    matched_fields.push("reference_code");
                    1.0
                } else {
                    text_similarity(c_ref, e_ref)
                };
                score_sum += W_REFERENCE * ref_sim;
                weight_sum += W_REFERENCE;
            }

            let score = if weight_sum > 0.0 {
                score_sum / weight_sum
            } else {
                0.0
            };

            (score > threshold).then(|| MatchCandidate {
                entity_id: existing.material_id,
                name: existing.name.clone(),
                score,
                matched_fields,
                band: MatchBand::for_score(score),
            })
        })
        .collect();

    rank(&mut matches, max_matches);
    matches
}

/// Rank a manufacturer candidate's plausible duplicates
pub fn score_manufacturer(
    candidate: &Candidate,
    snapshot: &CatalogSnapshot,
    threshold: f64,
    max_matches: usize,
) -> Vec<MatchCandidate> {
    let candidate_host = non_blank(&candidate.website).map(website_host);

    let mut matches: Vec<MatchCandidate> = snapshot
        .manufacturers
        .iter()
        .filter_map(|existing| {
            let mut matched_fields = Vec::new();
            let mut score_sum = 0.0;
            let mut weight_sum = 0.0;

            let name_sim = text_similarity(&candidate.name, &existing.name);
            score_sum += W_MFR_NAME * name_sim;
            weight_sum += W_MFR_NAME;
            if name_sim >= 0.8 {
                matched_fields.push("name");
            }

            if let (Some(c_host), Some(e_host)) = (
                candidate_host.as_deref(),
                non_blank(&existing.website).map(website_host),
            ) {
                let host_sim = if c_host == e_host {
                    matched_fields.push("website");
                    1.0
                } else {
                    0.0
                };
                score_sum += W_MFR_WEBSITE * host_sim;
                weight_sum += W_MFR_WEBSITE;
            }

            let score = score_sum / weight_sum;

            (score > threshold).then(|| MatchCandidate {
                entity_id: existing.manufacturer_id,
                name: existing.name.clone(),
                score,
                matched_fields,
                band: MatchBand::for_score(score),
            })
        })
        .collect();

    rank(&mut matches, max_matches);
    matches
}

/// Sort descending by score with a total tie-break on entity id, then truncate
fn rank(matches: &mut Vec<MatchCandidate>, max_matches: usize) {
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
    matches.truncate(max_matches);
}

/// Reduce a website URL to its host for comparison
fn website_host(url: &str) -> String {
    let url = url.trim().to_lowercase();
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(&url);
    let host = without_scheme.split('/').next().unwrap_or(without_scheme);
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
