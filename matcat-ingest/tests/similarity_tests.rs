//! Similarity engine property tests
//!
//! Determinism, exact-match dominance, threshold behavior, and the
//! reference matching scenarios for the review flow.

use uuid::Uuid;

use matcat_ingest::db::manufacturers::Manufacturer;
use matcat_ingest::db::materials::Material;
use matcat_ingest::matching::{
    score_material, CatalogSnapshot, MatchBand, EXACT_REFERENCE_SCORE,
};
use matcat_ingest::models::{Candidate, EntityKind};

fn candidate(name: &str, category: &str) -> Candidate {
    Candidate {
        kind: EntityKind::Material,
        name: name.to_string(),
        category: Some(category.to_string()),
        subcategory: None,
        reference_code: None,
        dimensions: None,
        manufacturer_id: None,
        manufacturer_name: None,
        website: None,
        contact_email: None,
        contact_phone: None,
        notes: None,
    }
}

fn material(studio: Uuid, name: &str, category: &str) -> Material {
    Material::new(studio, name.to_string(), category.to_string())
}

/// Scenario A: identical reference code + manufacturer scores >= 0.95
/// with the "very high" band, regardless of name dissimilarity.
#[test]
fn scenario_a_reference_code_and_manufacturer_match() {
    let studio = Uuid::new_v4();
    let mfr = Manufacturer::new(studio, "Premium Woods Co".to_string());
    let mfr_id = mfr.manufacturer_id;

    let mut existing = material(studio, "White Oak 3in Natural", "Flooring");
    existing.reference_code = Some("WO-3-NAT".to_string());
    existing.manufacturer_id = Some(mfr_id);

    let mut c = candidate("White Oak Flooring", "Flooring");
    c.reference_code = Some("WO-3-NAT".to_string());
    c.manufacturer_name = Some("Premium Woods Co".to_string());

    let snapshot = CatalogSnapshot::from_records(vec![existing], vec![mfr]);
    let matches = score_material(&c, &snapshot, 0.6, 10);

    assert_eq!(matches.len(), 1);
    assert!(matches[0].score >= 0.95);
    assert_eq!(matches[0].band, MatchBand::VeryHigh);
}

/// Exact-match dominance holds even when the names share nothing at all.
#[test]
fn exact_match_dominates_name_dissimilarity() {
    let studio = Uuid::new_v4();
    let mfr = Manufacturer::new(studio, "Premium Woods Co".to_string());
    let mfr_id = mfr.manufacturer_id;

    let mut existing = material(studio, "ZZZ Legacy Import 00417", "Flooring");
    existing.reference_code = Some("WO-3-NAT".to_string());
    existing.manufacturer_id = Some(mfr_id);

    let mut c = candidate("White Oak Flooring", "Flooring");
    c.reference_code = Some("WO-3-NAT".to_string());
    c.manufacturer_id = Some(mfr_id);

    let snapshot = CatalogSnapshot::from_records(vec![existing], vec![mfr]);
    let matches = score_material(&c, &snapshot, 0.6, 10);

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].score, EXACT_REFERENCE_SCORE);
}

/// Same reference code under different manufacturers is not an exact match.
#[test]
fn same_reference_different_manufacturer_not_overridden() {
    let studio = Uuid::new_v4();
    let mfr_a = Manufacturer::new(studio, "Premium Woods Co".to_string());
    let mfr_b = Manufacturer::new(studio, "Other Woods Inc".to_string());
    let mfr_b_id = mfr_b.manufacturer_id;

    let mut existing = material(studio, "Completely Different Name", "Panels");
    existing.reference_code = Some("WO-3-NAT".to_string());
    existing.manufacturer_id = Some(mfr_b_id);

    let mut c = candidate("White Oak Flooring", "Flooring");
    c.reference_code = Some("WO-3-NAT".to_string());
    c.manufacturer_name = Some("Premium Woods Co".to_string());

    let snapshot = CatalogSnapshot::from_records(vec![existing], vec![mfr_a, mfr_b]);
    let matches = score_material(&c, &snapshot, 0.6, 10);

    // Weighted composite only; dissimilar names keep it below threshold
    assert!(matches.is_empty());
}

/// Determinism: fixed (candidate, catalog, threshold) always returns the
/// same ranked list.
#[test]
fn scoring_is_deterministic_over_large_catalog() {
    let studio = Uuid::new_v4();

    let mut materials = Vec::new();
    for i in 0..50 {
        let mut m = material(studio, &format!("Oak Flooring Variant {}", i), "Flooring");
        m.subcategory = Some("Hardwood".to_string());
        materials.push(m);
    }
    let snapshot = CatalogSnapshot::from_records(materials, vec![]);

    let mut c = candidate("Oak Flooring Variant 7", "Flooring");
    c.subcategory = Some("Hardwood".to_string());

    let baseline: Vec<(Uuid, f64)> = score_material(&c, &snapshot, 0.5, 25)
        .iter()
        .map(|m| (m.entity_id, m.score))
        .collect();
    assert!(!baseline.is_empty());

    for _ in 0..20 {
        let run: Vec<(Uuid, f64)> = score_material(&c, &snapshot, 0.5, 25)
            .iter()
            .map(|m| (m.entity_id, m.score))
            .collect();
        assert_eq!(run, baseline);
    }
}

/// Ranked output is sorted descending by score.
#[test]
fn matches_sorted_descending() {
    let studio = Uuid::new_v4();
    let materials = vec![
        material(studio, "White Oak Flooring", "Flooring"),
        material(studio, "White Oak Floor", "Flooring"),
        material(studio, "White Oak Panel", "Flooring"),
    ];
    let snapshot = CatalogSnapshot::from_records(materials, vec![]);

    let matches = score_material(&candidate("White Oak Flooring", "Flooring"), &snapshot, 0.5, 10);

    assert!(matches.len() >= 2);
    for pair in matches.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert_eq!(matches[0].name, "White Oak Flooring");
}

/// A candidate with no matches above 0.6 returns an empty list (Scenario B
/// precondition): the session will default to create.
#[test]
fn no_matches_above_import_threshold() {
    let studio = Uuid::new_v4();
    let materials = vec![
        material(studio, "Brushed Steel Handle", "Hardware"),
        material(studio, "Carrara Marble Slab", "Stone"),
    ];
    let snapshot = CatalogSnapshot::from_records(materials, vec![]);

    let matches = score_material(
        &candidate("Recycled Cotton Insulation", "Insulation"),
        &snapshot,
        0.6,
        10,
    );
    assert!(matches.is_empty());
}

/// Category mismatch contributes near-zero even when names are identical.
#[test]
fn category_mismatch_drags_score_down() {
    let studio = Uuid::new_v4();
    let matching_cat = material(studio, "White Oak Flooring", "Flooring");
    let wrong_cat = material(studio, "White Oak Flooring", "Furniture");
    let matching_id = matching_cat.material_id;

    let snapshot = CatalogSnapshot::from_records(vec![matching_cat, wrong_cat], vec![]);
    let matches = score_material(&candidate("White Oak Flooring", "Flooring"), &snapshot, 0.5, 10);

    assert_eq!(matches[0].entity_id, matching_id);
    assert!(matches[0].score > matches[1].score);
    assert!(matches[0].matched_fields.contains(&"category"));
    assert!(!matches[1].matched_fields.contains(&"category"));
}

/// Engine never mutates the snapshot it scores against.
#[test]
fn scoring_has_no_side_effects_on_snapshot() {
    let studio = Uuid::new_v4();
    let materials = vec![material(studio, "White Oak Flooring", "Flooring")];
    let snapshot = CatalogSnapshot::from_records(materials, vec![]);

    let before = snapshot.materials.len();
    let _ = score_material(&candidate("White Oak Flooring", "Flooring"), &snapshot, 0.5, 10);
    let _ = score_material(&candidate("Other", "Other"), &snapshot, 0.5, 10);
    assert_eq!(snapshot.materials.len(), before);
}
