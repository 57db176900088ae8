//! Resolution session protocol tests
//!
//! Sequential decision recording, suggested defaults, backward navigation,
//! batch flattening/validation, and cancellation without side effects.

mod helpers;

use helpers::db_utils::{material_candidate, memory_pool};
use uuid::Uuid;

use matcat_ingest::db;
use matcat_ingest::matching::{score_material, CatalogSnapshot};
use matcat_ingest::models::{partition_valid, CandidateBatch, DecisionAction};
use matcat_ingest::session::{ResolutionSession, SuggestedAction};

#[test]
fn emits_decisions_in_candidate_order() {
    let candidates = vec![
        material_candidate("First", "Flooring"),
        material_candidate("Second", "Flooring"),
        material_candidate("Third", "Flooring"),
    ];
    let mut session = ResolutionSession::new(Uuid::new_v4(), None, None, candidates);
    let linked = Uuid::new_v4();

    session.decide(DecisionAction::Create, None).unwrap();
    session.decide(DecisionAction::Link, Some(linked)).unwrap();
    session.decide(DecisionAction::Create, None).unwrap();

    let decisions = session.complete().unwrap();
    assert_eq!(decisions.len(), 3);
    assert_eq!(decisions[0].candidate.name, "First");
    assert_eq!(decisions[0].action, DecisionAction::Create);
    assert_eq!(decisions[1].candidate.name, "Second");
    assert_eq!(decisions[1].action, DecisionAction::Link);
    assert_eq!(decisions[1].linked_entity_id, Some(linked));
    assert_eq!(decisions[2].candidate.name, "Third");
}

/// Default action follows the match list: link to the top match when one
/// exists, create otherwise (Scenario B default).
#[test]
fn suggested_default_tracks_matches() {
    let studio = Uuid::new_v4();
    let existing = matcat_ingest::db::materials::Material::new(
        studio,
        "White Oak Flooring".to_string(),
        "Flooring".to_string(),
    );
    let existing_id = existing.material_id;
    let snapshot = CatalogSnapshot::from_records(vec![existing], vec![]);

    let near = material_candidate("White Oak Flooring", "Flooring");
    let matches = score_material(&near, &snapshot, 0.6, 10);
    let suggestion = SuggestedAction::from_matches(&matches);
    assert_eq!(suggestion.action, DecisionAction::Link);
    assert_eq!(suggestion.linked_entity_id, Some(existing_id));

    let unrelated = material_candidate("Recycled Cotton Insulation", "Insulation");
    let matches = score_material(&unrelated, &snapshot, 0.6, 10);
    let suggestion = SuggestedAction::from_matches(&matches);
    assert_eq!(suggestion.action, DecisionAction::Create);
    assert_eq!(suggestion.linked_entity_id, None);
}

#[test]
fn backward_navigation_redisplays_prior_state() {
    let candidates = vec![
        material_candidate("First", "Flooring"),
        material_candidate("Second", "Flooring"),
    ];
    let mut session = ResolutionSession::new(Uuid::new_v4(), None, None, candidates);

    session.decide(DecisionAction::Create, None).unwrap();
    assert_eq!(session.current().unwrap().0, 1);

    session.back().unwrap();
    assert_eq!(session.current().unwrap().0, 0);
    assert_eq!(session.decision_at(0), Some((DecisionAction::Create, None)));

    // Overriding the earlier decision advances past the still-undecided
    // second candidate's predecessor straight to it.
    let linked = Uuid::new_v4();
    session.decide(DecisionAction::Link, Some(linked)).unwrap();
    assert_eq!(session.current().unwrap().0, 1);
    assert_eq!(
        session.decision_at(0),
        Some((DecisionAction::Link, Some(linked)))
    );
}

/// The nested per-manufacturer-key shape flattens with back-filled names
/// before any matching begins.
#[test]
fn nested_shape_flattens_before_session() {
    let json = r#"
    {
        "Premium Woods Co": [
            {"name": "White Oak Flooring", "category": "Flooring"},
            {"name": "Walnut Panel", "category": "Panels"}
        ],
        "Acme Stone": [
            {"name": "Carrara Slab", "category": "Stone"}
        ]
    }
    "#;

    let batch: CandidateBatch = serde_json::from_str(json).unwrap();
    let (valid, skipped) = partition_valid(batch.flatten());

    assert_eq!(valid.len(), 3);
    assert_eq!(skipped, 0);
    assert!(valid
        .iter()
        .all(|candidate| candidate.manufacturer_name.is_some()));

    let session = ResolutionSession::new(Uuid::new_v4(), None, None, valid);
    assert_eq!(session.len(), 3);
}

/// Malformed candidates are rejected before entering the session; the batch
/// continues and reports the skipped count.
#[test]
fn invalid_candidates_skipped_with_count() {
    let json = r#"[
        {"name": "White Oak Flooring", "category": "Flooring"},
        {"name": "", "category": "Flooring"},
        {"name": "Missing Category"}
    ]"#;

    let batch: CandidateBatch = serde_json::from_str(json).unwrap();
    let (valid, skipped) = partition_valid(batch.flatten());

    assert_eq!(valid.len(), 1);
    assert_eq!(skipped, 2);
}

/// Abandoning a session leaves no catalog state behind: nothing is written
/// before explicit completion.
#[tokio::test]
async fn cancellation_has_no_catalog_side_effects() {
    let pool = memory_pool().await;
    let studio = Uuid::new_v4();

    let mut session = ResolutionSession::new(
        studio,
        None,
        None,
        vec![
            material_candidate("White Oak Flooring", "Flooring"),
            material_candidate("Walnut Panel", "Panels"),
        ],
    );
    session.decide(DecisionAction::Create, None).unwrap();

    // Session dropped mid-batch without complete(); the catalog and queue
    // must be untouched.
    drop(session);

    let materials = db::materials::list_materials(&pool, studio).await.unwrap();
    assert!(materials.is_empty());

    let queue = db::pending::list(&pool, studio, None).await.unwrap();
    assert!(queue.is_empty());
}
