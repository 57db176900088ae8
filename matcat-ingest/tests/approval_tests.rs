//! Approval queue commit algorithm tests
//!
//! Atomic approve, terminal reject, concurrency exclusivity, idempotent
//! association, and the queue-bypass path for linked candidates.

mod helpers;

use helpers::db_utils::{
    count_materials, file_pool, material_candidate, memory_pool, ready_submission, seed_material,
    seed_project,
};
use matcat_common::events::EventBus;
use uuid::Uuid;

use matcat_ingest::db;
use matcat_ingest::error::IngestError;
use matcat_ingest::models::{PendingEntity, PendingStatus, ResolutionDecision};
use matcat_ingest::queue::{self, CommitMode};

async fn enqueue_create(
    pool: &sqlx::SqlitePool,
    studio: Uuid,
    submission: Option<Uuid>,
    project: Option<Uuid>,
    name: &str,
) -> Uuid {
    let entity = PendingEntity::new(studio, submission, project, material_candidate(name, "Flooring"));
    let id = entity.pending_id;
    db::pending::enqueue(pool, &entity).await.unwrap();
    id
}

#[tokio::test]
async fn approve_creates_canonical_entity_and_association() {
    let pool = memory_pool().await;
    let bus = EventBus::new(16);
    let studio = Uuid::new_v4();
    let reviewer = Uuid::new_v4();

    let project = seed_project(&pool, studio, "Hotel Lobby").await;
    let submission = ready_submission(&pool, studio, Some(project), vec![]).await;
    let pending_id = enqueue_create(
        &pool,
        studio,
        Some(submission),
        Some(project),
        "White Oak Flooring",
    )
    .await;

    let outcome = queue::approve(&pool, &bus, pending_id, reviewer).await.unwrap();

    assert!(outcome.association_created);
    assert!(outcome.submission_completed);

    // Canonical entity exists with the candidate's fields
    let material = db::materials::load_material(&pool, studio, outcome.entity_id)
        .await
        .unwrap()
        .expect("canonical material created");
    assert_eq!(material.name, "White Oak Flooring");
    assert_eq!(material.category, "Flooring");

    // Exactly one association row
    assert_eq!(
        db::projects::count_associations(&pool, project, outcome.entity_id)
            .await
            .unwrap(),
        1
    );

    // Queue entry carries reviewer, timestamp, and the commit marker
    let entity = db::pending::load(&pool, pending_id).await.unwrap().unwrap();
    assert_eq!(entity.status, PendingStatus::Approved);
    assert_eq!(entity.reviewer_id, Some(reviewer));
    assert!(entity.reviewed_at.is_some());
    assert_eq!(entity.created_entity_id, Some(outcome.entity_id));
}

#[tokio::test]
async fn approve_twice_returns_already_resolved() {
    let pool = memory_pool().await;
    let bus = EventBus::new(16);
    let studio = Uuid::new_v4();
    let reviewer = Uuid::new_v4();

    let pending_id = enqueue_create(&pool, studio, None, None, "Walnut Panel").await;

    queue::approve(&pool, &bus, pending_id, reviewer).await.unwrap();
    let second = queue::approve(&pool, &bus, pending_id, reviewer).await;

    assert!(matches!(second, Err(IngestError::AlreadyResolved(id)) if id == pending_id));

    // The no-op did not duplicate the canonical entity
    assert_eq!(count_materials(&pool, studio).await, 1);
}

#[tokio::test]
async fn reject_is_terminal_and_creates_nothing() {
    let pool = memory_pool().await;
    let bus = EventBus::new(16);
    let studio = Uuid::new_v4();
    let reviewer = Uuid::new_v4();

    let pending_id = enqueue_create(&pool, studio, None, None, "Walnut Panel").await;

    queue::reject(&pool, &bus, pending_id, reviewer).await.unwrap();

    let entity = db::pending::load(&pool, pending_id).await.unwrap().unwrap();
    assert_eq!(entity.status, PendingStatus::Rejected);
    assert_eq!(count_materials(&pool, studio).await, 0);

    // Rejection is non-reversible: a later approve is a no-op error
    let approve_after = queue::approve(&pool, &bus, pending_id, reviewer).await;
    assert!(matches!(
        approve_after,
        Err(IngestError::AlreadyResolved(_))
    ));
}

#[tokio::test]
async fn unknown_pending_id_is_not_found() {
    let pool = memory_pool().await;
    let bus = EventBus::new(16);

    let result = queue::approve(&pool, &bus, Uuid::new_v4(), Uuid::new_v4()).await;
    assert!(matches!(
        result,
        Err(IngestError::Common(matcat_common::Error::NotFound(_)))
    ));
}

/// Queue exclusivity: concurrent approve and reject on the same id - exactly
/// one succeeds, the other observes AlreadyResolved.
#[tokio::test]
async fn concurrent_approve_and_reject_are_exclusive() {
    let (_dir, pool) = file_pool().await;
    let bus = EventBus::new(16);
    let studio = Uuid::new_v4();

    let pending_id = enqueue_create(&pool, studio, None, None, "White Oak Flooring").await;

    let approve_fut = queue::approve(&pool, &bus, pending_id, Uuid::new_v4());
    let reject_fut = queue::reject(&pool, &bus, pending_id, Uuid::new_v4());
    let (approve_result, reject_result) = tokio::join!(approve_fut, reject_fut);

    let approve_won = approve_result.is_ok();
    let reject_won = reject_result.is_ok();
    assert!(
        approve_won ^ reject_won,
        "exactly one resolution must win (approve: {:?}, reject: {:?})",
        approve_won,
        reject_won
    );

    let entity = db::pending::load(&pool, pending_id).await.unwrap().unwrap();
    if approve_won {
        assert_eq!(entity.status, PendingStatus::Approved);
        assert_eq!(count_materials(&pool, studio).await, 1);
        assert!(matches!(
            reject_result,
            Err(IngestError::AlreadyResolved(_))
        ));
    } else {
        assert_eq!(entity.status, PendingStatus::Rejected);
        assert_eq!(count_materials(&pool, studio).await, 0);
        assert!(matches!(
            approve_result,
            Err(IngestError::AlreadyResolved(_))
        ));
    }
}

/// A replayed approval of an already-approved row (commit marker present)
/// must not double-insert the canonical entity.
#[tokio::test]
async fn commit_marker_makes_replay_idempotent() {
    let pool = memory_pool().await;
    let bus = EventBus::new(16);
    let studio = Uuid::new_v4();
    let reviewer = Uuid::new_v4();

    let pending_id = enqueue_create(&pool, studio, None, None, "White Oak Flooring").await;
    let first = queue::approve(&pool, &bus, pending_id, reviewer).await.unwrap();

    // Simulate a replayed approval attempt after a partial failure: the row
    // is back to pending but the commit marker survived.
    sqlx::query("UPDATE pending_entities SET status = 'pending' WHERE pending_id = ?")
        .bind(pending_id.to_string())
        .execute(&pool)
        .await
        .unwrap();

    let second = queue::approve(&pool, &bus, pending_id, reviewer).await.unwrap();

    assert_eq!(second.entity_id, first.entity_id);
    assert_eq!(count_materials(&pool, studio).await, 1);
}

/// Scenario C: a LINK decision against an entity already associated with the
/// target project commits cleanly, leaves nothing pending, and creates no
/// second association row.
#[tokio::test]
async fn linked_candidate_bypasses_queue_and_absorbs_duplicate_association() {
    let pool = memory_pool().await;
    let bus = EventBus::new(16);
    let studio = Uuid::new_v4();

    let project = seed_project(&pool, studio, "Hotel Lobby").await;
    let existing = seed_material(&pool, studio, "White Oak Flooring", "Flooring", None, None).await;

    // The entity is already associated with the target project
    db::projects::associate_if_absent(
        &pool,
        &db::projects::ProjectAssociation {
            project_id: project,
            material_id: existing,
            studio_id: studio,
            quantity: None,
            unit_cost: None,
            notes: None,
        },
    )
    .await
    .unwrap();

    let submission = ready_submission(&pool, studio, Some(project), vec![]).await;
    let decision =
        ResolutionDecision::link(material_candidate("White Oak Flooring", "Flooring"), existing);

    let outcome = queue::commit_decisions(
        &pool,
        &bus,
        studio,
        Some(submission),
        Some(project),
        vec![decision],
        CommitMode::Queued,
    )
    .await
    .unwrap();

    assert_eq!(outcome.linked, 1);
    assert!(outcome.enqueued.is_empty());
    assert_eq!(outcome.associations_created, 0); // duplicate absorbed
    assert!(outcome.submission_completed); // nothing left pending

    // Exactly one association row survives
    assert_eq!(
        db::projects::count_associations(&pool, project, existing)
            .await
            .unwrap(),
        1
    );

    // No canonical-insert happened and nothing waits for a reviewer
    assert_eq!(count_materials(&pool, studio).await, 1);
    let pending = db::pending::list(&pool, studio, Some(PendingStatus::Pending))
        .await
        .unwrap();
    assert!(pending.is_empty());

    // The audit trail records the link resolution
    let linked = db::pending::list(&pool, studio, Some(PendingStatus::Linked))
        .await
        .unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].linked_entity_id, Some(existing));
}

/// Calling the association commit twice for the same pair produces exactly
/// one row (idempotent linking property).
#[tokio::test]
async fn idempotent_linking_same_pair_twice() {
    let pool = memory_pool().await;
    let studio = Uuid::new_v4();
    let project = seed_project(&pool, studio, "Hotel Lobby").await;
    let material = seed_material(&pool, studio, "White Oak Flooring", "Flooring", None, None).await;

    let association = db::projects::ProjectAssociation {
        project_id: project,
        material_id: material,
        studio_id: studio,
        quantity: Some(120.0),
        unit_cost: None,
        notes: None,
    };

    let first = db::projects::associate_if_absent(&pool, &association).await.unwrap();
    let second = db::projects::associate_if_absent(&pool, &association).await.unwrap();

    assert!(first);
    assert!(!second);
    assert_eq!(
        db::projects::count_associations(&pool, project, material)
            .await
            .unwrap(),
        1
    );
}

/// Scenario B: a candidate with no matches above threshold defaults to
/// create; approving produces exactly one new entity and no duplicate rows
/// for a 0.55-scoring near-miss neighbor.
#[tokio::test]
async fn scenario_b_create_produces_single_entity() {
    let pool = memory_pool().await;
    let bus = EventBus::new(16);
    let studio = Uuid::new_v4();
    let reviewer = Uuid::new_v4();

    // Near-miss neighbor: similar name, different category scores ~0.57
    seed_material(&pool, studio, "Oak Veneer Panel", "Panels", None, None).await;

    let candidate = material_candidate("Oak Veneer Plank", "Flooring");
    let snapshot = matcat_ingest::matching::CatalogSnapshot::load(&pool, studio)
        .await
        .unwrap();
    let matches = matcat_ingest::matching::score_material(&candidate, &snapshot, 0.6, 10);
    assert!(matches.is_empty(), "near-miss must stay below threshold");

    let submission = ready_submission(&pool, studio, None, vec![]).await;
    let outcome = queue::commit_decisions(
        &pool,
        &bus,
        studio,
        Some(submission),
        None,
        vec![ResolutionDecision::create(candidate)],
        CommitMode::Queued,
    )
    .await
    .unwrap();
    assert_eq!(outcome.enqueued.len(), 1);

    queue::approve(&pool, &bus, outcome.enqueued[0], reviewer)
        .await
        .unwrap();

    // Exactly one new material beside the near-miss neighbor
    assert_eq!(count_materials(&pool, studio).await, 2);
}

/// Bulk approval applies per-item commit semantics: every item gets its
/// canonical insert and association, and the submission completes.
#[tokio::test]
async fn bulk_approval_commits_each_item() {
    let pool = memory_pool().await;
    let bus = EventBus::new(16);
    let studio = Uuid::new_v4();
    let reviewer = Uuid::new_v4();

    let project = seed_project(&pool, studio, "Hotel Lobby").await;
    let submission = ready_submission(&pool, studio, Some(project), vec![]).await;

    for name in ["White Oak Flooring", "Walnut Panel", "Brass Door Pull"] {
        enqueue_create(&pool, studio, Some(submission), Some(project), name).await;
    }

    let outcome = queue::approve_all(&pool, &bus, submission, reviewer).await.unwrap();

    assert_eq!(outcome.approved.len(), 3);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(count_materials(&pool, studio).await, 3);

    // Associations were derived per item, not skipped by a bulk status flip
    for approved in &outcome.approved {
        assert_eq!(
            db::projects::count_associations(&pool, project, approved.entity_id)
                .await
                .unwrap(),
            1
        );
    }

    let parent = db::submissions::load_submission(&pool, submission)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        parent.state,
        matcat_ingest::models::SubmissionState::Completed
    );
}

/// Direct mode (zero review gate) writes canonical entities immediately.
#[tokio::test]
async fn direct_mode_skips_reviewer_gate() {
    let pool = memory_pool().await;
    let bus = EventBus::new(16);
    let studio = Uuid::new_v4();

    let outcome = queue::commit_decisions(
        &pool,
        &bus,
        studio,
        None,
        None,
        vec![
            ResolutionDecision::create(material_candidate("White Oak Flooring", "Flooring")),
            ResolutionDecision::create(material_candidate("Walnut Panel", "Panels")),
        ],
        CommitMode::Direct,
    )
    .await
    .unwrap();

    assert_eq!(outcome.created.len(), 2);
    assert!(outcome.enqueued.is_empty());
    assert_eq!(count_materials(&pool, studio).await, 2);

    let queue_rows = db::pending::list(&pool, studio, None).await.unwrap();
    assert!(queue_rows.is_empty());
}
