//! Batch committer for resolution session output
//!
//! Turns a completed session's decision list into catalog state. In queued
//! mode, create decisions become pending queue entries for a reviewer; link
//! decisions bypass the queue's canonical-insert step entirely, performing
//! only the idempotent project-association step and leaving a `linked` audit
//! row. In direct mode (zero review gate) create decisions write canonical
//! entities immediately.

use matcat_common::events::{CatalogEvent, EventBus};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;
use crate::db::materials::Material;
use crate::db::manufacturers::Manufacturer;
use crate::db::projects::ProjectAssociation;
use crate::error::IngestError;
use crate::models::{
    Candidate, DecisionAction, EntityKind, PendingEntity, PendingStatus, ResolutionDecision,
};
use crate::utils::retry_on_lock;

/// Whether committed candidates pass through the reviewer gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Create decisions wait in the approval queue
    Queued,
    /// Create decisions write canonical entities immediately
    Direct,
}

impl Default for CommitMode {
    fn default() -> Self {
        Self::Queued
    }
}

/// Result of committing one decision list
#[derive(Debug, Default, serde::Serialize)]
pub struct CommitOutcome {
    /// Queue entries awaiting review (queued mode)
    pub enqueued: Vec<Uuid>,
    /// Canonical entities created (direct mode)
    pub created: Vec<Uuid>,
    /// Link decisions applied
    pub linked: usize,
    /// Project associations actually inserted (duplicates absorbed)
    pub associations_created: usize,
    /// True when the parent submission completed on this commit
    pub submission_completed: bool,
}

/// Build a canonical material from candidate fields
///
/// The free-text manufacturer name, when present and unresolved, goes through
/// the case-insensitive lookup; an unresolvable name leaves the field unset.
async fn material_from_candidate(
    pool: &SqlitePool,
    studio_id: Uuid,
    candidate: &Candidate,
) -> Result<Material, IngestError> {
    let manufacturer_id = match candidate.manufacturer_id {
        Some(id) => Some(id),
        None => match candidate.manufacturer_name.as_deref() {
            Some(name) => db::manufacturers::find_by_name(pool, studio_id, name)
                .await?
                .map(|m| m.manufacturer_id),
            None => None,
        },
    };

    let mut material = Material::new(
        studio_id,
        candidate.name.clone(),
        candidate.category.clone().unwrap_or_default(),
    );
    material.subcategory = candidate.subcategory.clone();
    material.reference_code = candidate.reference_code.clone();
    material.dimensions = candidate.dimensions.clone();
    material.manufacturer_id = manufacturer_id;
    material.notes = candidate.notes.clone();
    Ok(material)
}

fn manufacturer_from_candidate(studio_id: Uuid, candidate: &Candidate) -> Manufacturer {
    let mut manufacturer = Manufacturer::new(studio_id, candidate.name.clone());
    manufacturer.website = candidate.website.clone();
    manufacturer.contact_email = candidate.contact_email.clone();
    manufacturer.contact_phone = candidate.contact_phone.clone();
    manufacturer.notes = candidate.notes.clone();
    manufacturer
}

/// Commit a completed session's decisions
///
/// No partial writes precede this call; cancellation of a session never
/// reaches the committer.
pub async fn commit_decisions(
    pool: &SqlitePool,
    bus: &EventBus,
    studio_id: Uuid,
    submission_id: Option<Uuid>,
    project_id: Option<Uuid>,
    decisions: Vec<ResolutionDecision>,
    mode: CommitMode,
) -> Result<CommitOutcome, IngestError> {
    let mut outcome = CommitOutcome::default();
    let max_wait_ms = db::settings::max_lock_wait_ms(pool).await?;

    for decision in decisions {
        match decision.action {
            DecisionAction::Link => {
                // linked_entity_id presence is a construction invariant
                let linked_id = decision.linked_entity_id.ok_or_else(|| {
                    IngestError::Validation("Link decision without target".to_string())
                })?;

                if let (Some(project), EntityKind::Material) = (project_id, decision.candidate.kind)
                {
                    let association = ProjectAssociation {
                        project_id: project,
                        material_id: linked_id,
                        studio_id,
                        quantity: None,
                        unit_cost: None,
                        notes: None,
                    };
                    let inserted = db::projects::associate_if_absent(pool, &association).await?;
                    if inserted {
                        outcome.associations_created += 1;
                        bus.emit(CatalogEvent::AssociationCreated {
                            project_id: project,
                            entity_id: linked_id,
                            timestamp: chrono::Utc::now(),
                        })
                        .ok();
                    }
                }

                // Audit trail for queued submissions: the candidate was
                // resolved as a link and never enters the pending count.
                if mode == CommitMode::Queued && submission_id.is_some() {
                    let mut entry = PendingEntity::new(
                        studio_id,
                        submission_id,
                        project_id,
                        decision.candidate.clone(),
                    );
                    entry.status = PendingStatus::Linked;
                    entry.linked_entity_id = Some(linked_id);
                    retry_on_lock("record linked candidate", max_wait_ms, || {
                        db::pending::enqueue(pool, &entry)
                    })
                    .await?;
                }

                outcome.linked += 1;
            }

            DecisionAction::Create => match mode {
                CommitMode::Queued => {
                    let entry = PendingEntity::new(
                        studio_id,
                        submission_id,
                        project_id,
                        decision.candidate.clone(),
                    );
                    retry_on_lock("enqueue pending entity", max_wait_ms, || {
                        db::pending::enqueue(pool, &entry)
                    })
                    .await?;

                    bus.emit(CatalogEvent::PendingEnqueued {
                        pending_id: entry.pending_id,
                        submission_id,
                        timestamp: chrono::Utc::now(),
                    })
                    .ok();

                    outcome.enqueued.push(entry.pending_id);
                }
                CommitMode::Direct => {
                    let entity_id = match decision.candidate.kind {
                        EntityKind::Material => {
                            let material =
                                material_from_candidate(pool, studio_id, &decision.candidate)
                                    .await?;
                            db::materials::save_material(pool, &material).await?;
                            material.material_id
                        }
                        EntityKind::Manufacturer => {
                            let manufacturer =
                                manufacturer_from_candidate(studio_id, &decision.candidate);
                            db::manufacturers::save_manufacturer(pool, &manufacturer).await?;
                            manufacturer.manufacturer_id
                        }
                    };

                    if let (Some(project), EntityKind::Material) =
                        (project_id, decision.candidate.kind)
                    {
                        let association = ProjectAssociation {
                            project_id: project,
                            material_id: entity_id,
                            studio_id,
                            quantity: None,
                            unit_cost: None,
                            notes: None,
                        };
                        let inserted =
                            db::projects::associate_if_absent(pool, &association).await?;
                        if inserted {
                            outcome.associations_created += 1;
                            bus.emit(CatalogEvent::AssociationCreated {
                                project_id: project,
                                entity_id,
                                timestamp: chrono::Utc::now(),
                            })
                            .ok();
                        }
                    }

                    outcome.created.push(entity_id);
                }
            },
        }
    }

    // A submission with nothing left pending (all linked, or direct mode)
    // completes here; otherwise the approval queue drives completion.
    if let Some(submission) = submission_id {
        if db::submissions::on_child_resolved(pool, submission).await? {
            outcome.submission_completed = true;
            bus.emit(CatalogEvent::SubmissionStateChanged {
                submission_id: submission,
                old_state: "ready_for_review".to_string(),
                new_state: "completed".to_string(),
                timestamp: chrono::Utc::now(),
            })
            .ok();
            bus.emit(CatalogEvent::SubmissionCompleted {
                submission_id: submission,
                timestamp: chrono::Utc::now(),
            })
            .ok();
        }
    }

    tracing::info!(
        enqueued = outcome.enqueued.len(),
        created = outcome.created.len(),
        linked = outcome.linked,
        associations = outcome.associations_created,
        "Decision batch committed"
    );

    Ok(outcome)
}
