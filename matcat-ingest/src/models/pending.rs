//! Pending entities held in the approval queue

use super::candidate::{Candidate, EntityKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Approval queue status
///
/// `pending → {approved, rejected}`. `linked` records candidates resolved as
/// links at commit time; they bypass the reviewer gate and never count toward
/// a submission's pending children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingStatus {
    Pending,
    Approved,
    Rejected,
    Linked,
}

impl PendingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Linked => "linked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "linked" => Some(Self::Linked),
            _ => None,
        }
    }
}

/// A candidate placed in the approval queue awaiting reviewer action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingEntity {
    pub pending_id: Uuid,
    pub studio_id: Uuid,
    pub submission_id: Option<Uuid>,
    pub kind: EntityKind,

    /// Descriptive fields carried from the candidate
    pub candidate: Candidate,

    /// Project association to propagate on approval
    pub project_id: Option<Uuid>,

    pub status: PendingStatus,

    /// Target entity for link-resolved candidates
    pub linked_entity_id: Option<Uuid>,

    /// Commit marker: canonical entity created by an approval.
    /// Makes re-entrant approval idempotent on the canonical-insert step.
    pub created_entity_id: Option<Uuid>,

    pub reviewer_id: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PendingEntity {
    /// Build a fresh queue entry from a candidate
    pub fn new(
        studio_id: Uuid,
        submission_id: Option<Uuid>,
        project_id: Option<Uuid>,
        candidate: Candidate,
    ) -> Self {
        Self {
            pending_id: Uuid::new_v4(),
            studio_id,
            submission_id,
            kind: candidate.kind,
            candidate,
            project_id,
            status: PendingStatus::Pending,
            linked_entity_id: None,
            created_entity_id: None,
            reviewer_id: None,
            reviewed_at: None,
            created_at: Utc::now(),
        }
    }
}
