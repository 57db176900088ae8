//! Submission ledger state machine
//!
//! A submission is the parent record for one ingestion batch (e.g. one
//! uploaded document). It progresses through
//! `pending → processing → ready_for_review → {completed, rejected}`.

use chrono::{DateTime, Utc};
use matcat_common::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Submission lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// Created, extraction not started
    Pending,
    /// Extraction / candidate generation in flight (external collaborator)
    Processing,
    /// Candidates available for a resolution session
    ReadyForReview,
    /// All pending children resolved; set only via on_child_resolved
    Completed,
    /// Explicit terminal override
    Rejected,
}

impl SubmissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::ReadyForReview => "ready_for_review",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "ready_for_review" => Some(Self::ReadyForReview),
            "completed" => Some(Self::Completed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// Whether the ledger permits `self → next`
    ///
    /// `Rejected` is reachable from any non-completed state. `Completed` is
    /// reachable only from `ReadyForReview` (and only the approval queue's
    /// child-resolution path takes it).
    pub fn can_transition_to(&self, next: SubmissionState) -> bool {
        match (self, next) {
            (Self::Pending, Self::Processing) => true,
            (Self::Processing, Self::ReadyForReview) => true,
            (Self::ReadyForReview, Self::Completed) => true,
            (Self::Pending | Self::Processing | Self::ReadyForReview, Self::Rejected) => true,
            _ => false,
        }
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionTransition {
    pub submission_id: Uuid,
    pub old_state: SubmissionState,
    pub new_state: SubmissionState,
    pub transitioned_at: DateTime<Utc>,
}

/// Submission ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub submission_id: Uuid,
    pub studio_id: Uuid,
    pub state: SubmissionState,

    /// Human-readable source (file name, "manual batch", ...)
    pub source_label: String,

    /// Project to associate committed entities with
    pub project_id: Option<Uuid>,

    /// Candidates accepted into the batch
    pub candidate_count: usize,

    /// Candidates dropped by validation
    pub skipped_count: usize,

    /// Failure note for rejected submissions
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Create a new submission in the `pending` state
    pub fn new(studio_id: Uuid, source_label: String, project_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            submission_id: Uuid::new_v4(),
            studio_id,
            state: SubmissionState::Pending,
            source_label,
            project_id,
            candidate_count: 0,
            skipped_count: 0,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Transition to a new state, enforcing the ledger's allowed edges
    pub fn transition_to(&mut self, new_state: SubmissionState) -> Result<SubmissionTransition> {
        if !self.state.can_transition_to(new_state) {
            return Err(Error::InvalidInput(format!(
                "Invalid submission transition: {} -> {}",
                self.state.as_str(),
                new_state.as_str()
            )));
        }

        let transition = SubmissionTransition {
            submission_id: self.submission_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;
        self.updated_at = transition.transitioned_at;

        if new_state == SubmissionState::Completed {
            self.completed_at = Some(transition.transitioned_at);
        }

        Ok(transition)
    }
}
