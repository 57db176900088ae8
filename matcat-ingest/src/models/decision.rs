//! Resolution decisions
//!
//! Exactly one decision per candidate in a resolution session.

use super::candidate::Candidate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What to do with a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// Create a new canonical record
    Create,
    /// Link to an existing catalog entity
    Link,
}

/// Decision for one candidate
///
/// Invariant: `Link` implies `linked_entity_id` is a valid existing
/// same-tenant entity id; `Create` implies no linked id. Construct through
/// [`ResolutionDecision::create`] / [`ResolutionDecision::link`] to keep the
/// invariant unrepresentable-by-construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionDecision {
    pub candidate: Candidate,
    pub action: DecisionAction,
    pub linked_entity_id: Option<Uuid>,
}

impl ResolutionDecision {
    pub fn create(candidate: Candidate) -> Self {
        Self {
            candidate,
            action: DecisionAction::Create,
            linked_entity_id: None,
        }
    }

    pub fn link(candidate: Candidate, linked_entity_id: Uuid) -> Self {
        Self {
            candidate,
            action: DecisionAction::Link,
            linked_entity_id: Some(linked_entity_id),
        }
    }
}
