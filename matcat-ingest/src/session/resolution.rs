//! Resolution session protocol
//!
//! Walks a batch of candidates one at a time, records a create/link decision
//! for each, and emits the full ordered decision list on completion. The
//! session itself is pure state: match computation is lazy and owned by the
//! caller (which loads a fresh catalog snapshot for the current candidate),
//! and no catalog writes happen before explicit completion. Abandoning a
//! session at any point has no side effects.

use matcat_common::{Error, Result};
use uuid::Uuid;

use crate::matching::MatchCandidate;
use crate::models::{Candidate, DecisionAction, ResolutionDecision};

/// Suggested default for the current candidate
///
/// Link to the top-ranked match when at least one match exists, create
/// otherwise. The operator may override either way before completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SuggestedAction {
    pub action: DecisionAction,
    pub linked_entity_id: Option<Uuid>,
}

impl SuggestedAction {
    pub fn from_matches(matches: &[MatchCandidate]) -> Self {
        match matches.first() {
            Some(top) => Self {
                action: DecisionAction::Link,
                linked_entity_id: Some(top.entity_id),
            },
            None => Self {
                action: DecisionAction::Create,
                linked_entity_id: None,
            },
        }
    }
}

/// Sequential, single-operator resolution session
#[derive(Debug, Clone)]
pub struct ResolutionSession {
    pub session_id: Uuid,
    pub studio_id: Uuid,
    pub submission_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    candidates: Vec<Candidate>,
    decisions: Vec<Option<(DecisionAction, Option<Uuid>)>>,
    cursor: usize,
}

impl ResolutionSession {
    /// Create a session over an ordered, already-validated candidate list
    pub fn new(
        studio_id: Uuid,
        submission_id: Option<Uuid>,
        project_id: Option<Uuid>,
        candidates: Vec<Candidate>,
    ) -> Self {
        let decisions = vec![None; candidates.len()];
        Self {
            session_id: Uuid::new_v4(),
            studio_id,
            submission_id,
            project_id,
            candidates,
            decisions,
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The candidate under review, with its position
    ///
    /// None once the cursor has advanced past the last candidate.
    pub fn current(&self) -> Option<(usize, &Candidate)> {
        self.candidates
            .get(self.cursor)
            .map(|candidate| (self.cursor, candidate))
    }

    /// Decision previously recorded at a position (for re-display after back())
    pub fn decision_at(&self, index: usize) -> Option<(DecisionAction, Option<Uuid>)> {
        self.decisions.get(index).copied().flatten()
    }

    /// Record a decision for the current candidate and advance
    ///
    /// Enforces the decision invariant: Link requires a target id, Create
    /// forbids one. Re-deciding after back() overwrites the prior decision;
    /// no side effects occur either way until completion.
    pub fn decide(&mut self, action: DecisionAction, linked_entity_id: Option<Uuid>) -> Result<()> {
        if self.cursor >= self.candidates.len() {
            return Err(Error::InvalidInput(
                "No current candidate: session already fully decided".to_string(),
            ));
        }

        match (action, linked_entity_id) {
            (DecisionAction::Link, None) => {
                return Err(Error::InvalidInput(
                    "Link decision requires a linked entity id".to_string(),
                ));
            }
            (DecisionAction::Create, Some(_)) => {
                return Err(Error::InvalidInput(
                    "Create decision must not carry a linked entity id".to_string(),
                ));
            }
            _ => {}
        }

        self.decisions[self.cursor] = Some((action, linked_entity_id));

        // Advance to the next undecided candidate; after backward navigation
        // this skips over positions that were already decided.
        self.cursor += 1;
        while self.cursor < self.candidates.len() && self.decisions[self.cursor].is_some() {
            self.cursor += 1;
        }

        Ok(())
    }

    /// Step back to the previous candidate for review
    ///
    /// Re-display only: no recorded decision is cleared and nothing is
    /// re-triggered.
    pub fn back(&mut self) -> Result<()> {
        if self.cursor == 0 {
            return Err(Error::InvalidInput(
                "Already at the first candidate".to_string(),
            ));
        }
        self.cursor -= 1;
        Ok(())
    }

    pub fn decided_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_some()).count()
    }

    /// Every candidate has a recorded decision
    pub fn is_complete(&self) -> bool {
        self.decisions.iter().all(|d| d.is_some())
    }

    /// Terminal action: emit the full ordered decision list
    ///
    /// Errors unless every candidate is decided. Consumes the session; the
    /// decision list is handed to the committer (queued or direct mode).
    pub fn complete(self) -> Result<Vec<ResolutionDecision>> {
        if !self.is_complete() {
            return Err(Error::InvalidInput(format!(
                "Session incomplete: {} of {} candidates decided",
                self.decided_count(),
                self.candidates.len()
            )));
        }

        Ok(self
            .candidates
            .into_iter()
            .zip(self.decisions)
            .map(|(candidate, decision)| {
                // is_complete() checked above
                let (action, linked) = decision.expect("decision present");
                match action {
                    DecisionAction::Create => ResolutionDecision::create(candidate),
                    DecisionAction::Link => {
                        ResolutionDecision::link(candidate, linked.expect("link target present"))
                    }
                }
            })
            .collect())
    }
}
