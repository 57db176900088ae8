//! Domain models for the ingestion pipeline

pub mod candidate;
pub mod decision;
pub mod pending;
pub mod submission;

pub use candidate::{partition_valid, Candidate, CandidateBatch, EntityKind};
pub use decision::{DecisionAction, ResolutionDecision};
pub use pending::{PendingEntity, PendingStatus};
pub use submission::{Submission, SubmissionState, SubmissionTransition};
