//! Approval queue and batch committer

pub mod approval;
pub mod committer;

pub use approval::{approve, approve_all, list, reject, ApprovalOutcome, BulkApprovalOutcome};
pub use committer::{commit_decisions, CommitMode, CommitOutcome};
