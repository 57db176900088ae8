//! Human-in-the-loop resolution sessions

pub mod resolution;

pub use resolution::{ResolutionSession, SuggestedAction};
