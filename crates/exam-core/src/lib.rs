//! # exam-core
//!
//! Core types shared across the examflow crates:
//! - Resolved-assignment value objects produced by the resolution engine
//! - Source tags and the artifact workflow status state machine
//! - The Moodle credential newtype passed between crates
//! - Cross-cutting error types

pub mod credential;
pub mod enums;
pub mod errors;
pub mod resolution;

pub use credential::MoodleToken;
pub use enums::{ResolutionSource, WorkflowStatus};
pub use errors::CoreError;
pub use resolution::ResolvedAssignment;

/// Normalize a subject code for lookup and storage: trimmed, upper-cased.
///
/// Every cache key, database query, and discovery match uses this form, so
/// `"19ai405"`, `" 19AI405 "`, and `"19AI405"` all address the same mapping.
#[must_use]
pub fn normalize_subject_code(code: &str) -> String {
    code.trim().to_uppercase()
}
