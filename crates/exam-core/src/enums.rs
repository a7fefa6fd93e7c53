//! Source tags and workflow status enums for examflow.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! `WorkflowStatus` carries a state machine; `allowed_next_states()` is enforced
//! at the persistence layer so no caller can skip a transition.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// ResolutionSource
// ---------------------------------------------------------------------------

/// Provenance of a resolved subject→assignment mapping.
///
/// Attached to every [`crate::ResolvedAssignment`] so callers (and the
/// persistent store) know which fallback layer produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Cache,
    Database,
    MoodleDiscovery,
    Config,
}

impl ResolutionSource {
    /// Return the string representation used in SQL storage and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Database => "database",
            Self::MoodleDiscovery => "moodle_discovery",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache" => Ok(Self::Cache),
            "database" => Ok(Self::Database),
            "moodle_discovery" => Ok(Self::MoodleDiscovery),
            "config" => Ok(Self::Config),
            other => Err(format!("unknown resolution source: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowStatus
// ---------------------------------------------------------------------------

/// Status of an examination artifact through the submission workflow.
///
/// ```text
/// pending → pending_review → ready_for_review → submitted_to_lms → completed
///                          ↘ submitted_to_lms
/// failed ← (pending | pending_review | ready_for_review | submitted_to_lms)
/// failed → pending_review (re-queue after operator fix)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    PendingReview,
    ReadyForReview,
    SubmittedToLms,
    Completed,
    Failed,
}

impl WorkflowStatus {
    /// Valid next states from the current state.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::PendingReview, Self::Failed],
            Self::PendingReview => &[Self::ReadyForReview, Self::SubmittedToLms, Self::Failed],
            Self::ReadyForReview => &[Self::SubmittedToLms, Self::Failed],
            Self::SubmittedToLms => &[Self::Completed, Self::Failed],
            Self::Completed => &[],
            Self::Failed => &[Self::PendingReview],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingReview => "pending_review",
            Self::ReadyForReview => "ready_for_review",
            Self::SubmittedToLms => "submitted_to_lms",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "pending_review" => Ok(Self::PendingReview),
            "ready_for_review" => Ok(Self::ReadyForReview),
            "submitted_to_lms" => Ok(Self::SubmittedToLms),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown workflow status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn source_roundtrips_through_str() {
        for source in [
            ResolutionSource::Cache,
            ResolutionSource::Database,
            ResolutionSource::MoodleDiscovery,
            ResolutionSource::Config,
        ] {
            assert_eq!(source.as_str().parse::<ResolutionSource>(), Ok(source));
        }
    }

    #[test]
    fn source_serializes_snake_case() {
        let json = serde_json::to_string(&ResolutionSource::MoodleDiscovery).unwrap();
        assert_eq!(json, "\"moodle_discovery\"");
    }

    #[test]
    fn submission_path_is_allowed() {
        assert!(WorkflowStatus::Pending.can_transition_to(WorkflowStatus::PendingReview));
        assert!(WorkflowStatus::PendingReview.can_transition_to(WorkflowStatus::SubmittedToLms));
        assert!(WorkflowStatus::ReadyForReview.can_transition_to(WorkflowStatus::SubmittedToLms));
        assert!(WorkflowStatus::SubmittedToLms.can_transition_to(WorkflowStatus::Completed));
    }

    #[test]
    fn skipping_submission_is_rejected() {
        assert!(!WorkflowStatus::PendingReview.can_transition_to(WorkflowStatus::Completed));
        assert!(!WorkflowStatus::Pending.can_transition_to(WorkflowStatus::SubmittedToLms));
        assert!(WorkflowStatus::Completed.allowed_next_states().is_empty());
    }

    #[test]
    fn failed_can_be_requeued() {
        assert!(WorkflowStatus::Failed.can_transition_to(WorkflowStatus::PendingReview));
        assert!(!WorkflowStatus::Failed.can_transition_to(WorkflowStatus::SubmittedToLms));
    }

    #[test]
    fn status_roundtrips_through_str() {
        for status in [
            WorkflowStatus::Pending,
            WorkflowStatus::PendingReview,
            WorkflowStatus::ReadyForReview,
            WorkflowStatus::SubmittedToLms,
            WorkflowStatus::Completed,
            WorkflowStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<WorkflowStatus>(), Ok(status));
        }
    }
}
