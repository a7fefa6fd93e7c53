use serde::{Deserialize, Serialize};

use crate::enums::ResolutionSource;

/// A resolved subject→assignment mapping.
///
/// Produced by the resolution engine, cached verbatim (including the source
/// tag of the layer that produced it), and consumed by the submission
/// workflow and admin tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAssignment {
    /// Moodle assignment instance id — the submission target.
    pub assignment_id: i64,
    /// Moodle course id. `0` when the mapping came from static configuration
    /// and the course is unknown.
    pub course_id: i64,
    /// Assignment display name, when the producing layer knows it.
    pub assignment_name: Option<String>,
    /// Which fallback layer produced this value.
    pub source: ResolutionSource,
}

impl ResolvedAssignment {
    /// Re-tag this value with a different source, keeping the ids.
    #[must_use]
    pub fn with_source(mut self, source: ResolutionSource) -> Self {
        self.source = source;
        self
    }
}
