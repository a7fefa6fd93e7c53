//! Static subject→assignment fallback table.
//!
//! The last resort of the resolution chain: a fixed mapping maintained by
//! operators for subjects that can't be discovered (e.g., the Moodle course
//! metadata never mentions the subject code). Keys are normalized on lookup,
//! so the TOML table and `EXAMFLOW_SUBJECTS__FALLBACK__*` env entries can be
//! written in any case.

use std::collections::HashMap;

use exam_core::normalize_subject_code;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubjectsConfig {
    /// subject code → Moodle assignment id.
    #[serde(default)]
    pub fallback: HashMap<String, i64>,
}

impl SubjectsConfig {
    /// Look up a subject code in the fallback table.
    ///
    /// The course id is unknown to static configuration; callers persist
    /// these hits with the `0` sentinel course.
    #[must_use]
    pub fn lookup(&self, subject_code: &str) -> Option<i64> {
        let code = normalize_subject_code(subject_code);
        self.fallback
            .iter()
            .find(|(key, _)| normalize_subject_code(key) == code)
            .map(|(_, id)| *id)
    }

    /// Number of configured fallback entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fallback.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fallback.is_empty()
    }
}
