//! Subject-mapping repository — the durable layer of the resolution chain.
//!
//! Rows are keyed on the normalized subject code and soft-deactivated via
//! `is_active`; the unique constraint guarantees at most one row (and thus at
//! most one active row) per code. `upsert_mapping` is the single write path
//! for discovered mappings, so concurrent discovery of the same code resolves
//! by last-write-wins.

use chrono::{DateTime, Utc};
use serde::Serialize;

use exam_core::{ResolutionSource, ResolvedAssignment, normalize_subject_code};

use crate::ExamDb;
use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime};

/// A persisted subject→assignment mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectMapping {
    pub id: i64,
    pub subject_code: String,
    pub moodle_course_id: i64,
    pub moodle_assignment_id: i64,
    pub moodle_assignment_name: Option<String>,
    pub is_active: bool,
    /// Source tag of the last writer (`moodle_discovery`, `config`, ...).
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub last_verified_at: DateTime<Utc>,
}

impl SubjectMapping {
    /// View this row as the engine's resolved value, tagged `database`.
    #[must_use]
    pub fn to_resolved(&self) -> ResolvedAssignment {
        ResolvedAssignment {
            assignment_id: self.moodle_assignment_id,
            course_id: self.moodle_course_id,
            assignment_name: self.moodle_assignment_name.clone(),
            source: ResolutionSource::Database,
        }
    }
}

/// Input for [`ExamDb::upsert_mapping`].
#[derive(Debug, Clone)]
pub struct NewMapping {
    pub subject_code: String,
    pub course_id: i64,
    pub assignment_id: i64,
    pub assignment_name: Option<String>,
    pub source: ResolutionSource,
}

fn row_to_mapping(row: &libsql::Row) -> Result<SubjectMapping, DatabaseError> {
    Ok(SubjectMapping {
        id: row.get::<i64>(0)?,
        subject_code: row.get::<String>(1)?,
        moodle_course_id: row.get::<i64>(2)?,
        moodle_assignment_id: row.get::<i64>(3)?,
        moodle_assignment_name: get_opt_string(row, 4)?,
        is_active: row.get::<i64>(5)? != 0,
        source: row.get::<String>(6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        last_verified_at: parse_datetime(&row.get::<String>(8)?)?,
    })
}

const MAPPING_COLUMNS: &str = "id, subject_code, moodle_course_id, moodle_assignment_id, \
     moodle_assignment_name, is_active, source, created_at, last_verified_at";

impl ExamDb {
    /// Find the active mapping for a subject code, if any.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_active_mapping(
        &self,
        subject_code: &str,
    ) -> Result<Option<SubjectMapping>, DatabaseError> {
        let code = normalize_subject_code(subject_code);
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {MAPPING_COLUMNS} FROM subject_mapping
                     WHERE subject_code = ?1 AND is_active = 1"
                ),
                [code],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_mapping(&row)?)),
            None => Ok(None),
        }
    }

    /// Insert or update the mapping for a subject code.
    ///
    /// Update-in-place keyed on the code: ids, name, and source are
    /// overwritten, `last_verified_at` is refreshed, and the row is forced
    /// active (rediscovery revives a soft-deactivated mapping).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the write fails or the row cannot be read
    /// back.
    pub async fn upsert_mapping(
        &self,
        mapping: &NewMapping,
    ) -> Result<SubjectMapping, DatabaseError> {
        let code = normalize_subject_code(&mapping.subject_code);
        let now = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO subject_mapping
                 (subject_code, moodle_course_id, moodle_assignment_id,
                  moodle_assignment_name, is_active, source, created_at, last_verified_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?6)
                 ON CONFLICT(subject_code) DO UPDATE SET
                     moodle_course_id = excluded.moodle_course_id,
                     moodle_assignment_id = excluded.moodle_assignment_id,
                     moodle_assignment_name = excluded.moodle_assignment_name,
                     is_active = 1,
                     source = excluded.source,
                     last_verified_at = excluded.last_verified_at",
                libsql::params![
                    code.as_str(),
                    mapping.course_id,
                    mapping.assignment_id,
                    mapping.assignment_name.as_deref(),
                    mapping.source.as_str(),
                    now.as_str()
                ],
            )
            .await?;

        tracing::debug!(subject_code = %code, source = %mapping.source, "mapping upserted");

        self.find_active_mapping(&code)
            .await?
            .ok_or(DatabaseError::NoResult)
    }

    /// List every active mapping, ordered by subject code.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_active_mappings(&self) -> Result<Vec<SubjectMapping>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {MAPPING_COLUMNS} FROM subject_mapping
                     WHERE is_active = 1 ORDER BY subject_code"
                ),
                (),
            )
            .await?;
        let mut mappings = Vec::new();
        while let Some(row) = rows.next().await? {
            mappings.push(row_to_mapping(&row)?);
        }
        Ok(mappings)
    }

    /// Bump `last_verified_at` without touching the ids.
    ///
    /// Used by refresh when rediscovery confirmed the stored assignment.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the update fails.
    pub async fn touch_mapping_verified(&self, subject_code: &str) -> Result<(), DatabaseError> {
        let code = normalize_subject_code(subject_code);
        self.conn()
            .execute(
                "UPDATE subject_mapping SET last_verified_at = ?2
                 WHERE subject_code = ?1 AND is_active = 1",
                libsql::params![code.as_str(), Utc::now().to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    /// Soft-deactivate a mapping. Returns `true` if an active row was found.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the update fails.
    pub async fn deactivate_mapping(&self, subject_code: &str) -> Result<bool, DatabaseError> {
        let code = normalize_subject_code(subject_code);
        let affected = self
            .conn()
            .execute(
                "UPDATE subject_mapping SET is_active = 0
                 WHERE subject_code = ?1 AND is_active = 1",
                [code],
            )
            .await?;
        Ok(affected > 0)
    }
}
