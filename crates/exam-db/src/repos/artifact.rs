//! Examination-artifact repository.
//!
//! An artifact is one scanned paper moving through the submission workflow.
//! Status changes go through [`ExamDb::update_artifact_status`], which
//! enforces the `WorkflowStatus` state machine so no caller can skip a
//! transition.

use chrono::{DateTime, Utc};
use serde::Serialize;

use exam_core::{CoreError, WorkflowStatus, normalize_subject_code};

use crate::ExamDb;
use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_datetime, parse_enum, parse_optional_datetime};

/// A persisted examination artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExaminationArtifact {
    pub id: i64,
    pub artifact_uid: String,
    pub raw_filename: String,
    pub sanitized_filename: String,
    pub register_number: String,
    pub subject_code: String,
    pub file_extension: String,
    pub file_size_bytes: i64,
    pub file_sha256: String,
    pub blob_path: String,
    pub workflow_status: WorkflowStatus,
    pub moodle_assignment_id: Option<i64>,
    pub failure_reason: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Input for [`ExamDb::create_artifact`].
#[derive(Debug, Clone)]
pub struct NewArtifact {
    pub raw_filename: String,
    pub sanitized_filename: String,
    pub register_number: String,
    pub subject_code: String,
    pub file_extension: String,
    pub file_size_bytes: i64,
    pub file_sha256: String,
    pub blob_path: String,
}

fn row_to_artifact(row: &libsql::Row) -> Result<ExaminationArtifact, DatabaseError> {
    Ok(ExaminationArtifact {
        id: row.get::<i64>(0)?,
        artifact_uid: row.get::<String>(1)?,
        raw_filename: row.get::<String>(2)?,
        sanitized_filename: row.get::<String>(3)?,
        register_number: row.get::<String>(4)?,
        subject_code: row.get::<String>(5)?,
        file_extension: row.get::<String>(6)?,
        file_size_bytes: row.get::<i64>(7)?,
        file_sha256: row.get::<String>(8)?,
        blob_path: row.get::<String>(9)?,
        workflow_status: parse_enum(&row.get::<String>(10)?)?,
        moodle_assignment_id: row.get::<Option<i64>>(11)?,
        failure_reason: get_opt_string(row, 12)?,
        uploaded_at: parse_datetime(&row.get::<String>(13)?)?,
        submitted_at: parse_optional_datetime(row.get::<Option<String>>(14)?.as_deref())?,
    })
}

const ARTIFACT_COLUMNS: &str = "id, artifact_uid, raw_filename, sanitized_filename, \
     register_number, subject_code, file_extension, file_size_bytes, file_sha256, \
     blob_path, workflow_status, moodle_assignment_id, failure_reason, uploaded_at, \
     submitted_at";

impl ExamDb {
    /// Persist a freshly validated upload. Enters the workflow as
    /// `pending_review` (staff has uploaded; the student has not acted yet).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the insert fails.
    pub async fn create_artifact(
        &self,
        artifact: &NewArtifact,
    ) -> Result<ExaminationArtifact, DatabaseError> {
        let uid = self.generate_id("art").await?;
        let now = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO exam_artifact
                 (artifact_uid, raw_filename, sanitized_filename, register_number,
                  subject_code, file_extension, file_size_bytes, file_sha256,
                  blob_path, workflow_status, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                libsql::params![
                    uid.as_str(),
                    artifact.raw_filename.as_str(),
                    artifact.sanitized_filename.as_str(),
                    artifact.register_number.as_str(),
                    normalize_subject_code(&artifact.subject_code),
                    artifact.file_extension.as_str(),
                    artifact.file_size_bytes,
                    artifact.file_sha256.as_str(),
                    artifact.blob_path.as_str(),
                    WorkflowStatus::PendingReview.as_str(),
                    now.as_str()
                ],
            )
            .await?;

        tracing::info!(artifact_uid = %uid, register_number = %artifact.register_number, "artifact created");

        self.get_artifact_by_uid(&uid)
            .await?
            .ok_or(DatabaseError::NoResult)
    }

    /// Fetch an artifact by its public uid.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_artifact_by_uid(
        &self,
        artifact_uid: &str,
    ) -> Result<Option<ExaminationArtifact>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {ARTIFACT_COLUMNS} FROM exam_artifact WHERE artifact_uid = ?1"),
                [artifact_uid],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_artifact(&row)?)),
            None => Ok(None),
        }
    }

    /// List a student's artifacts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_artifacts_for_register(
        &self,
        register_number: &str,
    ) -> Result<Vec<ExaminationArtifact>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {ARTIFACT_COLUMNS} FROM exam_artifact
                     WHERE register_number = ?1 ORDER BY uploaded_at DESC, id DESC"
                ),
                [register_number],
            )
            .await?;
        let mut artifacts = Vec::new();
        while let Some(row) = rows.next().await? {
            artifacts.push(row_to_artifact(&row)?);
        }
        Ok(artifacts)
    }

    /// Advance an artifact's workflow status.
    ///
    /// Validates the transition against `WorkflowStatus::allowed_next_states`,
    /// records `failure_reason` (cleared on non-failure transitions), and
    /// stamps `submitted_at` when entering `submitted_to_lms`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` (wrapped) when the state machine
    /// forbids the move, `DatabaseError::NoResult` for an unknown uid.
    pub async fn update_artifact_status(
        &self,
        artifact_uid: &str,
        next: WorkflowStatus,
        failure_reason: Option<&str>,
    ) -> Result<ExaminationArtifact, DatabaseError> {
        let current = self
            .get_artifact_by_uid(artifact_uid)
            .await?
            .ok_or(DatabaseError::NoResult)?;

        if !current.workflow_status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                entity_type: "artifact".to_string(),
                id: artifact_uid.to_string(),
                from: current.workflow_status.to_string(),
                to: next.to_string(),
            }
            .into());
        }

        let submitted_at = if next == WorkflowStatus::SubmittedToLms {
            Some(Utc::now().to_rfc3339())
        } else {
            current.submitted_at.map(|t| t.to_rfc3339())
        };

        self.conn()
            .execute(
                "UPDATE exam_artifact
                 SET workflow_status = ?2, failure_reason = ?3, submitted_at = ?4
                 WHERE artifact_uid = ?1",
                libsql::params![
                    artifact_uid,
                    next.as_str(),
                    failure_reason,
                    submitted_at.as_deref()
                ],
            )
            .await?;

        tracing::debug!(artifact_uid, from = %current.workflow_status, to = %next, "artifact transitioned");

        self.get_artifact_by_uid(artifact_uid)
            .await?
            .ok_or(DatabaseError::NoResult)
    }

    /// Record which Moodle assignment an artifact resolved to.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the update fails.
    pub async fn assign_artifact(
        &self,
        artifact_uid: &str,
        moodle_assignment_id: i64,
    ) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "UPDATE exam_artifact SET moodle_assignment_id = ?2 WHERE artifact_uid = ?1",
                libsql::params![artifact_uid, moodle_assignment_id],
            )
            .await?;
        Ok(())
    }

    /// Artifact counts per workflow status (admin statistics).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn artifact_status_counts(
        &self,
    ) -> Result<Vec<(WorkflowStatus, i64)>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT workflow_status, COUNT(*) FROM exam_artifact
                 GROUP BY workflow_status ORDER BY workflow_status",
                (),
            )
            .await?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next().await? {
            counts.push((parse_enum(&row.get::<String>(0)?)?, row.get::<i64>(1)?));
        }
        Ok(counts)
    }
}
