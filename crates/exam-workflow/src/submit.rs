//! Student submission pipeline: resolve, upload, submit, advance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use exam_core::{MoodleToken, ResolvedAssignment, WorkflowStatus};
use exam_db::ExamDb;
use exam_db::repos::ExaminationArtifact;
use exam_moodle::{MoodleClient, MoodleError};
use exam_resolve::ResolutionEngine;

use crate::error::WorkflowError;

/// Proof of a completed submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub artifact_uid: String,
    pub assignment_id: i64,
    pub course_id: i64,
    pub submitted_at: DateTime<Utc>,
}

/// Moves an uploaded artifact into Moodle on the student's behalf.
///
/// One `submit` call is the whole student journey: resolve the subject code
/// through the engine (the student's token doubles as the discovery
/// credential), push the blob into their draft area, attach it to the
/// assignment, submit for grading, and advance the artifact to
/// `submitted_to_lms`. Any failure after resolution marks the artifact
/// `failed` with the reason recorded, so operators can re-queue it.
pub struct SubmissionService {
    db: Arc<ExamDb>,
    engine: Arc<ResolutionEngine>,
    client: Arc<MoodleClient>,
}

impl SubmissionService {
    #[must_use]
    pub fn new(db: Arc<ExamDb>, engine: Arc<ResolutionEngine>, client: Arc<MoodleClient>) -> Self {
        Self { db, engine, client }
    }

    /// Submit one artifact to Moodle.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the artifact is unknown or not
    /// submittable, the subject cannot be mapped, or a Moodle call fails.
    pub async fn submit(
        &self,
        artifact_uid: &str,
        token: &MoodleToken,
    ) -> Result<SubmissionReceipt, WorkflowError> {
        let artifact = self
            .db
            .get_artifact_by_uid(artifact_uid)
            .await?
            .ok_or_else(|| WorkflowError::ArtifactNotFound(artifact_uid.to_string()))?;

        if !artifact
            .workflow_status
            .can_transition_to(WorkflowStatus::SubmittedToLms)
        {
            return Err(WorkflowError::NotSubmittable {
                status: artifact.workflow_status,
            });
        }

        let Some(resolved) = self
            .engine
            .resolve(&artifact.subject_code, Some(token))
            .await?
        else {
            let reason = format!("no assignment mapping for {}", artifact.subject_code);
            self.mark_failed(artifact_uid, &reason).await;
            return Err(WorkflowError::UnmappedSubject(artifact.subject_code));
        };
        self.db
            .assign_artifact(artifact_uid, resolved.assignment_id)
            .await?;

        let bytes = match tokio::fs::read(&artifact.blob_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.mark_failed(artifact_uid, &format!("blob unreadable: {e}"))
                    .await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.push_to_moodle(token, &artifact, &resolved, bytes).await {
            self.mark_failed(artifact_uid, &e.to_string()).await;
            return Err(e.into());
        }

        let updated = self
            .db
            .update_artifact_status(artifact_uid, WorkflowStatus::SubmittedToLms, None)
            .await?;

        tracing::info!(
            artifact_uid,
            assignment_id = resolved.assignment_id,
            "paper submitted to Moodle"
        );
        Ok(SubmissionReceipt {
            artifact_uid: updated.artifact_uid,
            assignment_id: resolved.assignment_id,
            course_id: resolved.course_id,
            submitted_at: updated.submitted_at.unwrap_or_else(Utc::now),
        })
    }

    /// The three Moodle calls of a submission, in order.
    async fn push_to_moodle(
        &self,
        token: &MoodleToken,
        artifact: &ExaminationArtifact,
        resolved: &ResolvedAssignment,
        bytes: Vec<u8>,
    ) -> Result<(), MoodleError> {
        let itemid = self
            .client
            .upload_draft_file(token, &artifact.sanitized_filename, bytes)
            .await?;
        self.client
            .save_submission(token, resolved.assignment_id, itemid)
            .await?;
        self.client
            .submit_for_grading(token, resolved.assignment_id)
            .await
    }

    async fn mark_failed(&self, artifact_uid: &str, reason: &str) {
        if let Err(e) = self
            .db
            .update_artifact_status(artifact_uid, WorkflowStatus::Failed, Some(reason))
            .await
        {
            tracing::error!(artifact_uid, error = %e, "could not record artifact failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use exam_cache::TtlCache;
    use exam_config::{MoodleConfig, SubjectsConfig, UploadConfig};
    use exam_resolve::{CacheLayer, ConfigLayer, LookupLayer, ResolveError, StoreLayer};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    struct NeverDiscovers;

    #[async_trait]
    impl LookupLayer for NeverDiscovers {
        fn name(&self) -> &'static str {
            "moodle_discovery"
        }

        async fn try_resolve(
            &self,
            _code: &str,
            _token: Option<&MoodleToken>,
        ) -> Result<Option<exam_core::ResolvedAssignment>, ResolveError> {
            Ok(None)
        }
    }

    /// Engine whose only possible hits come from the store or `subjects`.
    fn offline_engine(db: Arc<ExamDb>, subjects: SubjectsConfig) -> Arc<ResolutionEngine> {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(60)));
        let discovery: Arc<dyn LookupLayer> = Arc::new(NeverDiscovers);
        let layers: Vec<Arc<dyn LookupLayer>> = vec![
            Arc::new(CacheLayer::new(Arc::clone(&cache))),
            Arc::new(StoreLayer::new(Arc::clone(&db))),
            Arc::clone(&discovery),
            Arc::new(ConfigLayer::new(subjects)),
        ];
        Arc::new(ResolutionEngine::with_layers(
            cache,
            db,
            layers,
            discovery,
            Duration::from_secs(60),
        ))
    }

    fn offline_client() -> Arc<MoodleClient> {
        Arc::new(MoodleClient::new(&MoodleConfig {
            base_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        }))
    }

    async fn uploaded_artifact(db: &ExamDb, dir: &std::path::Path) -> String {
        crate::intake::register_upload(
            db,
            &UploadConfig::default(),
            "123456789012_19AI405.pdf",
            b"%PDF-1.4 scan",
            dir,
        )
        .await
        .unwrap()
        .artifact_uid
    }

    #[tokio::test]
    async fn unknown_artifact_is_reported() {
        let db = Arc::new(ExamDb::open_local(":memory:").await.unwrap());
        let service = SubmissionService::new(
            Arc::clone(&db),
            offline_engine(Arc::clone(&db), SubjectsConfig::default()),
            offline_client(),
        );

        let err = service
            .submit("art-missing", &MoodleToken::from("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ArtifactNotFound(_)));
    }

    #[tokio::test]
    async fn unmapped_subject_marks_artifact_failed() {
        let db = Arc::new(ExamDb::open_local(":memory:").await.unwrap());
        let dir = tempfile::tempdir().unwrap();
        let uid = uploaded_artifact(&db, dir.path()).await;

        let service = SubmissionService::new(
            Arc::clone(&db),
            offline_engine(Arc::clone(&db), SubjectsConfig::default()),
            offline_client(),
        );

        let err = service
            .submit(&uid, &MoodleToken::from("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UnmappedSubject(ref code) if code == "19AI405"));

        let artifact = db.get_artifact_by_uid(&uid).await.unwrap().unwrap();
        assert_eq!(artifact.workflow_status, WorkflowStatus::Failed);
        assert!(
            artifact
                .failure_reason
                .as_deref()
                .unwrap()
                .contains("no assignment mapping")
        );
    }

    #[tokio::test]
    async fn already_submitted_artifact_is_not_resubmittable() {
        let db = Arc::new(ExamDb::open_local(":memory:").await.unwrap());
        let dir = tempfile::tempdir().unwrap();
        let uid = uploaded_artifact(&db, dir.path()).await;
        db.update_artifact_status(&uid, WorkflowStatus::SubmittedToLms, None)
            .await
            .unwrap();

        let service = SubmissionService::new(
            Arc::clone(&db),
            offline_engine(Arc::clone(&db), SubjectsConfig::default()),
            offline_client(),
        );

        let err = service
            .submit(&uid, &MoodleToken::from("t"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::NotSubmittable {
                status: WorkflowStatus::SubmittedToLms
            }
        ));
    }

    #[tokio::test]
    async fn moodle_failure_after_resolution_records_reason() {
        let db = Arc::new(ExamDb::open_local(":memory:").await.unwrap());
        let dir = tempfile::tempdir().unwrap();
        let uid = uploaded_artifact(&db, dir.path()).await;

        // Subject resolves via config, but the Moodle instance is unreachable,
        // so the upload call fails and the artifact lands in `failed`.
        let subjects = SubjectsConfig {
            fallback: [("19AI405".to_string(), 42_i64)].into_iter().collect(),
        };
        let service = SubmissionService::new(
            Arc::clone(&db),
            offline_engine(Arc::clone(&db), subjects),
            offline_client(),
        );

        let err = service
            .submit(&uid, &MoodleToken::from("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Moodle(_)));

        let artifact = db.get_artifact_by_uid(&uid).await.unwrap().unwrap();
        assert_eq!(artifact.workflow_status, WorkflowStatus::Failed);
        assert!(artifact.failure_reason.is_some());
        assert_eq!(
            artifact.moodle_assignment_id,
            Some(42),
            "resolution outcome is recorded even when submission fails"
        );
    }
}
