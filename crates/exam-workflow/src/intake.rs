//! Staff upload intake: validate, store the blob, create the artifact.

use std::path::Path;

use sha2::{Digest, Sha256};

use exam_config::UploadConfig;
use exam_db::ExamDb;
use exam_db::repos::{ExaminationArtifact, NewArtifact};

use crate::error::WorkflowError;
use crate::filename::{parse_filename, sanitize_filename, validate_upload};

/// Accept one uploaded paper: parse and validate the filename, write the
/// bytes under `blob_dir`, and create the artifact row in `pending_review`.
///
/// The blob lands under the sanitized name, so the stored path can never
/// traverse out of the directory.
///
/// # Errors
///
/// Returns [`WorkflowError`] for malformed names, disallowed
/// extension/size, blob write failures, or persistence failures.
pub async fn register_upload(
    db: &ExamDb,
    config: &UploadConfig,
    raw_filename: &str,
    bytes: &[u8],
    blob_dir: &Path,
) -> Result<ExaminationArtifact, WorkflowError> {
    let parsed = parse_filename(raw_filename)?;
    validate_upload(config, &parsed, bytes.len() as u64)?;

    let sanitized = sanitize_filename(raw_filename);
    let file_sha256 = format!("{:x}", Sha256::digest(bytes));

    tokio::fs::create_dir_all(blob_dir).await?;
    let blob_path = blob_dir.join(&sanitized);
    tokio::fs::write(&blob_path, bytes).await?;

    let artifact = db
        .create_artifact(&NewArtifact {
            raw_filename: raw_filename.to_string(),
            sanitized_filename: sanitized,
            register_number: parsed.register_number,
            subject_code: parsed.subject_code,
            file_extension: parsed.extension,
            file_size_bytes: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
            file_sha256,
            blob_path: blob_path.to_string_lossy().into_owned(),
        })
        .await?;

    tracing::info!(
        artifact_uid = %artifact.artifact_uid,
        subject_code = %artifact.subject_code,
        size = bytes.len(),
        "upload registered"
    );
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::WorkflowStatus;
    use pretty_assertions::assert_eq;

    async fn test_db() -> ExamDb {
        ExamDb::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn valid_upload_creates_pending_artifact_and_blob() {
        let db = test_db().await;
        let dir = tempfile::tempdir().unwrap();
        let bytes = b"%PDF-1.4 fake scan";

        let artifact = register_upload(
            &db,
            &UploadConfig::default(),
            "123456789012_19ai405.pdf",
            bytes,
            dir.path(),
        )
        .await
        .unwrap();

        assert_eq!(artifact.workflow_status, WorkflowStatus::PendingReview);
        assert_eq!(artifact.subject_code, "19AI405");
        assert_eq!(artifact.file_size_bytes, bytes.len() as i64);
        assert_eq!(artifact.file_sha256.len(), 64);

        let stored = tokio::fs::read(&artifact.blob_path).await.unwrap();
        assert_eq!(stored, bytes);
    }

    #[tokio::test]
    async fn oversize_upload_is_rejected_before_storage() {
        let db = test_db().await;
        let dir = tempfile::tempdir().unwrap();
        let config = UploadConfig {
            max_size_bytes: 4,
            ..Default::default()
        };

        let err = register_upload(&db, &config, "123456789012_19AI405.pdf", b"too big", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::FileTooLarge { .. }));

        // Nothing persisted, nothing written.
        assert!(db.list_artifacts_for_register("123456789012").await.unwrap().is_empty());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn disallowed_extension_is_rejected() {
        let db = test_db().await;
        let dir = tempfile::tempdir().unwrap();

        let err = register_upload(
            &db,
            &UploadConfig::default(),
            "123456789012_19AI405.exe",
            b"MZ",
            dir.path(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WorkflowError::UnsupportedExtension(_)));
    }

    #[tokio::test]
    async fn path_traversal_lands_inside_blob_dir() {
        let db = test_db().await;
        let dir = tempfile::tempdir().unwrap();

        let artifact = register_upload(
            &db,
            &UploadConfig::default(),
            "../../123456789012_19AI405.pdf",
            b"scan",
            dir.path(),
        )
        .await
        .unwrap();

        let blob = std::path::Path::new(&artifact.blob_path);
        assert!(blob.starts_with(dir.path()));
        assert_eq!(
            blob.file_name().unwrap().to_str().unwrap(),
            "123456789012_19AI405.pdf"
        );
    }
}
