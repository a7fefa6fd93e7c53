//! Workflow error types.

use exam_core::WorkflowStatus;
use thiserror::Error;

/// Errors from upload intake and submission.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Upload filename does not follow `REGISTERNO_SUBJECTCODE.ext`.
    #[error("invalid upload filename: {0}")]
    InvalidFilename(String),

    /// File extension is not on the allow-list.
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),

    /// File exceeds the configured size cap.
    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },

    /// No artifact with the given uid.
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    /// The artifact is not in a submittable state.
    #[error("artifact is not submittable from status {status}")]
    NotSubmittable { status: WorkflowStatus },

    /// No layer of the resolution chain could map the subject code.
    #[error("no assignment mapping for subject {0}")]
    UnmappedSubject(String),

    /// Resolution engine failure (cache/store layer).
    #[error(transparent)]
    Resolve(#[from] exam_resolve::ResolveError),

    /// Persistence failure.
    #[error(transparent)]
    Database(#[from] exam_db::error::DatabaseError),

    /// Moodle rejected or failed a submission call.
    #[error("Moodle submission failed: {0}")]
    Moodle(#[from] exam_moodle::MoodleError),

    /// Blob read/write failure.
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}
