//! # exam-workflow
//!
//! The submission workflow around the resolution engine:
//! - [`filename`] — parse and validate `REGISTERNO_SUBJECTCODE.ext` uploads
//! - [`intake`] — accept a staff upload, store the blob, create the artifact
//! - [`submit`] — push a paper into Moodle on the student's behalf and walk
//!   the artifact through its status state machine
//!
//! The resolution engine does the hard part (which assignment?); this crate
//! is the glue that moves an artifact from `pending_review` to
//! `submitted_to_lms`.

pub mod error;
pub mod filename;
pub mod intake;
pub mod submit;

pub use error::WorkflowError;
pub use filename::{ParsedUpload, parse_filename, sanitize_filename, validate_upload};
pub use intake::register_upload;
pub use submit::{SubmissionReceipt, SubmissionService};
