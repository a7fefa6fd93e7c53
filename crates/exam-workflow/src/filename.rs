//! Upload filename parsing and validation.
//!
//! Staff scanners name papers `REGISTERNO_SUBJECTCODE.ext` — a 12-digit
//! register number, an underscore, the subject code, and an image/PDF
//! extension. Scanner software is sloppy about case and stray spaces, so
//! parsing tolerates both; everything else is rejected before a byte is
//! stored.

use exam_config::UploadConfig;
use exam_core::normalize_subject_code;

use crate::error::WorkflowError;

/// Expected register number length.
const REGISTER_NUMBER_LEN: usize = 12;

/// Subject code length bounds after normalization.
const SUBJECT_CODE_LEN: std::ops::RangeInclusive<usize> = 4..=12;

/// Parsed components of an upload filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUpload {
    /// 12-digit student register number.
    pub register_number: String,
    /// Normalized subject code.
    pub subject_code: String,
    /// Lower-cased extension with leading dot (e.g., `.pdf`).
    pub extension: String,
}

/// Parse `REGISTERNO_SUBJECTCODE.ext` into its components.
///
/// # Errors
///
/// Returns [`WorkflowError::InvalidFilename`] when the shape, register
/// number, or subject code is malformed.
pub fn parse_filename(raw: &str) -> Result<ParsedUpload, WorkflowError> {
    let name = basename(raw);

    let (stem, extension) = name
        .rsplit_once('.')
        .ok_or_else(|| WorkflowError::InvalidFilename(format!("{raw}: missing extension")))?;

    let (register, code) = stem
        .split_once('_')
        .ok_or_else(|| WorkflowError::InvalidFilename(format!("{raw}: missing underscore")))?;

    let register = register.trim();
    if register.len() != REGISTER_NUMBER_LEN || !register.chars().all(|c| c.is_ascii_digit()) {
        return Err(WorkflowError::InvalidFilename(format!(
            "{raw}: register number must be {REGISTER_NUMBER_LEN} digits"
        )));
    }

    let subject_code = normalize_subject_code(code);
    if !SUBJECT_CODE_LEN.contains(&subject_code.len())
        || !subject_code.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(WorkflowError::InvalidFilename(format!(
            "{raw}: malformed subject code"
        )));
    }

    Ok(ParsedUpload {
        register_number: register.to_string(),
        subject_code,
        extension: format!(".{}", extension.trim().to_lowercase()),
    })
}

/// Validate a parsed upload against the configured limits.
///
/// # Errors
///
/// Returns [`WorkflowError::UnsupportedExtension`] or
/// [`WorkflowError::FileTooLarge`].
pub fn validate_upload(
    config: &UploadConfig,
    parsed: &ParsedUpload,
    size_bytes: u64,
) -> Result<(), WorkflowError> {
    if !config.allows_extension(&parsed.extension) {
        return Err(WorkflowError::UnsupportedExtension(parsed.extension.clone()));
    }
    if size_bytes > config.max_size_bytes {
        return Err(WorkflowError::FileTooLarge {
            size: size_bytes,
            max: config.max_size_bytes,
        });
    }
    Ok(())
}

/// Strip path components and control characters from a client-supplied name.
///
/// Uploads arrive from browsers and scanner software; the stored name must
/// never be able to traverse out of the blob directory.
#[must_use]
pub fn sanitize_filename(raw: &str) -> String {
    basename(raw)
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Last path segment of a possibly path-qualified name.
fn basename(raw: &str) -> &str {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw)
}
