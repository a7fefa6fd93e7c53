//! Moodle client error types.

use thiserror::Error;

/// Errors that can occur when talking to the Moodle web-service API.
#[derive(Debug, Error)]
pub enum MoodleError {
    /// HTTP transport error (timeout, connection reset, refused).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Moodle reported an error — invalid token, unknown function, access
    /// denied. These arrive inside HTTP-200 bodies as exception payloads and
    /// retrying them cannot help.
    #[error("Moodle API error ({code}): {message}")]
    Api {
        /// Moodle error code (e.g., `invalidtoken`) or HTTP status.
        code: String,
        /// Human-readable message from the response.
        message: String,
    },

    /// Failed to parse a Moodle response body.
    #[error("parse error: {0}")]
    Parse(String),
}

impl MoodleError {
    /// Whether retrying the call may succeed.
    ///
    /// Only transport failures qualify; API errors and malformed bodies
    /// reproduce deterministically.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}
