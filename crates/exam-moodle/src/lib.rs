//! # exam-moodle
//!
//! HTTP client for the Moodle web-service REST API.
//!
//! Covers exactly the calls the resolution engine and the submission
//! workflow consume:
//! - credential exchange (`login/token.php`)
//! - identity resolution (`core_webservice_get_site_info`)
//! - course enumeration (`core_enrol_get_users_courses`)
//! - assignment enumeration (`mod_assign_get_assignments`)
//! - draft upload + submission (`upload.php`, `mod_assign_save_submission`,
//!   `mod_assign_submit_for_grading`)
//!
//! Moodle's error convention is unusual: failures arrive as HTTP-200 bodies
//! carrying an exception payload. [`MoodleError`] splits those (non-retryable
//! API errors) from transport failures (retryable via [`retry`]).

mod discovery;
mod error;
mod http;
pub mod retry;
mod submission;

pub use discovery::{Assignment, Course, CourseAssignments, SiteInfo};
pub use error::MoodleError;
pub use retry::{RetryPolicy, retry_transient};

use exam_config::MoodleConfig;
use exam_core::MoodleToken;
use serde::Deserialize;

// ── Types ──────────────────────────────────────────────────────────

/// Response from the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    token: String,
}

impl TokenResponse {
    /// Wrap the raw token into the credential newtype.
    #[must_use]
    pub fn into_token(self) -> MoodleToken {
        MoodleToken::new(self.token)
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// HTTP client for one Moodle instance.
pub struct MoodleClient {
    http: reqwest::Client,
    base_url: String,
    service: String,
}

impl MoodleClient {
    /// Create a client from configuration.
    ///
    /// # Panics
    ///
    /// Panics if the underlying `reqwest::Client` fails to build.
    #[must_use]
    pub fn new(config: &MoodleConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent("examflow/0.1")
                .timeout(std::time::Duration::from_secs(config.timeout_secs))
                .build()
                .expect("reqwest client should build"),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service: config.service.clone(),
        }
    }

    /// The configured Moodle base URL (no trailing slash).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange a username/password for a web-service token.
    ///
    /// # Errors
    ///
    /// Returns [`MoodleError::Api`] for rejected credentials,
    /// [`MoodleError::Http`] for transport failures.
    pub async fn get_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, MoodleError> {
        let url = format!("{}/login/token.php", self.base_url);
        let form = [
            ("username", username),
            ("password", password),
            ("service", self.service.as_str()),
        ];
        let resp = self.http.post(&url).form(&form).send().await?;
        let payload = http::read_payload(resp).await?;
        serde_json::from_value(payload).map_err(|e| MoodleError::Parse(e.to_string()))
    }

    /// Invoke a web-service function and return the checked JSON payload.
    pub(crate) async fn ws_call(
        &self,
        token: &MoodleToken,
        function: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value, MoodleError> {
        let url = format!("{}/webservice/rest/server.php", self.base_url);
        let mut form: Vec<(String, String)> = vec![
            ("wstoken".to_string(), token.as_str().to_string()),
            ("wsfunction".to_string(), function.to_string()),
            ("moodlewsrestformat".to_string(), "json".to_string()),
        ];
        form.extend_from_slice(params);

        tracing::debug!(function, "moodle web-service call");
        let resp = self.http.post(&url).form(&form).send().await?;
        http::read_payload(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = MoodleClient::new(&MoodleConfig {
            base_url: "https://lms.example.edu/".into(),
            ..Default::default()
        });
        assert_eq!(client.base_url(), "https://lms.example.edu");
    }

    #[test]
    fn token_response_parses_and_wraps() {
        let resp: TokenResponse = serde_json::from_str(r#"{"token": "abc123"}"#).unwrap();
        assert_eq!(resp.into_token().as_str(), "abc123");
    }

    #[tokio::test]
    #[ignore] // requires a live Moodle instance
    async fn live_token_exchange() {
        let config = MoodleConfig {
            base_url: std::env::var("EXAMFLOW_MOODLE__BASE_URL").unwrap_or_default(),
            ..Default::default()
        };
        let client = MoodleClient::new(&config);
        let result = client.get_token("student", "password").await;
        println!("token exchange: {result:?}");
    }
}
