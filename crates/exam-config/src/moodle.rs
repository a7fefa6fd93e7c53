//! Moodle web-service configuration.

use serde::{Deserialize, Serialize};

/// Default HTTP request timeout in seconds.
const fn default_timeout_secs() -> u64 {
    30
}

/// Default web-service name used when exchanging credentials for a token.
fn default_service() -> String {
    "moodle_mobile_app".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MoodleConfig {
    /// Base URL of the Moodle instance (e.g., `https://lms.example.edu`).
    #[serde(default)]
    pub base_url: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Web-service short name passed to `login/token.php`.
    #[serde(default = "default_service")]
    pub service: String,
}

impl Default for MoodleConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_timeout_secs(),
            service: default_service(),
        }
    }
}

impl MoodleConfig {
    /// Check if the Moodle config has the minimum required fields.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_configured() {
        let config = MoodleConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.service, "moodle_mobile_app");
    }

    #[test]
    fn configured_when_base_url_set() {
        let config = MoodleConfig {
            base_url: "https://lms.example.edu".into(),
            ..Default::default()
        };
        assert!(config.is_configured());
    }
}
