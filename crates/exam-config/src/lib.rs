//! # exam-config
//!
//! Layered configuration loading for examflow using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`EXAMFLOW_*` prefix, `__` as separator)
//! 2. Project-level `.examflow/config.toml`
//! 3. User-level `~/.config/examflow/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `EXAMFLOW_MOODLE__BASE_URL` -> `moodle.base_url`,
//! `EXAMFLOW_DATABASE__PATH` -> `database.path`, etc. The `__` (double
//! underscore) separates nested config sections.
//!
//! # Usage
//!
//! ```no_run
//! use exam_config::ExamConfig;
//!
//! // Load from all sources (dotenvy + TOML + env):
//! let config = ExamConfig::load_with_dotenv().expect("config");
//!
//! if config.moodle.is_configured() {
//!     println!("Moodle URL: {}", config.moodle.base_url);
//! }
//! ```

mod cache;
mod database;
mod error;
mod moodle;
mod subjects;
mod upload;

pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use moodle::MoodleConfig;
pub use subjects::SubjectsConfig;
pub use upload::UploadConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExamConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub moodle: MoodleConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub subjects: SubjectsConfig,
}

impl ExamConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` — use [`ExamConfig::load_with_dotenv`] if you
    /// need `.env` file loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the merged sources fail to extract.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    ///
    /// Calls `dotenvy` to load the `.env` file from the workspace root before
    /// building the figment. This is the typical entry point for the CLI and
    /// tests.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the merged sources fail to extract.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".examflow/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment = figment.merge(Env::prefixed("EXAMFLOW_").split("__"));

        figment
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("examflow").join("config.toml"))
    }

    /// Load `.env` from the workspace root.
    ///
    /// Walks up from `CARGO_MANIFEST_DIR` (if available) or current dir
    /// looking for a `.env` file. Silently does nothing if no `.env` exists.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // Walk up at most 3 levels (crate -> crates/ -> workspace root)
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        // Fallback: try current directory
        let _ = dotenvy::dotenv();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_loads() {
        let config = ExamConfig::default();
        assert!(!config.moodle.is_configured());
        assert!(config.subjects.is_empty());
        assert_eq!(config.database.path, "examflow.db");
    }

    #[test]
    fn figment_builds_without_files() {
        let figment = ExamConfig::figment();
        let config: ExamConfig = figment.extract().expect("should extract defaults");
        assert_eq!(config.cache.subject_ttl_secs, 1800);
        assert!(config.upload.allows_extension(".pdf"));
    }

    #[test]
    fn toml_fallback_table_parses() {
        let config: ExamConfig = Figment::from(Serialized::defaults(ExamConfig::default()))
            .merge(Toml::string(
                r#"
                [moodle]
                base_url = "https://lms.example.edu"

                [subjects.fallback]
                "19AI405" = 42
                "CS101" = 10
                "#,
            ))
            .extract()
            .expect("should extract");

        assert!(config.moodle.is_configured());
        assert_eq!(config.subjects.lookup("19ai405"), Some(42));
        assert_eq!(config.subjects.lookup("CS101"), Some(10));
    }
}
