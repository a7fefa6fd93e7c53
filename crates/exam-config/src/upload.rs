//! Upload validation configuration.

use serde::{Deserialize, Serialize};

/// Default maximum upload size: 10 MiB.
const fn default_max_size_bytes() -> u64 {
    10 * 1024 * 1024
}

/// Default extension allow-list for scanned papers.
fn default_allowed_extensions() -> Vec<String> {
    [".pdf", ".jpg", ".jpeg", ".png"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// Maximum accepted file size in bytes.
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,

    /// Accepted file extensions, lower-case, with leading dot.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl UploadConfig {
    /// Check an extension (with leading dot, any case) against the allow-list.
    #[must_use]
    pub fn allows_extension(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        self.allowed_extensions.iter().any(|e| *e == extension)
    }
}
