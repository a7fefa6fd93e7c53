use std::fmt;

/// A caller-scoped Moodle web-service token.
///
/// Grants the resolution engine and submission workflow permission to query
/// Moodle on the caller's behalf. The token value is redacted from `Debug`
/// output so it never lands in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct MoodleToken(String);

impl MoodleToken {
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// The raw token value, for building web-service requests.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MoodleToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Debug for MoodleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MoodleToken(..)")
    }
}
