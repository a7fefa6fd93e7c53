//! Resolution error types.

use thiserror::Error;

/// Errors from the resolution engine.
///
/// Only the cache/store layers can fail a lookup: the engine must be able to
/// read and persist mappings. Discovery failures degrade to a layer miss
/// inside the discovery layer and never surface here; the config layer is
/// pure in-memory lookup and cannot fail. "Not found" is not an error — it
/// is the `None` side of a successful resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Persistent store lookup or mapping write failed.
    #[error("mapping store error: {0}")]
    Database(#[from] exam_db::error::DatabaseError),

    /// Catch-all for unexpected errors from custom layers.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
