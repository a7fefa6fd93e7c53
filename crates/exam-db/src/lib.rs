//! # exam-db
//!
//! libSQL persistent store for examflow.
//!
//! Holds the durable half of the resolution engine's state — the
//! subject→assignment mapping table — and the examination artifacts moving
//! through the submission workflow. Mappings are soft-deactivated, never
//! deleted, so history survives course re-shuffles.
//!
//! Uses the `libsql` crate: native `SQLite` storage with a stable async API.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;

use error::DatabaseError;
use libsql::Builder;

/// Central database handle for all examflow persistence.
///
/// Wraps a libSQL database and connection. Repository methods are added via
/// `impl ExamDb` blocks in [`repos`].
pub struct ExamDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl ExamDb {
    /// Open a local database at the given path (`:memory:` for tests).
    ///
    /// Runs migrations automatically on every open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let exam_db = Self { db, conn };
        exam_db.run_migrations().await?;
        Ok(exam_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"art-a3f8b2c1"`.
    ///
    /// Uses `randomblob(4)` in SQL to produce 8-char hex, then prepends the prefix.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT '{prefix}-' || lower(hex(randomblob(4)))"),
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn test_db() -> ExamDb {
        ExamDb::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn open_local_creates_schema() {
        let db = test_db().await;

        let mut rows = db
            .conn()
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                (),
            )
            .await
            .unwrap();

        let mut tables = HashSet::new();
        while let Some(row) = rows.next().await.unwrap() {
            tables.insert(row.get::<String>(0).unwrap());
        }

        assert!(tables.contains("subject_mapping"));
        assert!(tables.contains("exam_artifact"));
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = test_db().await;
        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn generate_id_has_prefix_and_hex_suffix() {
        let db = test_db().await;
        let id = db.generate_id("art").await.unwrap();
        let (prefix, hex) = id.split_once('-').unwrap();
        assert_eq!(prefix, "art");
        assert_eq!(hex.len(), 8);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
