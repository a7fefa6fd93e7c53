//! Bulk re-discovery of every active mapping.
//!
//! Useful after a Moodle course re-shuffle: each stored mapping is
//! re-discovered with the operator's credential and updated only when the
//! assignment id actually changed. A discovery miss keeps the last-known-good
//! row active — fail open, a stale mapping beats no mapping — and no single
//! subject's failure aborts the batch.

use serde::Serialize;

use exam_core::{MoodleToken, ResolutionSource};
use exam_db::repos::NewMapping;

use crate::engine::ResolutionEngine;
use crate::error::ResolveError;

/// Per-subject outcome of a refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStatus {
    Updated,
    Unchanged,
    NotFound,
}

/// Detail record for one subject in a refresh pass.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshDetail {
    pub subject_code: String,
    pub status: RefreshStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_id: Option<i64>,
}

/// Summary of a [`ResolutionEngine::refresh_all`] pass.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub total: usize,
    pub refreshed: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub details: Vec<RefreshDetail>,
}

impl ResolutionEngine {
    /// Re-discover every active mapping and update the rows that changed.
    ///
    /// The cache entry is invalidated before each re-discovery so the next
    /// resolution sees the refreshed row. Rows are only written when the
    /// discovered assignment id differs from the stored one; a confirmed
    /// mapping just gets its verification time bumped.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] only if listing or updating the store fails —
    /// individual discovery failures are accumulated in the summary.
    pub async fn refresh_all(&self, token: &MoodleToken) -> Result<RefreshSummary, ResolveError> {
        let mappings = self.db().list_active_mappings().await?;

        let mut summary = RefreshSummary {
            total: mappings.len(),
            refreshed: 0,
            unchanged: 0,
            failed: 0,
            details: Vec::with_capacity(mappings.len()),
        };

        for mapping in mappings {
            let code = mapping.subject_code.clone();
            let old_id = mapping.moodle_assignment_id;

            self.invalidate(&code).await;

            match self.discovery().try_resolve(&code, Some(token)).await {
                Ok(Some(found)) if found.assignment_id != old_id => {
                    self.db()
                        .upsert_mapping(&NewMapping {
                            subject_code: code.clone(),
                            course_id: found.course_id,
                            assignment_id: found.assignment_id,
                            assignment_name: found.assignment_name.clone(),
                            source: ResolutionSource::MoodleDiscovery,
                        })
                        .await?;
                    summary.refreshed += 1;
                    summary.details.push(RefreshDetail {
                        subject_code: code,
                        status: RefreshStatus::Updated,
                        old_id: Some(old_id),
                        new_id: Some(found.assignment_id),
                    });
                }
                Ok(Some(_)) => {
                    self.db().touch_mapping_verified(&code).await?;
                    summary.unchanged += 1;
                    summary.details.push(RefreshDetail {
                        subject_code: code,
                        status: RefreshStatus::Unchanged,
                        old_id: None,
                        new_id: None,
                    });
                }
                Ok(None) => {
                    summary.failed += 1;
                    summary.details.push(RefreshDetail {
                        subject_code: code,
                        status: RefreshStatus::NotFound,
                        old_id: None,
                        new_id: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(subject_code = %code, error = %e, "refresh discovery errored");
                    summary.failed += 1;
                    summary.details.push(RefreshDetail {
                        subject_code: code,
                        status: RefreshStatus::NotFound,
                        old_id: None,
                        new_id: None,
                    });
                }
            }
        }

        tracing::info!(
            total = summary.total,
            refreshed = summary.refreshed,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "mapping refresh complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{CacheLayer, ConfigLayer, LookupLayer, StoreLayer};
    use async_trait::async_trait;
    use exam_cache::TtlCache;
    use exam_config::SubjectsConfig;
    use exam_core::ResolvedAssignment;
    use exam_db::ExamDb;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    struct ScriptedDiscovery {
        results: HashMap<String, ResolvedAssignment>,
    }

    #[async_trait]
    impl LookupLayer for ScriptedDiscovery {
        fn name(&self) -> &'static str {
            "moodle_discovery"
        }

        async fn try_resolve(
            &self,
            code: &str,
            token: Option<&MoodleToken>,
        ) -> Result<Option<ResolvedAssignment>, ResolveError> {
            assert!(token.is_some(), "refresh always supplies a credential");
            Ok(self.results.get(code).cloned())
        }
    }

    fn found(assignment_id: i64, course_id: i64) -> ResolvedAssignment {
        ResolvedAssignment {
            assignment_id,
            course_id,
            assignment_name: Some("PART B and C ANSWER SCRIPT".to_string()),
            source: exam_core::ResolutionSource::MoodleDiscovery,
        }
    }

    async fn engine_with_discovery(
        db: Arc<ExamDb>,
        results: HashMap<String, ResolvedAssignment>,
    ) -> ResolutionEngine {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(60)));
        let discovery: Arc<dyn LookupLayer> = Arc::new(ScriptedDiscovery { results });
        let layers: Vec<Arc<dyn LookupLayer>> = vec![
            Arc::new(CacheLayer::new(Arc::clone(&cache))),
            Arc::new(StoreLayer::new(Arc::clone(&db))),
            Arc::clone(&discovery),
            Arc::new(ConfigLayer::new(SubjectsConfig::default())),
        ];
        ResolutionEngine::with_layers(cache, db, layers, discovery, Duration::from_secs(60))
    }

    async fn seed(db: &ExamDb, code: &str, assignment_id: i64) {
        db.upsert_mapping(&NewMapping {
            subject_code: code.to_string(),
            course_id: 3,
            assignment_id,
            assignment_name: None,
            source: ResolutionSource::MoodleDiscovery,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn changed_and_unchanged_mappings_are_counted_separately() {
        let db = Arc::new(ExamDb::open_local(":memory:").await.unwrap());
        seed(&db, "19AI405", 42).await;
        seed(&db, "19AI411", 2).await;

        let engine = engine_with_discovery(
            Arc::clone(&db),
            [
                ("19AI405".to_string(), found(99, 3)), // changed
                ("19AI411".to_string(), found(2, 4)),  // same assignment id
            ]
            .into_iter()
            .collect(),
        )
        .await;

        let summary = engine
            .refresh_all(&MoodleToken::from("staff-token"))
            .await
            .unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.refreshed, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.failed, 0);

        let updated = db.find_active_mapping("19AI405").await.unwrap().unwrap();
        assert_eq!(updated.moodle_assignment_id, 99);

        // Unchanged mapping keeps its stored course id — only verified time moves.
        let untouched = db.find_active_mapping("19AI411").await.unwrap().unwrap();
        assert_eq!(untouched.moodle_assignment_id, 2);
        assert_eq!(untouched.moodle_course_id, 3);

        let detail = summary
            .details
            .iter()
            .find(|d| d.subject_code == "19AI405")
            .unwrap();
        assert_eq!(detail.status, RefreshStatus::Updated);
        assert_eq!(detail.old_id, Some(42));
        assert_eq!(detail.new_id, Some(99));
    }

    #[tokio::test]
    async fn discovery_miss_fails_open() {
        let db = Arc::new(ExamDb::open_local(":memory:").await.unwrap());
        seed(&db, "19AI405", 42).await;

        let engine = engine_with_discovery(Arc::clone(&db), HashMap::new()).await;
        let summary = engine
            .refresh_all(&MoodleToken::from("staff-token"))
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.details[0].status, RefreshStatus::NotFound);

        // Last-known-good row stays active.
        let kept = db.find_active_mapping("19AI405").await.unwrap().unwrap();
        assert!(kept.is_active);
        assert_eq!(kept.moodle_assignment_id, 42);
    }

    #[tokio::test]
    async fn refresh_invalidates_cached_entries() {
        let db = Arc::new(ExamDb::open_local(":memory:").await.unwrap());
        seed(&db, "19AI405", 42).await;

        let engine = engine_with_discovery(
            Arc::clone(&db),
            [("19AI405".to_string(), found(99, 3))].into_iter().collect(),
        )
        .await;

        // Prime the cache from the store.
        engine.resolve("19AI405", None).await.unwrap();

        engine
            .refresh_all(&MoodleToken::from("staff-token"))
            .await
            .unwrap();

        // Next credential-free resolution sees the refreshed row, not stale cache.
        let resolved = engine.resolve("19AI405", None).await.unwrap().unwrap();
        assert_eq!(resolved.assignment_id, 99);
    }

    #[tokio::test]
    async fn empty_store_refreshes_nothing() {
        let db = Arc::new(ExamDb::open_local(":memory:").await.unwrap());
        let engine = engine_with_discovery(db, HashMap::new()).await;

        let summary = engine
            .refresh_all(&MoodleToken::from("staff-token"))
            .await
            .unwrap();
        assert_eq!(summary.total, 0);
        assert!(summary.details.is_empty());
    }
}
