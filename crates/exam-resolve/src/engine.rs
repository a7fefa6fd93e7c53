//! The resolution engine: an ordered walk over the lookup chain.

use std::sync::Arc;
use std::time::Duration;

use exam_cache::{CacheStats, TtlCache};
use exam_config::{CacheConfig, SubjectsConfig};
use exam_core::{MoodleToken, ResolutionSource, ResolvedAssignment, normalize_subject_code};
use exam_db::ExamDb;
use exam_db::repos::NewMapping;
use exam_moodle::{MoodleClient, RetryPolicy};

use crate::error::ResolveError;
use crate::layers::{
    CacheLayer, ConfigLayer, DiscoveryLayer, LookupLayer, StoreLayer, cache_key,
};

/// Hybrid subject resolution with four fallback layers.
///
/// Resolution order, short-circuiting on the first hit:
/// 1. In-memory cache (sub-millisecond)
/// 2. Persistent store lookup
/// 3. Dynamic Moodle discovery (only with a caller credential)
/// 4. Static configuration fallback
///
/// Successfully discovered mappings are persisted for future lookups,
/// eliminating repeated Moodle calls; every non-cache hit also populates
/// the cache. The cache instance is owned by the engine — no hidden global
/// state — and is the only shared mutable structure across concurrent
/// resolutions.
pub struct ResolutionEngine {
    cache: Arc<TtlCache<ResolvedAssignment>>,
    db: Arc<ExamDb>,
    layers: Vec<Arc<dyn LookupLayer>>,
    discovery: Arc<dyn LookupLayer>,
    subject_ttl: Duration,
}

impl ResolutionEngine {
    /// Build the standard four-layer chain.
    #[must_use]
    pub fn new(
        cache: Arc<TtlCache<ResolvedAssignment>>,
        db: Arc<ExamDb>,
        client: Arc<MoodleClient>,
        subjects: SubjectsConfig,
        cache_config: &CacheConfig,
    ) -> Self {
        let discovery: Arc<dyn LookupLayer> =
            Arc::new(DiscoveryLayer::new(client, RetryPolicy::default()));
        let layers: Vec<Arc<dyn LookupLayer>> = vec![
            Arc::new(CacheLayer::new(Arc::clone(&cache))),
            Arc::new(StoreLayer::new(Arc::clone(&db))),
            Arc::clone(&discovery),
            Arc::new(ConfigLayer::new(subjects)),
        ];
        Self {
            cache,
            db,
            layers,
            discovery,
            subject_ttl: cache_config.subject_ttl(),
        }
    }

    /// Build an engine over a custom chain.
    ///
    /// `discovery` is the layer [`ResolutionEngine::refresh_all`] re-runs for
    /// each stored mapping; it is usually also an element of `layers`.
    #[must_use]
    pub fn with_layers(
        cache: Arc<TtlCache<ResolvedAssignment>>,
        db: Arc<ExamDb>,
        layers: Vec<Arc<dyn LookupLayer>>,
        discovery: Arc<dyn LookupLayer>,
        subject_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            db,
            layers,
            discovery,
            subject_ttl,
        }
    }

    pub(crate) fn db(&self) -> &Arc<ExamDb> {
        &self.db
    }

    pub(crate) fn discovery(&self) -> &Arc<dyn LookupLayer> {
        &self.discovery
    }

    /// Resolve a subject code to its assignment, or `None` after all four
    /// layers miss.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] only for cache/store failures — discovery
    /// problems degrade to a miss inside the discovery layer.
    pub async fn resolve(
        &self,
        subject_code: &str,
        token: Option<&MoodleToken>,
    ) -> Result<Option<ResolvedAssignment>, ResolveError> {
        let code = normalize_subject_code(subject_code);

        for layer in &self.layers {
            if let Some(found) = layer.try_resolve(&code, token).await? {
                tracing::debug!(
                    subject_code = %code,
                    layer = layer.name(),
                    assignment_id = found.assignment_id,
                    "resolved"
                );
                self.record_hit(&code, layer.name(), &found).await?;
                return Ok(Some(found));
            }
        }

        tracing::warn!(subject_code = %code, "no mapping found in any layer");
        Ok(None)
    }

    /// Convenience wrapper returning just the assignment id.
    ///
    /// # Errors
    ///
    /// Same as [`ResolutionEngine::resolve`].
    pub async fn resolve_id(
        &self,
        subject_code: &str,
        token: Option<&MoodleToken>,
    ) -> Result<Option<i64>, ResolveError> {
        Ok(self
            .resolve(subject_code, token)
            .await?
            .map(|found| found.assignment_id))
    }

    /// Post-hit bookkeeping: populate the cache for non-cache hits, persist
    /// discovery and config hits. Runs only after the layer's full result is
    /// in hand, so a cancelled resolution leaves no partial writes.
    async fn record_hit(
        &self,
        code: &str,
        layer_name: &str,
        found: &ResolvedAssignment,
    ) -> Result<(), ResolveError> {
        if layer_name == CacheLayer::NAME {
            return Ok(());
        }

        self.cache
            .set_with_ttl(cache_key(code), found.clone(), self.subject_ttl)
            .await;

        if matches!(
            found.source,
            ResolutionSource::MoodleDiscovery | ResolutionSource::Config
        ) {
            self.db
                .upsert_mapping(&NewMapping {
                    subject_code: code.to_string(),
                    course_id: found.course_id,
                    assignment_id: found.assignment_id,
                    assignment_name: found.assignment_name.clone(),
                    source: found.source,
                })
                .await?;
            tracing::info!(
                subject_code = %code,
                assignment_id = found.assignment_id,
                source = %found.source,
                "mapping persisted"
            );
        }
        Ok(())
    }

    /// Drop the cache entry for one subject code. The persistent row is
    /// untouched. Returns `true` if an entry was present.
    pub async fn invalidate(&self, subject_code: &str) -> bool {
        let code = normalize_subject_code(subject_code);
        self.cache.delete(&cache_key(&code)).await
    }

    /// Wipe every cached mapping. Returns the number of entries removed.
    pub async fn clear_cache(&self) -> usize {
        self.cache.clear().await
    }

    /// Cache statistics passthrough.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}
