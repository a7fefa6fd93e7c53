//! The four lookup layers of the resolution chain.
//!
//! Each layer answers "can you map this code?" through the common
//! [`LookupLayer`] trait, so layers are testable in isolation and the engine
//! is just an ordered walk. Layer-specific failure policy lives with the
//! layer: the store propagates its errors (fatal), discovery swallows Moodle
//! failures into a miss, the config table cannot fail.

use std::sync::Arc;

use async_trait::async_trait;

use exam_cache::TtlCache;
use exam_config::SubjectsConfig;
use exam_core::{MoodleToken, ResolutionSource, ResolvedAssignment};
use exam_db::ExamDb;
use exam_moodle::{Course, MoodleClient, MoodleError, RetryPolicy, retry_transient};

use crate::error::ResolveError;

/// Cache key for a normalized subject code.
pub(crate) fn cache_key(code: &str) -> String {
    format!("subject:{code}")
}

/// One step of the resolution chain.
///
/// `code` arrives normalized (trimmed, upper-cased); `token` is the caller's
/// discovery credential, if any.
#[async_trait]
pub trait LookupLayer: Send + Sync {
    /// Short name used for logging and post-hit bookkeeping.
    fn name(&self) -> &'static str;

    /// Attempt to resolve the code. `Ok(None)` is a miss, not a failure.
    async fn try_resolve(
        &self,
        code: &str,
        token: Option<&MoodleToken>,
    ) -> Result<Option<ResolvedAssignment>, ResolveError>;
}

// ── Layer 1: in-memory cache ───────────────────────────────────────

/// Cache lookup. A hit returns the cached payload verbatim, so the source
/// tag of whichever layer originally produced it survives.
pub struct CacheLayer {
    cache: Arc<TtlCache<ResolvedAssignment>>,
}

impl CacheLayer {
    pub const NAME: &'static str = "cache";

    #[must_use]
    pub fn new(cache: Arc<TtlCache<ResolvedAssignment>>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl LookupLayer for CacheLayer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn try_resolve(
        &self,
        code: &str,
        _token: Option<&MoodleToken>,
    ) -> Result<Option<ResolvedAssignment>, ResolveError> {
        Ok(self.cache.get(&cache_key(code)).await)
    }
}

// ── Layer 2: persistent store ──────────────────────────────────────

/// Active-mapping lookup in the persistent store. Store errors are fatal to
/// the whole resolution — the engine's contract requires a working store.
pub struct StoreLayer {
    db: Arc<ExamDb>,
}

impl StoreLayer {
    pub const NAME: &'static str = "database";

    #[must_use]
    pub fn new(db: Arc<ExamDb>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LookupLayer for StoreLayer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn try_resolve(
        &self,
        code: &str,
        _token: Option<&MoodleToken>,
    ) -> Result<Option<ResolvedAssignment>, ResolveError> {
        Ok(self
            .db
            .find_active_mapping(code)
            .await?
            .map(|mapping| mapping.to_resolved()))
    }
}

// ── Layer 3: live Moodle discovery ─────────────────────────────────

/// Dynamic discovery against the live Moodle instance.
///
/// Skipped entirely when the caller supplied no credential. Any Moodle
/// failure — API error immediately, transport error after bounded retries —
/// downgrades to a layer miss so resolution can fall through to the static
/// configuration.
pub struct DiscoveryLayer {
    client: Arc<MoodleClient>,
    retry: RetryPolicy,
}

impl DiscoveryLayer {
    pub const NAME: &'static str = "moodle_discovery";

    #[must_use]
    pub fn new(client: Arc<MoodleClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Search the caller's courses and their assignments for the code.
    ///
    /// Strategy:
    /// 1. Resolve the token to a user, enumerate their courses.
    /// 2. First pass: candidate courses whose shortname/idnumber/fullname
    ///    contains the code.
    /// 3. No candidate → fall back to all accessible courses. This can match
    ///    an assignment purely on its own name, which is intentionally loose:
    ///    it saves staff from perfect course metadata discipline at the cost
    ///    of the occasional false positive.
    /// 4. First assignment whose course matched or whose name contains the
    ///    code wins, in Moodle's original ordering.
    async fn discover(
        &self,
        code: &str,
        token: &MoodleToken,
    ) -> Result<Option<ResolvedAssignment>, MoodleError> {
        let site = retry_transient(&self.retry, || self.client.get_site_info(token)).await?;
        let courses =
            retry_transient(&self.retry, || self.client.get_user_courses(site.userid, token))
                .await?;
        if courses.is_empty() {
            tracing::debug!(user_id = site.userid, "user has no accessible courses");
            return Ok(None);
        }

        let mut candidates: Vec<i64> = courses
            .iter()
            .filter(|course| course_matches(course, code))
            .map(|course| course.id)
            .collect();
        if candidates.is_empty() {
            candidates = courses.iter().map(|course| course.id).collect();
        }

        let with_assignments =
            retry_transient(&self.retry, || self.client.get_assignments(&candidates, token))
                .await?;

        for course in &with_assignments {
            let course_matched =
                contains_code(&course.shortname, code) || contains_code(&course.idnumber, code);
            for assignment in &course.assignments {
                if course_matched || contains_code(&assignment.name, code) {
                    tracing::info!(
                        subject_code = %code,
                        course_id = course.id,
                        assignment_id = assignment.id,
                        assignment_name = %assignment.name,
                        "discovered assignment"
                    );
                    return Ok(Some(ResolvedAssignment {
                        assignment_id: assignment.id,
                        course_id: course.id,
                        assignment_name: Some(assignment.name.clone()),
                        source: ResolutionSource::MoodleDiscovery,
                    }));
                }
            }
        }

        tracing::debug!(subject_code = %code, "no matching assignment in Moodle");
        Ok(None)
    }
}

#[async_trait]
impl LookupLayer for DiscoveryLayer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn try_resolve(
        &self,
        code: &str,
        token: Option<&MoodleToken>,
    ) -> Result<Option<ResolvedAssignment>, ResolveError> {
        let Some(token) = token else {
            tracing::debug!(subject_code = %code, "no credential, skipping discovery");
            return Ok(None);
        };
        match self.discover(code, token).await {
            Ok(found) => Ok(found),
            Err(e) => {
                tracing::warn!(subject_code = %code, error = %e, "discovery failed, falling through");
                Ok(None)
            }
        }
    }
}

/// Case-insensitive substring match against a normalized (upper-case) code.
fn contains_code(haystack: &str, code: &str) -> bool {
    haystack.to_uppercase().contains(code)
}

fn course_matches(course: &Course, code: &str) -> bool {
    contains_code(&course.shortname, code)
        || contains_code(&course.idnumber, code)
        || contains_code(&course.fullname, code)
}

// ── Layer 4: static configuration ──────────────────────────────────

/// Last-resort lookup in the operator-maintained fallback table.
/// The course is unknown to configuration, so hits carry the `0` sentinel.
pub struct ConfigLayer {
    subjects: SubjectsConfig,
}

impl ConfigLayer {
    pub const NAME: &'static str = "config";

    #[must_use]
    pub fn new(subjects: SubjectsConfig) -> Self {
        Self { subjects }
    }
}

#[async_trait]
impl LookupLayer for ConfigLayer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn try_resolve(
        &self,
        code: &str,
        _token: Option<&MoodleToken>,
    ) -> Result<Option<ResolvedAssignment>, ResolveError> {
        Ok(self
            .subjects
            .lookup(code)
            .map(|assignment_id| ResolvedAssignment {
                assignment_id,
                course_id: 0,
                assignment_name: None,
                source: ResolutionSource::Config,
            }))
    }
}
