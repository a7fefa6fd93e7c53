//! # exam-resolve
//!
//! Hybrid subject→assignment resolution with four fallback layers:
//! 1. In-memory TTL cache
//! 2. Persistent mapping store
//! 3. Dynamic Moodle discovery (credential-gated)
//! 4. Static configuration fallback
//!
//! The chain is an ordered list of [`layers::LookupLayer`] strategy objects
//! rather than hand-written branches, so each layer tests in isolation and
//! deployments can substitute custom layers. Discovered mappings are
//! persisted automatically — the system self-heals: one successful discovery
//! makes every later lookup a store (or cache) hit.

pub mod engine;
pub mod error;
pub mod layers;
pub mod refresh;

pub use engine::ResolutionEngine;
pub use error::ResolveError;
pub use layers::{CacheLayer, ConfigLayer, DiscoveryLayer, LookupLayer, StoreLayer};
pub use refresh::{RefreshDetail, RefreshStatus, RefreshSummary};
