//! URL match caching.
//!
//! [`MatchCache`] remembers the result of
//! [`StateRegistry::match_url`](crate::StateRegistry::match_url) per URL so
//! repeated navigations to the same address skip the pattern scan. It is
//! gated behind the `cache` feature and uses the [`lru`] crate.
//!
//! The registry clears the cache whenever states are added or a lazy
//! boundary is replaced, so a cached entry never outlives the tree it was
//! computed from.
//!
//! # Examples
//!
//! ```
//! use state_router::cache::MatchCache;
//! use state_router::{StateMatch, TargetState};
//!
//! let mut cache = MatchCache::new();
//! cache.insert("/home".to_string(), StateMatch::exact(TargetState::new("home")));
//!
//! assert_eq!(cache.get("/home").unwrap().target.name(), "home");
//! assert_eq!(cache.stats().hits, 1);
//! ```

use crate::registry::StateMatch;
use crate::{debug_log, trace_log};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Hit, miss and invalidation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    /// Number of [`MatchCache::clear`] calls.
    pub invalidations: usize,
}

impl CacheStats {
    /// Hit rate in `0.0..=1.0`; `0.0` before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache from URL to match result.
#[derive(Debug)]
pub struct MatchCache {
    entries: LruCache<String, StateMatch>,
    stats: CacheStats,
}

impl MatchCache {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::with_capacity(NonZeroUsize::new(Self::DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Look up a URL, updating hit/miss counters.
    pub fn get(&mut self, url: &str) -> Option<StateMatch> {
        if let Some(found) = self.entries.get(url) {
            self.stats.hits += 1;
            trace_log!("Match cache hit for '{}'", url);
            Some(found.clone())
        } else {
            self.stats.misses += 1;
            trace_log!("Match cache miss for '{}'", url);
            None
        }
    }

    pub fn insert(&mut self, url: String, found: StateMatch) {
        self.entries.push(url, found);
    }

    /// Drop every entry and count an invalidation.
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        self.entries.clear();
        self.stats.invalidations += 1;
        debug_log!(
            "Match cache cleared: {} entries removed ({} invalidations, hit rate {:.1}%)",
            removed,
            self.stats.invalidations,
            self.stats.hit_rate() * 100.0
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl Default for MatchCache {
    fn default() -> Self {
        Self::new()
    }
}
