//! Resolver statistics
//!
//! Lock-free counters updated on the request path, and a serializable
//! point-in-time snapshot for reporting.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics tracker for resolver operations
#[derive(Debug)]
pub struct ResolverStats {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cached_wins: AtomicU64,
    rebuild_wins: AtomicU64,
    builds: AtomicU64,
    failures: AtomicU64,
}

impl ResolverStats {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            cached_wins: AtomicU64::new(0),
            rebuild_wins: AtomicU64::new(0),
            builds: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn increment_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cached_wins(&self) {
        self.cached_wins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rebuild_wins(&self) {
        self.rebuild_wins.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts completed builds, including rebuilds that lost a race
    pub fn increment_builds(&self) {
        self.builds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cached_wins: self.cached_wins.load(Ordering::Relaxed),
            rebuild_wins: self.rebuild_wins.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResolverStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the resolver counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Resolutions started
    pub requests: u64,
    /// Linkstore lookups that found an entry
    pub cache_hits: u64,
    /// Linkstore lookups that found nothing
    pub cache_misses: u64,
    /// Races won by the cached fetch
    pub cached_wins: u64,
    /// Races won by the rebuild
    pub rebuild_wins: u64,
    /// Derived artifacts built and recorded
    pub builds: u64,
    /// Resolutions that ended in an error
    pub failures: u64,
}

impl StatsSnapshot {
    /// Fraction of transformed requests answered from the linkstore
    /// Returns 0.0 if there were no lookups
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}
