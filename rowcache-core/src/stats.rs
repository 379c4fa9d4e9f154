use std::sync::atomic::{AtomicU64, Ordering};

/// Hit, miss and error counters for one interceptor.
///
/// Counters only grow (until [`reset`](CacheStats::reset)) and are updated
/// with `Relaxed` atomic increments, so recording never blocks request
/// threads. Use [`snapshot`](CacheStats::snapshot) to read all three at once.
///
/// What counts as what:
///
/// - **hit**: a query answered from the cache, on either the shared or the
///   exclusive check
/// - **miss**: a query executed against the data source to fill the cache
/// - **error**: a failed key derivation, cache read or cache write
///
/// # Examples
///
/// ```
/// use rowcache_core::CacheStats;
///
/// let stats = CacheStats::new();
///
/// stats.record_hit();
/// stats.record_hit();
/// stats.record_miss();
/// stats.record_error();
///
/// assert_eq!(stats.hits(), 2);
/// assert_eq!(stats.misses(), 1);
/// assert_eq!(stats.errors(), 1);
/// assert_eq!(stats.total_accesses(), 3);
/// assert!((stats.hit_rate() - 0.6666).abs() < 0.001);
/// ```
#[derive(Debug)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of a [`CacheStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
}

impl CacheStats {
    /// Creates a new `CacheStats` instance with zero counters.
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns the total number of cache accesses (hits + misses).
    ///
    /// Errors are not accesses: a failed lookup either bypasses the cache or
    /// ends up counted as a miss once the query is executed.
    #[inline]
    pub fn total_accesses(&self) -> u64 {
        self.hits() + self.misses()
    }

    /// Calculates the hit rate as a fraction (0.0 to 1.0).
    ///
    /// Returns 0.0 if there have been no accesses.
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    #[inline]
    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }

    /// Reads the three counters.
    ///
    /// Each counter is read atomically, the three together are not: a
    /// snapshot taken under traffic may mix values from adjacent requests.
    ///
    /// # Examples
    ///
    /// ```
    /// use rowcache_core::{CacheStats, StatsSnapshot};
    ///
    /// let stats = CacheStats::new();
    /// stats.record_miss();
    ///
    /// let snapshot = stats.snapshot();
    /// stats.record_hit();
    ///
    /// assert_eq!(snapshot, StatsSnapshot { hits: 0, misses: 1, errors: 0 });
    /// ```
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            errors: self.errors(),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}
