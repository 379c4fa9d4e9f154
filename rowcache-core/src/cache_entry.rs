use std::time::{Duration, Instant};

/// Internal wrapper that tracks when a value was inserted and how long it
/// may live.
///
/// # Fields
///
/// * `value` - The cached value
/// * `inserted_at` - The `Instant` when this entry was created
/// * `ttl` - Lifetime of the entry; `None` means it never expires
///
/// # Examples
///
/// ```
/// use rowcache_core::CacheEntry;
/// use std::time::Duration;
///
/// let entry = CacheEntry::new(42, Some(Duration::from_secs(60)));
/// assert_eq!(entry.value, 42);
/// assert!(!entry.is_expired());
///
/// let forever = CacheEntry::new(7, None);
/// assert!(!forever.is_expired());
/// ```
#[derive(Clone, Debug)]
pub struct CacheEntry<R> {
    pub value: R,
    pub inserted_at: Instant,
    pub ttl: Option<Duration>,
}

impl<R> CacheEntry<R> {
    /// Creates a new entry stamped with `Instant::now()`.
    pub fn new(value: R, ttl: Option<Duration>) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    /// Returns true once the entry has outlived its TTL.
    ///
    /// # Examples
    ///
    /// ```
    /// use rowcache_core::CacheEntry;
    /// use std::thread;
    /// use std::time::Duration;
    ///
    /// let entry = CacheEntry::new("data", Some(Duration::from_millis(10)));
    /// assert!(!entry.is_expired());
    ///
    /// thread::sleep(Duration::from_millis(20));
    /// assert!(entry.is_expired());
    /// ```
    pub fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.inserted_at.elapsed() >= ttl,
            None => false,
        }
    }
}
