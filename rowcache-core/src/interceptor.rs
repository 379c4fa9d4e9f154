use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{
    default_hash, parse_attributes, BoxError, CacheItem, CacheStats, CachedRows, Cacher, Error,
    KeyWriteGuard, KeyedRwLock, NamedValue, QueryAttributes, Queryer, Rows, RowsRecorder,
    Statement, StatsSnapshot,
};

/// Derives a cache key from query text and bound parameters.
pub type HashFn = dyn Fn(&str, &[NamedValue]) -> Result<String, BoxError> + Send + Sync;

/// Reads the caching directives of a query; `None` disables caching for it.
pub type AttributesFn = dyn Fn(&str) -> Option<QueryAttributes> + Send + Sync;

/// Receives every cache and hash failure the interceptor absorbs.
pub type ErrorHook = dyn Fn(&Error) + Send + Sync;

/// Configuration for an [`Interceptor`].
///
/// Only the cache backend is required; everything else has a default:
///
/// - `hash_fn`: [`default_hash`]
/// - `attributes_fn`: [`parse_attributes`]
/// - `on_error`: none, failures are only counted and logged
/// - `disabled`: `false`
///
/// # Examples
///
/// ```
/// use rowcache_core::{noop_hash, Config, Interceptor, MemoryCache};
///
/// let config = Config::new(MemoryCache::new())
///     .hash_fn(noop_hash)
///     .on_error(|err| eprintln!("rowcache: {err}"));
///
/// let interceptor = Interceptor::new(config);
/// assert!(interceptor.is_enabled());
/// ```
pub struct Config {
    cache: Arc<dyn Cacher>,
    hash_fn: Arc<HashFn>,
    attributes_fn: Arc<AttributesFn>,
    on_error: Option<Arc<ErrorHook>>,
    disabled: bool,
}

impl Config {
    pub fn new(cache: impl Cacher + 'static) -> Self {
        Self::with_shared_cache(Arc::new(cache))
    }

    /// Uses a backend that is also reachable from elsewhere.
    pub fn with_shared_cache(cache: Arc<dyn Cacher>) -> Self {
        Self {
            cache,
            hash_fn: Arc::new(default_hash),
            attributes_fn: Arc::new(parse_attributes),
            on_error: None,
            disabled: false,
        }
    }

    pub fn hash_fn<F>(mut self, hash_fn: F) -> Self
    where
        F: Fn(&str, &[NamedValue]) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        self.hash_fn = Arc::new(hash_fn);
        self
    }

    pub fn attributes_fn<F>(mut self, attributes_fn: F) -> Self
    where
        F: Fn(&str) -> Option<QueryAttributes> + Send + Sync + 'static,
    {
        self.attributes_fn = Arc::new(attributes_fn);
        self
    }

    pub fn on_error<F>(mut self, on_error: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    /// Starts the interceptor as a pure passthrough.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("on_error", &self.on_error.is_some())
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

/// State shared by an interceptor, its clones and the streams it returns.
struct Shared {
    cache: Arc<dyn Cacher>,
    hash_fn: Arc<HashFn>,
    attributes_fn: Arc<AttributesFn>,
    on_error: Option<Arc<ErrorHook>>,
    stats: CacheStats,
    disabled: AtomicBool,
    locks: KeyedRwLock<String>,
}

impl Shared {
    fn report(&self, err: Error) {
        self.stats.record_error();
        tracing::warn!(error = %err, "rowcache operation failed");
        if let Some(on_error) = &self.on_error {
            on_error(&err);
        }
    }

    /// Looks `key` up, treating a backend failure as a miss.
    fn check_cache(&self, key: &str) -> Option<Arc<CacheItem>> {
        match self.cache.get(key) {
            Ok(Some(item)) => {
                self.stats.record_hit();
                tracing::debug!(key, "cache hit");
                Some(item)
            }
            Ok(None) => None,
            Err(err) => {
                self.report(Error::CacheGet(err));
                None
            }
        }
    }
}

/// Stampede-safe cache-aside layer in front of a query execution path.
///
/// For every query that carries caching directives the interceptor derives a
/// key and serves the result from the cache when it can. When it cannot, a
/// single caller per key executes the query; its result stream is recorded
/// while being consumed and committed to the cache once it has been read to
/// the end. Concurrent callers for the same key wait on a per-key write hold
/// and are then answered from the cache.
///
/// # Protocol
///
/// 1. Bypass when disabled or when the query has no directives.
/// 2. Derive the key; on failure, count, report and execute uncached.
/// 3. Under a shared hold, check the cache.
/// 4. On a miss, swap to an exclusive hold and check again: another caller
///    may have filled the cache while no hold was held.
/// 5. Still a miss: execute and return the stream wrapped in a
///    [`RowsRecorder`]. The exclusive hold travels with the stream and is
///    released when it is closed or dropped, after the commit.
///
/// Execution errors are returned as they are, after releasing the hold.
/// Cache and hash failures never fail a query.
///
/// The interceptor is cheap to clone; clones share configuration, counters
/// and locks.
#[derive(Clone)]
pub struct Interceptor {
    shared: Arc<Shared>,
}

impl Interceptor {
    pub fn new(config: Config) -> Self {
        Self {
            shared: Arc::new(Shared {
                cache: config.cache,
                hash_fn: config.hash_fn,
                attributes_fn: config.attributes_fn,
                on_error: config.on_error,
                stats: CacheStats::new(),
                disabled: AtomicBool::new(config.disabled),
                locks: KeyedRwLock::new(),
            }),
        }
    }

    /// Turns caching back on. Interceptors start enabled unless configured
    /// otherwise.
    pub fn enable(&self) {
        self.shared.disabled.store(false, Ordering::Relaxed);
    }

    /// Makes the interceptor a passthrough for subsequent queries. Streams
    /// already handed out keep recording and committing.
    pub fn disable(&self) {
        self.shared.disabled.store(true, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        !self.shared.disabled.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of the hit, miss and error counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Number of keys currently locked or waited on.
    pub fn locked_keys(&self) -> usize {
        self.shared.locks.len()
    }

    /// Runs `query` on a connection through the cache.
    pub fn query(
        &self,
        conn: &dyn Queryer,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, BoxError> {
        self.intercept(query, args, || conn.query(query, args))
    }

    /// Runs a prepared statement through the cache.
    pub fn query_stmt(
        &self,
        stmt: &dyn Statement,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>, BoxError> {
        self.intercept(stmt.query_text(), args, || stmt.query(args))
    }

    fn intercept<F>(
        &self,
        query: &str,
        args: &[NamedValue],
        execute: F,
    ) -> Result<Box<dyn Rows>, BoxError>
    where
        F: FnOnce() -> Result<Box<dyn Rows>, BoxError>,
    {
        let shared = &self.shared;

        if !self.is_enabled() {
            tracing::debug!("interceptor disabled, bypassing cache");
            return execute();
        }

        let Some(attrs) = (shared.attributes_fn)(query) else {
            tracing::debug!("no caching directives, bypassing cache");
            return execute();
        };

        let key = match (shared.hash_fn)(query, args) {
            Ok(key) => key,
            Err(err) => {
                shared.report(Error::Hash(err));
                return execute();
            }
        };

        let read_guard = shared.locks.read(key.clone());
        if let Some(item) = shared.check_cache(&key) {
            read_guard.unlock();
            return Ok(Box::new(CachedRows::new(item)));
        }
        read_guard.unlock();

        let write_guard = shared.locks.write(key.clone());
        if let Some(item) = shared.check_cache(&key) {
            write_guard.unlock();
            return Ok(Box::new(CachedRows::new(item)));
        }

        shared.stats.record_miss();
        tracing::debug!(key = %key, "cache miss, executing query");

        // On error the write guard is dropped here, unblocking later callers
        let rows = execute()?;

        let commit = self.committer(key, attrs, write_guard);
        Ok(Box::new(RowsRecorder::new(rows, attrs.max_rows, commit)))
    }

    /// Builds the completion callback for a recorded stream: store the item
    /// if there is one, then release the write hold.
    fn committer(
        &self,
        key: String,
        attrs: QueryAttributes,
        write_guard: KeyWriteGuard<String>,
    ) -> impl FnOnce(Option<CacheItem>) + Send + 'static {
        let shared = Arc::clone(&self.shared);
        move |item| {
            if let Some(item) = item {
                let rows = item.rows.len();
                match shared.cache.set(&key, item, attrs.ttl) {
                    Ok(()) => tracing::debug!(key = %key, rows, "result committed to cache"),
                    Err(err) => shared.report(Error::CacheSet(err)),
                }
            }
            write_guard.unlock();
        }
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("enabled", &self.is_enabled())
            .field("stats", &self.stats())
            .field("locks", &self.shared.locks)
            .finish_non_exhaustive()
    }
}
