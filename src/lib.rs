//! # Rowcache
//!
//! A stampede-resistant cache-aside layer for query results that are read as
//! streams.
//!
//! ## Features
//!
//! - **Opt-in per query**: Only queries carrying `@cache-ttl` and
//!   `@cache-max-rows` directives are cached
//! - **Stampede-safe**: Concurrent requests for the same uncached query run it
//!   once; the rest wait and are served from the cache
//! - **Clean reads only**: Results are committed after the caller has read
//!   the whole stream without errors and within the row cap
//! - **Graceful degradation**: Cache and hashing failures are counted and
//!   reported, never returned to the caller
//! - **Bounded lock state**: Per-key locks disappear once nobody holds them
//!
//! ## Quick Start
//!
//! Wrap your connection calls with an [`Interceptor`]:
//!
//! ```rust
//! use rowcache::{BoxError, CacheItem, CachedRows, NamedValue, Queryer, Rows, Value};
//! use std::sync::Arc;
//!
//! struct Inventory;
//!
//! impl Queryer for Inventory {
//!     fn query(&self, _query: &str, _args: &[NamedValue]) -> Result<Box<dyn Rows>, BoxError> {
//!         let item = CacheItem::new(
//!             vec!["name".to_string(), "qty".to_string()],
//!             vec![vec![Value::from("bolt"), Value::from(40)]],
//!         );
//!         Ok(Box::new(CachedRows::new(Arc::new(item))))
//!     }
//! }
//!
//! let interceptor = rowcache::in_memory();
//! let query = "-- @cache-ttl 30\n-- @cache-max-rows 1000\nSELECT name, qty FROM stock WHERE bin = ?";
//! let args = [NamedValue::positional(1, "A4")];
//!
//! let mut rows = interceptor.query(&Inventory, query, &args)?;
//! let mut dest = vec![Value::Null; rows.columns().len()];
//! while rows.next(&mut dest)? {
//!     // use dest
//! }
//! // Closing a fully read stream commits it
//! rows.close()?;
//!
//! let stats = interceptor.stats();
//! assert_eq!(stats.misses, 1);
//! # Ok::<(), BoxError>(())
//! ```
//!
//! ## Custom Backends and Keys
//!
//! Any type implementing [`Cacher`] can store results. Key derivation
//! defaults to a SHA-256 over the query and its parameters; pass
//! [`noop_hash`] to rule out collisions, or your own function:
//!
//! ```rust
//! use rowcache::{noop_hash, Config, Interceptor, MemoryCache};
//!
//! let interceptor = Interceptor::new(
//!     Config::new(MemoryCache::with_limit(10_000))
//!         .hash_fn(noop_hash)
//!         .on_error(|err| eprintln!("cache degraded: {err}")),
//! );
//! # let _ = interceptor;
//! ```

pub use rowcache_core::*;

/// Creates an interceptor backed by an unbounded [`MemoryCache`] with the
/// default key derivation and directive parser.
///
/// # Examples
///
/// ```rust
/// let interceptor = rowcache::in_memory();
/// assert!(interceptor.is_enabled());
/// assert_eq!(interceptor.stats().hits, 0);
/// ```
pub fn in_memory() -> Interceptor {
    Interceptor::new(Config::new(MemoryCache::new()))
}
