//! # Rowcache Core
//!
//! Building blocks for a stampede-resistant cache-aside layer in front of a
//! query execution path that returns streaming result sets.
//!
//! ## Features
//!
//! - **Keyed Locks**: Independent reader-writer locks per key, created lazily
//!   and reclaimed once unused
//! - **Stream Recording**: Captures rows while the caller consumes a result,
//!   committing only clean, complete reads
//! - **Stampede Protection**: At most one execution in flight per cache key
//! - **Pluggable Seams**: Cache backend, key derivation, directive parsing
//!   and error reporting are all replaceable
//! - **Statistics**: Per-interceptor hit, miss and error counters
//!
//! ## Module Organization
//!
//! - [`KeyedRwLock`] - Reference-counted per-key reader-writer locks
//! - [`RowsRecorder`] - Result stream recorder
//! - [`Interceptor`] and [`Config`] - Cache-aside orchestration
//! - [`CachedRows`] - Replay cursor over a cached result
//! - [`MemoryCache`] - In-process TTL cache backend
//! - [`hash`] - Cache key derivation functions
//! - [`parse_attributes`] - Per-query caching directives
//!
//! ## Example
//!
//! ```
//! use rowcache_core::{
//!     BoxError, CacheItem, CachedRows, Config, Interceptor, MemoryCache, NamedValue, Queryer,
//!     Rows, Value,
//! };
//! use std::sync::Arc;
//!
//! struct Db;
//!
//! impl Queryer for Db {
//!     fn query(&self, _query: &str, _args: &[NamedValue]) -> Result<Box<dyn Rows>, BoxError> {
//!         let item = CacheItem::new(vec!["n".to_string()], vec![vec![Value::Int(1)]]);
//!         Ok(Box::new(CachedRows::new(Arc::new(item))))
//!     }
//! }
//!
//! let interceptor = Interceptor::new(Config::new(MemoryCache::new()));
//! let query = "-- @cache-ttl 60 @cache-max-rows 100\nSELECT n FROM t";
//!
//! let mut rows = interceptor.query(&Db, query, &[])?;
//! let mut dest = vec![Value::Null; rows.columns().len()];
//! while rows.next(&mut dest)? {}
//! rows.close()?;
//!
//! // Second run is served from the cache
//! let _ = interceptor.query(&Db, query, &[])?;
//! assert_eq!(interceptor.stats().hits, 1);
//! # Ok::<(), BoxError>(())
//! ```
mod attrs;
mod cache_entry;
mod cached_rows;
mod cacher;
mod driver;
mod error;
mod interceptor;
mod keyed_lock;
mod memory_cache;
mod recorder;
mod stats;
mod value;

pub mod hash;

pub use attrs::{parse_attributes, QueryAttributes};
pub use cache_entry::CacheEntry;
pub use cached_rows::CachedRows;
pub use cacher::Cacher;
pub use driver::{Queryer, Rows, Statement};
pub use error::{BoxError, Error};
pub use hash::{default_hash, noop_hash};
pub use interceptor::{AttributesFn, Config, ErrorHook, HashFn, Interceptor};
pub use keyed_lock::{KeyReadGuard, KeyWriteGuard, KeyedRwLock};
pub use memory_cache::MemoryCache;
pub use recorder::RowsRecorder;
pub use stats::{CacheStats, StatsSnapshot};
pub use value::{CacheItem, NamedValue, Value};
