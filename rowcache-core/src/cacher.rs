use std::sync::Arc;
use std::time::Duration;

use crate::{BoxError, CacheItem};

/// Storage backend for captured result sets.
///
/// The interceptor calls `get` and `set` from many threads at once, for the
/// same and for different keys, so implementations must be safe for
/// concurrent use. Expiry and eviction are entirely up to the backend.
///
/// Errors never fail a query: the interceptor counts them, reports them to
/// the error hook and carries on as if the cache were empty.
pub trait Cacher: Send + Sync {
    /// Looks up `key`. `Ok(None)` is a plain miss.
    fn get(&self, key: &str) -> Result<Option<Arc<CacheItem>>, BoxError>;

    /// Stores `item` under `key` for `ttl`.
    fn set(&self, key: &str, item: CacheItem, ttl: Duration) -> Result<(), BoxError>;
}

impl<C: Cacher + ?Sized> Cacher for Arc<C> {
    fn get(&self, key: &str) -> Result<Option<Arc<CacheItem>>, BoxError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, item: CacheItem, ttl: Duration) -> Result<(), BoxError> {
        (**self).set(key, item, ttl)
    }
}
