use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use crate::{BoxError, CacheEntry, CacheItem, Cacher};

/// In-process [`Cacher`] keeping captured result sets in memory.
///
/// Entries expire after the TTL they were stored with; a zero TTL keeps them
/// until they are evicted or removed. With an entry limit, the oldest insert
/// is evicted first (FIFO).
///
/// # Thread Safety
///
/// The map sits behind a `parking_lot::RwLock` so concurrent hits only take a
/// shared lock. The insertion order queue has its own `Mutex`; when both are
/// needed the queue is always locked first.
///
/// # Examples
///
/// ```
/// use rowcache_core::{CacheItem, Cacher, MemoryCache, Value};
/// use std::time::Duration;
///
/// let cache = MemoryCache::with_limit(100);
/// let item = CacheItem::new(vec!["n".to_string()], vec![vec![Value::Int(1)]]);
///
/// cache.set("k", item.clone(), Duration::from_secs(60)).unwrap();
/// assert_eq!(cache.get("k").unwrap().as_deref(), Some(&item));
/// assert!(cache.get("other").unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct MemoryCache {
    map: RwLock<HashMap<String, CacheEntry<Arc<CacheItem>>>>,
    order: Mutex<VecDeque<String>>,
    limit: Option<usize>,
}

impl MemoryCache {
    /// Creates an unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding at most `limit` entries.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Looks up a live entry, dropping it if it has expired.
    pub fn lookup(&self, key: &str) -> Option<Arc<CacheItem>> {
        {
            let m = self.map.read();
            match m.get(key) {
                Some(entry) if !entry.is_expired() => return Some(Arc::clone(&entry.value)),
                Some(_) => {}
                None => return None,
            }
        }

        let mut o = self.order.lock();
        let mut m = self.map.write();
        // Re-check, the entry may have been replaced in between
        if m.get(key).is_some_and(CacheEntry::is_expired) {
            m.remove(key);
            remove_from_order(&mut o, key);
        }
        None
    }

    /// Stores `item`, replacing any previous entry and evicting the oldest
    /// entries beyond the limit.
    pub fn insert(&self, key: &str, item: CacheItem, ttl: Duration) {
        let ttl = (!ttl.is_zero()).then_some(ttl);
        let entry = CacheEntry::new(Arc::new(item), ttl);

        let mut o = self.order.lock();
        let mut m = self.map.write();

        // Oldest inserts expire first as long as TTLs are alike
        while let Some(front) = o.front() {
            if !m.get(front).is_some_and(CacheEntry::is_expired) {
                break;
            }
            m.remove(front);
            o.pop_front();
        }

        m.insert(key.to_string(), entry);
        remove_from_order(&mut o, key);
        o.push_back(key.to_string());

        if let Some(limit) = self.limit {
            while o.len() > limit {
                let Some(evict_key) = o.pop_front() else {
                    break;
                };
                m.remove(&evict_key);
            }
        }
    }

    /// Drops every expired entry, wherever it sits in insertion order.
    /// Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut o = self.order.lock();
        let mut m = self.map.write();
        let before = m.len();
        m.retain(|_, entry| !entry.is_expired());
        o.retain(|k| m.contains_key(k));
        before - m.len()
    }

    pub fn remove(&self, key: &str) -> bool {
        let mut o = self.order.lock();
        remove_from_order(&mut o, key);
        self.map.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        let mut o = self.order.lock();
        self.map.write().clear();
        o.clear();
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl Cacher for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Arc<CacheItem>>, BoxError> {
        Ok(self.lookup(key))
    }

    fn set(&self, key: &str, item: CacheItem, ttl: Duration) -> Result<(), BoxError> {
        self.insert(key, item, ttl);
        Ok(())
    }
}

fn remove_from_order(order: &mut VecDeque<String>, key: &str) {
    if let Some(pos) = order.iter().position(|k| k == key) {
        order.remove(pos);
    }
}
