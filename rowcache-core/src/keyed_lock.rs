use dashmap::DashMap;
use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock, RwLock};
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;

/// Reference count of an entry that has been removed from the map.
const RETIRED: i64 = -1;

/// Per-key state: the number of holders (active or about to lock) and the
/// lock they share.
struct KeyEntry {
    count: AtomicI64,
    lock: Arc<RwLock<()>>,
}

impl KeyEntry {
    fn new() -> Self {
        Self {
            count: AtomicI64::new(0),
            lock: Arc::new(RwLock::new(())),
        }
    }

    /// Registers one more holder. Fails once the entry has been retired.
    fn retain(&self) -> bool {
        let mut current = self.count.load(Ordering::Acquire);
        loop {
            if current == RETIRED {
                return false;
            }
            match self.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Drops one holder. Returns `true` when this call retired the entry and
    /// the caller must remove it from the map.
    fn release(&self) -> bool {
        let previous = self.count.fetch_sub(1, Ordering::AcqRel);
        previous == 1
            && self
                .count
                .compare_exchange(0, RETIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }
}

/// Reader-writer locks keyed by arbitrary values.
///
/// Each key gets its own lock, so holders of different keys never block one
/// another. Per-key state is created on the first acquisition and removed
/// again by the release that leaves it without holders, which keeps the map
/// proportional to the keys currently in contention rather than to every key
/// ever seen.
///
/// # Reclamation
///
/// Every entry carries a reference count of holders, including threads that
/// are still waiting for the lock. Acquirers bump it with a compare-and-swap
/// before locking; the release that brings it to zero swaps it to a retired
/// sentinel and removes the entry. An acquirer that resolved the entry just
/// before it was retired observes the sentinel, drops it and resolves the
/// key again, landing on a fresh entry.
///
/// # Thread Safety
///
/// The map is a sharded [`DashMap`]; shard locks are only held while an
/// entry is looked up, inserted or removed, never while waiting for a key's
/// lock. The per-key locks are `parking_lot` rwlocks held through
/// `Arc`-owned guards.
///
/// Acquisitions return owned guards that release on drop. Guards do not
/// borrow the `KeyedRwLock` and can be sent to another thread, which lets a
/// write hold outlive the call that took it.
///
/// # Examples
///
/// ```
/// use rowcache_core::KeyedRwLock;
///
/// let locks = KeyedRwLock::new();
///
/// let r1 = locks.read("users");
/// let r2 = locks.read("users");
/// // A different key is independent
/// let w = locks.write("orders");
/// assert_eq!(locks.len(), 2);
///
/// drop(r1);
/// drop(r2);
/// drop(w);
/// assert!(locks.is_empty());
/// ```
pub struct KeyedRwLock<K: Eq + Hash> {
    entries: Arc<DashMap<K, Arc<KeyEntry>>>,
}

impl<K: Eq + Hash + Clone> KeyedRwLock<K> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Blocks until a shared hold on `key` is granted.
    pub fn read(&self, key: K) -> KeyReadGuard<K> {
        let entry = self.retain_entry(&key);
        let guard = entry.lock.read_arc();
        KeyReadGuard {
            hold: Hold {
                entries: Arc::clone(&self.entries),
                key,
                entry,
            },
            _guard: guard,
        }
    }

    /// Blocks until an exclusive hold on `key` is granted.
    pub fn write(&self, key: K) -> KeyWriteGuard<K> {
        let entry = self.retain_entry(&key);
        let guard = entry.lock.write_arc();
        KeyWriteGuard {
            hold: Hold {
                entries: Arc::clone(&self.entries),
                key,
                entry,
            },
            _guard: guard,
        }
    }

    /// Number of keys that currently have holders or waiters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn retain_entry(&self, key: &K) -> Arc<KeyEntry> {
        loop {
            let entry = self.resolve(key);
            if entry.retain() {
                return entry;
            }
            // Retired but not yet removed by its last holder
            thread::yield_now();
        }
    }

    fn resolve(&self, key: &K) -> Arc<KeyEntry> {
        if let Some(entry) = self.entries.get(key) {
            return Arc::clone(entry.value());
        }
        let entry = self.entries.entry(key.clone()).or_insert_with(|| {
            tracing::trace!("keyed lock entry created");
            Arc::new(KeyEntry::new())
        });
        Arc::clone(entry.value())
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedRwLock<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> Clone for KeyedRwLock<K> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<K: Eq + Hash> fmt::Debug for KeyedRwLock<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedRwLock")
            .field("keys", &self.entries.len())
            .finish()
    }
}

/// A registered holder of one key's entry.
struct Hold<K: Eq + Hash> {
    entries: Arc<DashMap<K, Arc<KeyEntry>>>,
    key: K,
    entry: Arc<KeyEntry>,
}

impl<K: Eq + Hash> Hold<K> {
    /// Unregisters the holder, removing the entry if it was the last one.
    /// Must run before the key's lock is unlocked.
    fn release(&self) {
        if self.entry.release() {
            // Only remove the instance we retired, never a fresh replacement
            self.entries
                .remove_if(&self.key, |_, current| Arc::ptr_eq(current, &self.entry));
            tracing::trace!("keyed lock entry reclaimed");
        }
    }
}

/// Shared hold on one key of a [`KeyedRwLock`], released on drop.
#[must_use = "the read hold is released as soon as the guard is dropped"]
pub struct KeyReadGuard<K: Eq + Hash> {
    hold: Hold<K>,
    // Dropped after `Drop::drop` has released the hold
    _guard: ArcRwLockReadGuard<RawRwLock, ()>,
}

impl<K: Eq + Hash> KeyReadGuard<K> {
    pub fn key(&self) -> &K {
        &self.hold.key
    }

    pub fn unlock(self) {
        drop(self);
    }
}

impl<K: Eq + Hash> Drop for KeyReadGuard<K> {
    fn drop(&mut self) {
        self.hold.release();
    }
}

/// Exclusive hold on one key of a [`KeyedRwLock`], released on drop.
#[must_use = "the write hold is released as soon as the guard is dropped"]
pub struct KeyWriteGuard<K: Eq + Hash> {
    hold: Hold<K>,
    _guard: ArcRwLockWriteGuard<RawRwLock, ()>,
}

impl<K: Eq + Hash> KeyWriteGuard<K> {
    pub fn key(&self) -> &K {
        &self.hold.key
    }

    pub fn unlock(self) {
        drop(self);
    }
}

impl<K: Eq + Hash> Drop for KeyWriteGuard<K> {
    fn drop(&mut self) {
        self.hold.release();
    }
}

impl<K: Eq + Hash + fmt::Debug> fmt::Debug for KeyReadGuard<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyReadGuard")
            .field("key", &self.hold.key)
            .finish()
    }
}

impl<K: Eq + Hash + fmt::Debug> fmt::Debug for KeyWriteGuard<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyWriteGuard")
            .field("key", &self.hold.key)
            .finish()
    }
}
