use std::sync::Arc;

use crate::{BoxError, CacheItem, Rows, Value};

/// Replays a stored [`CacheItem`] through the [`Rows`] contract.
///
/// Rows come back in the order they were captured, `next` reports the end
/// of the stream once they are exhausted and `close` does nothing.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rowcache_core::{CacheItem, CachedRows, Rows, Value};
///
/// let item = CacheItem::new(vec!["n".to_string()], vec![vec![Value::Int(1)]]);
/// let mut rows = CachedRows::new(Arc::new(item));
/// let mut dest = vec![Value::Null];
///
/// assert!(rows.next(&mut dest).unwrap());
/// assert_eq!(dest[0], Value::Int(1));
/// assert!(!rows.next(&mut dest).unwrap());
/// ```
#[derive(Debug)]
pub struct CachedRows {
    item: Arc<CacheItem>,
    pos: usize,
}

impl CachedRows {
    pub fn new(item: Arc<CacheItem>) -> Self {
        Self { item, pos: 0 }
    }
}

impl Rows for CachedRows {
    fn columns(&mut self) -> Vec<String> {
        self.item.columns.clone()
    }

    fn next(&mut self, dest: &mut [Value]) -> Result<bool, BoxError> {
        let Some(row) = self.item.rows.get(self.pos) else {
            return Ok(false);
        };
        for (slot, value) in dest.iter_mut().zip(row) {
            *slot = value.clone();
        }
        self.pos += 1;
        Ok(true)
    }

    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}
