use std::fmt;
use std::mem;

use crate::{BoxError, CacheItem, Rows, Value};

type Completion = Box<dyn FnOnce(Option<CacheItem>) + Send>;

/// Records a live result stream while the caller consumes it.
///
/// Every call is forwarded to the wrapped cursor and its result returned
/// untouched; capturing is purely a side effect. Rows are copied into a
/// pending [`CacheItem`] until the stream ends, fails, or grows past
/// `max_rows`.
///
/// The completion callback runs exactly once: from [`close`](Rows::close),
/// or from `Drop` if the recorder is abandoned before being closed. It
/// receives the captured item only when the stream reached its end without
/// errors and within the row cap and was then closed successfully, and
/// `None` otherwise. A recorder dropped without `close` always passes `None`.
///
/// # Examples
///
/// ```
/// use rowcache_core::{CacheItem, CachedRows, Rows, RowsRecorder, Value};
/// use std::sync::{Arc, Mutex};
///
/// let source = CacheItem::new(vec!["n".to_string()], vec![vec![Value::Int(1)]]);
/// let committed = Arc::new(Mutex::new(None));
///
/// let sink = Arc::clone(&committed);
/// let mut rows = RowsRecorder::new(CachedRows::new(Arc::new(source.clone())), 10, move |item| {
///     *sink.lock().unwrap() = item;
/// });
///
/// rows.columns();
/// let mut dest = vec![Value::Null];
/// while rows.next(&mut dest).unwrap() {}
/// rows.close().unwrap();
///
/// assert_eq!(committed.lock().unwrap().as_ref(), Some(&source));
/// ```
pub struct RowsRecorder<R: Rows> {
    inner: R,
    item: CacheItem,
    max_rows: usize,
    got_eof: bool,
    got_err: bool,
    max_rows_hit: bool,
    on_complete: Option<Completion>,
}

impl<R: Rows> RowsRecorder<R> {
    pub fn new<F>(inner: R, max_rows: usize, on_complete: F) -> Self
    where
        F: FnOnce(Option<CacheItem>) + Send + 'static,
    {
        Self {
            inner,
            item: CacheItem::default(),
            max_rows,
            got_eof: false,
            got_err: false,
            max_rows_hit: false,
            on_complete: Some(Box::new(on_complete)),
        }
    }

    /// Whether the capture, as of now, would be committed on close.
    pub fn is_cacheable(&self) -> bool {
        self.got_eof && !self.got_err && !self.max_rows_hit
    }

    fn complete(&mut self) {
        let Some(on_complete) = self.on_complete.take() else {
            return;
        };

        let item = if self.is_cacheable() {
            Some(mem::take(&mut self.item))
        } else {
            tracing::debug!(
                eof = self.got_eof,
                error = self.got_err,
                capped = self.max_rows_hit,
                "discarding recorded rows"
            );
            self.item = CacheItem::default();
            None
        };
        on_complete(item);
    }
}

impl<R: Rows> Rows for RowsRecorder<R> {
    fn columns(&mut self) -> Vec<String> {
        self.item.columns = self.inner.columns();
        self.item.columns.clone()
    }

    fn next(&mut self, dest: &mut [Value]) -> Result<bool, BoxError> {
        let result = self.inner.next(dest);
        match result {
            Ok(true) => {}
            Ok(false) => self.got_eof = true,
            Err(_) => self.got_err = true,
        }

        if self.got_eof || self.got_err || self.max_rows_hit {
            return result;
        }

        if self.item.rows.len() == self.max_rows {
            self.max_rows_hit = true;
            return result;
        }

        self.item.rows.push(dest.to_vec());
        result
    }

    fn close(&mut self) -> Result<(), BoxError> {
        let result = self.inner.close();
        if result.is_err() {
            self.got_err = true;
        }
        self.complete();
        result
    }
}

impl<R: Rows> Drop for RowsRecorder<R> {
    fn drop(&mut self) {
        if self.on_complete.is_some() {
            tracing::debug!("result stream dropped without close");
            // The inner cursor was never closed, so the read is not clean
            self.got_err = true;
            self.complete();
        }
    }
}

impl<R: Rows> fmt::Debug for RowsRecorder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowsRecorder")
            .field("captured_rows", &self.item.rows.len())
            .field("max_rows", &self.max_rows)
            .field("got_eof", &self.got_eof)
            .field("got_err", &self.got_err)
            .field("max_rows_hit", &self.max_rows_hit)
            .finish()
    }
}
