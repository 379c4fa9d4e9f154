//! Seams between the cache layer and the data source.
//!
//! These traits describe the pull-based cursor and the two ways a query can
//! reach the data source. Implementations live with the driver; the cache
//! layer only wraps them.

use crate::{BoxError, NamedValue, Value};

/// A pull-based cursor over a result set.
///
/// `next` fills `dest` with the values of the next row and returns
/// `Ok(true)`, or returns `Ok(false)` once the stream is exhausted. `dest`
/// must be at least as long as [`columns`](Rows::columns).
pub trait Rows: Send {
    fn columns(&mut self) -> Vec<String>;

    fn next(&mut self, dest: &mut [Value]) -> Result<bool, BoxError>;

    fn close(&mut self) -> Result<(), BoxError>;
}

impl<R: Rows + ?Sized> Rows for Box<R> {
    fn columns(&mut self) -> Vec<String> {
        (**self).columns()
    }

    fn next(&mut self, dest: &mut [Value]) -> Result<bool, BoxError> {
        (**self).next(dest)
    }

    fn close(&mut self) -> Result<(), BoxError> {
        (**self).close()
    }
}

/// A connection able to execute query text directly.
pub trait Queryer {
    fn query(&self, query: &str, args: &[NamedValue]) -> Result<Box<dyn Rows>, BoxError>;
}

/// A prepared statement, bound to the query text it was prepared from.
pub trait Statement {
    fn query_text(&self) -> &str;

    fn query(&self, args: &[NamedValue]) -> Result<Box<dyn Rows>, BoxError>;
}
