use std::time::SystemTime;

/// A single scalar cell, either bound as a query parameter or read from a row.
///
/// The cache layer never inspects values beyond copying them into a
/// [`CacheItem`] and feeding them to the key derivation function.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(SystemTime),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<SystemTime> for Value {
    fn from(v: SystemTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A bound query parameter.
///
/// `ordinal` is 1-based, matching positional placeholders. `name` is set for
/// named placeholders only.
#[derive(Clone, Debug, PartialEq)]
pub struct NamedValue {
    pub name: Option<String>,
    pub ordinal: usize,
    pub value: Value,
}

impl NamedValue {
    /// Creates a positional parameter.
    ///
    /// # Examples
    ///
    /// ```
    /// use rowcache_core::{NamedValue, Value};
    ///
    /// let arg = NamedValue::positional(1, 42);
    /// assert_eq!(arg.ordinal, 1);
    /// assert_eq!(arg.name, None);
    /// assert_eq!(arg.value, Value::Int(42));
    /// ```
    pub fn positional(ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: None,
            ordinal,
            value: value.into(),
        }
    }

    /// Creates a named parameter.
    pub fn named(name: &str, ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.to_string()),
            ordinal,
            value: value.into(),
        }
    }
}

/// A fully captured result set, as stored in the cache backend.
///
/// Items are built by the recorder during a cache miss and are treated as
/// immutable once handed to [`Cacher::set`](crate::Cacher::set).
///
/// # Examples
///
/// ```
/// use rowcache_core::{CacheItem, Value};
///
/// let item = CacheItem::new(
///     vec!["name".to_string(), "qty".to_string()],
///     vec![vec![Value::from("a"), Value::from(1)]],
/// );
/// assert_eq!(item.columns.len(), 2);
/// assert_eq!(item.rows.len(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CacheItem {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl CacheItem {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
