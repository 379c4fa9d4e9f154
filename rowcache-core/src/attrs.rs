use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

static ATTR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@cache-(ttl|max-rows)\s+(\d+)").expect("attribute pattern is valid")
});

/// Caching directives attached to a single query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryAttributes {
    /// How long the backend keeps the captured result.
    pub ttl: Duration,
    /// Largest result (in rows) that is still cached.
    pub max_rows: usize,
}

/// Extracts caching directives from query text.
///
/// A query opts into caching by carrying both `@cache-ttl <seconds>` and
/// `@cache-max-rows <n>`, usually inside a comment. If either is missing the
/// query is not cached and `None` is returned. When a directive appears more
/// than once the first occurrence wins.
///
/// # Examples
///
/// ```
/// use rowcache_core::parse_attributes;
/// use std::time::Duration;
///
/// let query = "-- @cache-ttl 30\n-- @cache-max-rows 10\nSELECT name FROM items";
/// let attrs = parse_attributes(query).unwrap();
/// assert_eq!(attrs.ttl, Duration::from_secs(30));
/// assert_eq!(attrs.max_rows, 10);
///
/// assert!(parse_attributes("SELECT name FROM items").is_none());
/// ```
pub fn parse_attributes(query: &str) -> Option<QueryAttributes> {
    let mut ttl = None;
    let mut max_rows = None;

    for caps in ATTR_REGEX.captures_iter(query) {
        match &caps[1] {
            "ttl" if ttl.is_none() => ttl = caps[2].parse::<u64>().ok(),
            "max-rows" if max_rows.is_none() => max_rows = caps[2].parse::<usize>().ok(),
            _ => {}
        }
    }

    Some(QueryAttributes {
        ttl: Duration::from_secs(ttl?),
        max_rows: max_rows?,
    })
}
