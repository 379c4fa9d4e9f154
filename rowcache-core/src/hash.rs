//! Cache key derivation.
//!
//! A key function maps query text and bound parameters to the string the
//! cache backend is addressed with. Equal queries with equal parameters must
//! always produce the same key.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::time::UNIX_EPOCH;

use crate::{BoxError, NamedValue, Value};

/// Derives a SHA-256 key from the query text and its parameters.
///
/// Every component is length-prefixed and type-tagged before hashing, so
/// `Int(1)` and `Text("1")` or shifted boundaries between parameters never
/// produce the same input. The key is the hex-encoded digest.
///
/// Distinct queries can in principle collide; use [`noop_hash`] where that
/// is unacceptable.
///
/// # Examples
///
/// ```
/// use rowcache_core::{default_hash, NamedValue};
///
/// let args = [NamedValue::positional(1, 42)];
/// let a = default_hash("SELECT * FROM t WHERE id = ?", &args).unwrap();
/// let b = default_hash("SELECT * FROM t WHERE id = ?", &args).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn default_hash(query: &str, args: &[NamedValue]) -> Result<String, BoxError> {
    let mut hasher = Sha256::new();
    write_bytes(&mut hasher, query.as_bytes());
    hasher.update((args.len() as u64).to_le_bytes());

    for arg in args {
        hasher.update((arg.ordinal as u64).to_le_bytes());
        match &arg.name {
            Some(name) => {
                hasher.update([1u8]);
                write_bytes(&mut hasher, name.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        write_value(&mut hasher, &arg.value);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Uses the query text and a rendering of the parameters as the key.
///
/// Keys are longer than with [`default_hash`] but two different queries can
/// never share one.
///
/// # Examples
///
/// ```
/// use rowcache_core::{noop_hash, NamedValue};
///
/// let key = noop_hash("SELECT ?", &[NamedValue::positional(1, "a")]).unwrap();
/// assert!(key.starts_with("SELECT ?"));
/// ```
pub fn noop_hash(query: &str, args: &[NamedValue]) -> Result<String, BoxError> {
    let mut key = String::from(query);
    for arg in args {
        key.push('\u{0}');
        if let Some(name) = &arg.name {
            write!(key, "{name}")?;
        }
        write!(key, "#{}={:?}", arg.ordinal, arg.value)?;
    }
    Ok(key)
}

fn write_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn write_value(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Null => hasher.update([0u8]),
        Value::Bool(v) => hasher.update([1u8, u8::from(*v)]),
        Value::Int(v) => {
            hasher.update([2u8]);
            hasher.update(v.to_le_bytes());
        }
        Value::Float(v) => {
            hasher.update([3u8]);
            hasher.update(v.to_bits().to_le_bytes());
        }
        Value::Text(v) => {
            hasher.update([4u8]);
            write_bytes(hasher, v.as_bytes());
        }
        Value::Bytes(v) => {
            hasher.update([5u8]);
            write_bytes(hasher, v);
        }
        Value::Timestamp(v) => {
            hasher.update([6u8]);
            let (sign, offset) = match v.duration_since(UNIX_EPOCH) {
                Ok(after) => (0u8, after),
                Err(before) => (1u8, before.duration()),
            };
            hasher.update([sign]);
            hasher.update(offset.as_secs().to_le_bytes());
            hasher.update(offset.subsec_nanos().to_le_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn key(query: &str, args: &[NamedValue]) -> String {
        default_hash(query, args).unwrap()
    }

    #[test]
    fn test_deterministic() {
        let args = vec![
            NamedValue::positional(1, "a"),
            NamedValue::named("limit", 2, 10),
        ];
        assert_eq!(key("SELECT 1", &args), key("SELECT 1", &args.clone()));
    }

    #[test]
    fn test_query_text_changes_key() {
        assert_ne!(key("SELECT 1", &[]), key("SELECT 2", &[]));
    }

    #[test]
    fn test_value_types_are_distinguished() {
        let int = [NamedValue::positional(1, 1)];
        let text = [NamedValue::positional(1, "1")];
        let float = [NamedValue::positional(1, 1.0)];
        assert_ne!(key("q", &int), key("q", &text));
        assert_ne!(key("q", &int), key("q", &float));
    }

    #[test]
    fn test_parameter_boundaries_are_distinguished() {
        let split_a = [
            NamedValue::positional(1, "ab"),
            NamedValue::positional(2, "c"),
        ];
        let split_b = [
            NamedValue::positional(1, "a"),
            NamedValue::positional(2, "bc"),
        ];
        assert_ne!(key("q", &split_a), key("q", &split_b));
    }

    #[test]
    fn test_names_and_ordinals_matter() {
        let named = [NamedValue::named("id", 1, 5)];
        let positional = [NamedValue::positional(1, 5)];
        let shifted = [NamedValue::positional(2, 5)];
        assert_ne!(key("q", &named), key("q", &positional));
        assert_ne!(key("q", &positional), key("q", &shifted));
    }

    #[test]
    fn test_timestamps_around_epoch() {
        let after = [NamedValue::positional(1, UNIX_EPOCH + Duration::from_secs(5))];
        let before = [NamedValue::positional(1, UNIX_EPOCH - Duration::from_secs(5))];
        assert_ne!(key("q", &after), key("q", &before));
        assert!(default_hash("q", &[NamedValue::positional(1, SystemTime::now())]).is_ok());
    }

    #[test]
    fn test_noop_hash_keeps_inputs_apart() {
        let a = noop_hash("SELECT ?", &[NamedValue::positional(1, "x")]).unwrap();
        let b = noop_hash("SELECT ?", &[NamedValue::positional(1, "y")]).unwrap();
        let c = noop_hash("SELECT ?", &[]).unwrap();
        assert_ne!(a, b);
        assert_eq!(c, "SELECT ?");
    }
}
