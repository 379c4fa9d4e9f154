/// Boxed error used at the driver seams (execution path, cursors, cache
/// backends and key derivation).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures the cache layer absorbs and reports through the error hook.
///
/// None of these reach the caller of a query: a failed derivation bypasses
/// the cache, a failed read is treated as a miss and a failed write is
/// dropped. Execution errors are not represented here, they are returned to
/// the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("hash function failed: {0}")]
    Hash(#[source] BoxError),

    #[error("cache get failed: {0}")]
    CacheGet(#[source] BoxError),

    #[error("cache set failed: {0}")]
    CacheSet(#[source] BoxError),
}
