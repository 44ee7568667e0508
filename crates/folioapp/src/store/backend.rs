use crate::error::Result;

/// Abstract interface for the raw storage medium.
///
/// The medium is a synchronous, string-keyed store with a small fixed quota and no
/// transactions. This trait handles the "how" (filesystem vs memory), while
/// [`KvStore`](super::kv::KvStore) handles the "what" (envelopes, integrity, namespacing).
pub trait StorageBackend {
    /// Read the raw value stored under `key`.
    /// Returns Ok(None) if the key does not exist.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    /// MUST leave the previous value untouched on failure, including
    /// `FolioError::QuotaExceeded` when the write would not fit.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// List every key currently present on the medium.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Bytes the medium would hold after replacing `previous` with `next`.
pub(crate) fn projected_usage(current_total: usize, previous: usize, next: usize) -> usize {
    current_total.saturating_sub(previous) + next
}
