use super::backend::{projected_usage, StorageBackend};
use crate::error::{FolioError, Result};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// In-memory storage medium.
///
/// Uses `RefCell` for interior mutability since the core is single-threaded.
/// This keeps every `StorageBackend` method on `&self`, like the real medium.
#[derive(Default)]
pub struct MemBackend {
    items: RefCell<BTreeMap<String, String>>,
    quota: Option<usize>,
    simulate_write_error: Cell<bool>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total bytes of stored values, like a browser storage quota.
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.set(simulate);
    }

    /// Total bytes of every stored value.
    pub fn total_bytes(&self) -> usize {
        self.items.borrow().values().map(String::len).sum()
    }
}

impl StorageBackend for MemBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if self.simulate_write_error.get() {
            return Err(FolioError::Store("Simulated write error".to_string()));
        }

        if let Some(quota) = self.quota {
            let previous = self.items.borrow().get(key).map_or(0, String::len);
            let needed = projected_usage(self.total_bytes(), previous, value.len());
            if needed > quota {
                return Err(FolioError::QuotaExceeded {
                    needed,
                    available: quota,
                });
            }
        }

        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.borrow().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let backend = MemBackend::new();
        backend.set_item("a", "1").unwrap();
        assert_eq!(backend.get_item("a").unwrap(), Some("1".to_string()));

        backend.remove_item("a").unwrap();
        assert_eq!(backend.get_item("a").unwrap(), None);
        // Removing twice is fine
        backend.remove_item("a").unwrap();
    }

    #[test]
    fn test_quota_rejects_write_and_keeps_previous_value() {
        let backend = MemBackend::new().with_quota(10);
        backend.set_item("a", "12345").unwrap();

        let err = backend.set_item("a", "12345678901").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(backend.get_item("a").unwrap(), Some("12345".to_string()));
    }

    #[test]
    fn test_quota_counts_replacement_not_addition() {
        let backend = MemBackend::new().with_quota(10);
        backend.set_item("a", "1234567890").unwrap();
        // Replacing with same size fits even though the medium is full
        backend.set_item("a", "0987654321").unwrap();
        assert!(backend.set_item("b", "x").is_err());
    }

    #[test]
    fn test_simulated_write_error() {
        let backend = MemBackend::new();
        backend.set_simulate_write_error(true);
        assert!(backend.set_item("a", "1").is_err());
        backend.set_simulate_write_error(false);
        assert!(backend.set_item("a", "1").is_ok());
    }
}
