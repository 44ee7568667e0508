use super::backend::StorageBackend;
use super::envelope::{StorageEnvelope, SCHEMA_VERSION};
use super::keys::{self, NAMESPACE};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const DEFAULT_CAPACITY_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// Capacity reported by `usage()`. The medium enforces its own quota.
    pub capacity_bytes: usize,
    /// Backups left in place by the cleanup pass that runs under quota pressure.
    pub pressure_keep_backups: usize,
    pub schema_version: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            pressure_keep_backups: 2,
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub used: usize,
    pub capacity: usize,
    pub percentage: f64,
}

/// Emitted after every successful mutation of a managed key.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageEvent {
    Saved {
        key: String,
        data: Value,
        timestamp: i64,
    },
    Removed {
        key: String,
    },
    Cleared,
}

/// A loaded value together with the envelope metadata it was stored with.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub data: T,
    pub version: String,
    pub timestamp: i64,
}

type Listener = Box<dyn Fn(&StorageEvent)>;

/// Integrity-checked key-value store over a [`StorageBackend`].
///
/// Values are wrapped in a [`StorageEnvelope`] on save and verified on load. Failures
/// never escape as errors from `save`/`load`/`remove`/`clear`: they are logged and
/// reported as `false`/`None`. Use [`KvStore::try_save`] to get the error itself.
///
/// There are no cross-key transactions: two `save` calls are two independent writes.
pub struct KvStore<B: StorageBackend> {
    backend: B,
    settings: StoreSettings,
    clock: Rc<dyn Clock>,
    listeners: RefCell<Vec<Listener>>,
}

impl<B: StorageBackend> KvStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            settings: StoreSettings::default(),
            clock: Rc::new(SystemClock),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn with_settings(mut self, settings: StoreSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The medium key a managed key is stored under.
    pub fn raw_key(&self, key: &str) -> String {
        format!("{}{}", NAMESPACE, key)
    }

    /// Register a listener for storage events.
    ///
    /// Listeners run synchronously after the write and must not call back into
    /// `subscribe` or write to the store.
    pub fn subscribe(&self, listener: impl Fn(&StorageEvent) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    fn emit(&self, event: &StorageEvent) {
        for listener in self.listeners.borrow().iter() {
            listener(event);
        }
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.try_save(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "save failed, previous value kept");
                false
            }
        }
    }

    /// Save `value` under `key`, reporting why a write failed.
    ///
    /// A write that exceeds the quota triggers one cleanup pass and one retry.
    pub fn try_save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let data = serde_json::to_value(value)?;
        let timestamp = self.now().timestamp_millis();
        let envelope = StorageEnvelope::seal(data, &self.settings.schema_version, timestamp)?;
        let serialized = serde_json::to_string(&envelope)?;
        let raw_key = self.raw_key(key);

        match self.backend.set_item(&raw_key, &serialized) {
            Ok(()) => {}
            Err(e) if e.is_quota_exceeded() => {
                warn!(key, error = %e, "quota exceeded, reclaiming space before retry");
                self.reclaim_space();
                self.backend.set_item(&raw_key, &serialized)?;
            }
            Err(e) => return Err(e),
        }

        debug!(key, bytes = serialized.len(), "saved");
        self.emit(&StorageEvent::Saved {
            key: key.to_string(),
            data: envelope.data,
            timestamp,
        });
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.load_with_meta(key).map(|loaded| loaded.data)
    }

    /// Load a value along with its stored version and timestamp.
    ///
    /// Values written under another schema version are still returned; callers compare
    /// `version` to decide whether to migrate.
    pub fn load_with_meta<T: DeserializeOwned>(&self, key: &str) -> Option<Loaded<T>> {
        let envelope = self.load_envelope(key)?;
        if envelope.version != self.settings.schema_version {
            debug!(
                key,
                stored = %envelope.version,
                current = %self.settings.schema_version,
                "loading value written by another schema version"
            );
        }
        match serde_json::from_value(envelope.data) {
            Ok(data) => Some(Loaded {
                data,
                version: envelope.version,
                timestamp: envelope.timestamp,
            }),
            Err(e) => {
                warn!(key, error = %e, "stored value does not match the requested type");
                None
            }
        }
    }

    /// Load and verify the envelope stored under `key`.
    ///
    /// A corrupted entry (bad checksum or unreadable envelope) is removed and reported
    /// as absent.
    pub fn load_envelope(&self, key: &str) -> Option<StorageEnvelope<Value>> {
        let raw_key = self.raw_key(key);
        let raw = match self.backend.get_item(&raw_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "read failed");
                return None;
            }
        };

        match serde_json::from_str::<StorageEnvelope<Value>>(&raw) {
            Ok(envelope) if envelope.verify() => Some(envelope),
            Ok(_) => {
                warn!(key, "checksum mismatch, discarding corrupted entry");
                self.discard(key);
                None
            }
            Err(e) => {
                warn!(key, error = %e, "unreadable entry, discarding");
                self.discard(key);
                None
            }
        }
    }

    fn discard(&self, key: &str) {
        match self.backend.remove_item(&self.raw_key(key)) {
            Ok(()) => self.emit(&StorageEvent::Removed {
                key: key.to_string(),
            }),
            Err(e) => warn!(key, error = %e, "failed to remove corrupted entry"),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        matches!(self.backend.get_item(&self.raw_key(key)), Ok(Some(_)))
    }

    /// The raw stored text for `key`, envelope included.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.backend.get_item(&self.raw_key(key)).ok().flatten()
    }

    pub fn remove(&self, key: &str) -> bool {
        match self.backend.remove_item(&self.raw_key(key)) {
            Ok(()) => {
                debug!(key, "removed");
                self.emit(&StorageEvent::Removed {
                    key: key.to_string(),
                });
                true
            }
            Err(e) => {
                warn!(key, error = %e, "remove failed");
                false
            }
        }
    }

    /// Remove every managed key. Keys outside the namespace are left alone.
    pub fn clear(&self) -> bool {
        let mut ok = true;
        for key in self.keys() {
            if let Err(e) = self.backend.remove_item(&self.raw_key(&key)) {
                warn!(key = %key, error = %e, "remove failed during clear");
                ok = false;
            }
        }
        if ok {
            info!("store cleared");
            self.emit(&StorageEvent::Cleared);
        }
        ok
    }

    /// Managed keys, namespace stripped, in medium order.
    pub fn keys(&self) -> Vec<String> {
        match self.backend.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|k| k.strip_prefix(NAMESPACE).map(str::to_string))
                .collect(),
            Err(e) => {
                warn!(error = %e, "listing keys failed");
                Vec::new()
            }
        }
    }

    /// Stored size in bytes of the value under `key`.
    pub fn entry_size(&self, key: &str) -> Option<usize> {
        self.raw(key).map(|raw| raw.len())
    }

    pub fn usage(&self) -> StorageUsage {
        let used: usize = self
            .keys()
            .iter()
            .filter_map(|key| self.entry_size(key))
            .sum();
        let capacity = self.settings.capacity_bytes;
        let percentage = if capacity == 0 {
            100.0
        } else {
            used as f64 / capacity as f64 * 100.0
        };
        StorageUsage {
            used,
            capacity,
            percentage,
        }
    }

    /// Backup keys, newest first.
    pub fn backup_keys(&self) -> Vec<String> {
        let mut backups: Vec<(DateTime<Utc>, String)> = self
            .keys()
            .into_iter()
            .filter_map(|key| keys::parse_backup_key(&key).map(|at| (at, key)))
            .collect();
        backups.sort_by(|a, b| b.0.cmp(&a.0));
        backups.into_iter().map(|(_, key)| key).collect()
    }

    /// Cleanup pass used under quota pressure.
    ///
    /// Drops entries that fail integrity checks, then evicts the oldest backups until
    /// at most `pressure_keep_backups` remain. Returns the number of bytes freed.
    pub fn reclaim_space(&self) -> usize {
        let mut freed = 0;

        for key in self.keys() {
            let Some(raw) = self.raw(&key) else {
                continue;
            };
            let intact = serde_json::from_str::<StorageEnvelope<Value>>(&raw)
                .map(|env| env.verify())
                .unwrap_or(false);
            if !intact {
                self.discard(&key);
                freed += raw.len();
            }
        }

        for key in self
            .backup_keys()
            .into_iter()
            .skip(self.settings.pressure_keep_backups)
        {
            let size = self.entry_size(&key).unwrap_or(0);
            if self.remove(&key) {
                freed += size;
            }
        }

        info!(freed, "reclaimed storage space");
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::mem_backend::MemBackend;
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    fn make_store() -> KvStore<MemBackend> {
        KvStore::new(MemBackend::new()).with_clock(Rc::new(ManualClock::default()))
    }

    #[test]
    fn test_save_then_load_returns_equal_value() {
        let store = make_store();
        assert!(store.save("k", &json!({"x": 1})));
        assert_eq!(store.load::<Value>("k"), Some(json!({"x": 1})));
    }

    #[test]
    fn test_load_missing_key_is_absent() {
        let store = make_store();
        assert_eq!(store.load::<Value>("nope"), None);
    }

    #[test]
    fn test_raw_entry_is_namespaced_envelope() {
        let store = make_store();
        store.save("k", &vec![1, 2, 3]);

        let raw = store.backend().get_item("folio:k").unwrap().unwrap();
        let envelope: StorageEnvelope<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(envelope.version, SCHEMA_VERSION);
        assert_eq!(envelope.timestamp, store.now().timestamp_millis());
        assert!(envelope.verify());
    }

    #[test]
    fn test_corrupted_entry_is_discarded() {
        let store = make_store();
        store.save("k", &json!({"x": 1}));

        let raw = store.raw("k").unwrap();
        let tampered = raw.replace(r#""x":1"#, r#""x":2"#);
        assert_ne!(raw, tampered);
        store.backend().set_item("folio:k", &tampered).unwrap();

        assert_eq!(store.load::<Value>("k"), None);
        assert!(!store.contains("k"));
    }

    #[test]
    fn test_unparsable_entry_is_discarded() {
        let store = make_store();
        store.backend().set_item("folio:k", "{not json").unwrap();
        assert_eq!(store.load::<Value>("k"), None);
        assert!(!store.contains("k"));
    }

    #[test]
    fn test_type_mismatch_is_absent_but_kept() {
        let store = make_store();
        store.save("k", &"text");
        assert_eq!(store.load::<Vec<u32>>("k"), None);
        assert!(store.contains("k"));
    }

    #[test]
    fn test_other_schema_version_still_loads() {
        let old = KvStore::new(MemBackend::new()).with_settings(StoreSettings {
            schema_version: "0.9.0".to_string(),
            ..Default::default()
        });
        old.save("k", &5);
        let raw = old.raw("k").unwrap();

        let store = make_store();
        store.backend().set_item("folio:k", &raw).unwrap();
        let loaded = store.load_with_meta::<u32>("k").unwrap();
        assert_eq!(loaded.data, 5);
        assert_eq!(loaded.version, "0.9.0");
    }

    #[test]
    fn test_failed_write_keeps_previous_value() {
        let store = make_store();
        store.save("k", &1);
        store.backend().set_simulate_write_error(true);
        assert!(!store.save("k", &2));
        store.backend().set_simulate_write_error(false);
        assert_eq!(store.load::<u32>("k"), Some(1));
    }

    #[test]
    fn test_clear_leaves_foreign_keys() {
        let store = make_store();
        store.save("a", &1);
        store.save("b", &2);
        store.backend().set_item("other-app", "keep me").unwrap();

        assert!(store.clear());
        assert!(store.keys().is_empty());
        assert_eq!(
            store.backend().get_item("other-app").unwrap().as_deref(),
            Some("keep me")
        );
    }

    #[test]
    fn test_usage_counts_managed_values_only() {
        let store = make_store();
        store.backend().set_item("other-app", "xxxxxxxxxx").unwrap();
        store.save("a", &"hello");

        let usage = store.usage();
        assert_eq!(usage.used, store.raw("a").unwrap().len());
        assert_eq!(usage.capacity, DEFAULT_CAPACITY_BYTES);
        assert!(usage.percentage > 0.0 && usage.percentage < 1.0);
    }

    #[test]
    fn test_quota_pressure_evicts_old_backups_and_retries() {
        let clock = Rc::new(ManualClock::default());
        let store = KvStore::new(MemBackend::new().with_quota(2000))
            .with_clock(clock.clone())
            .with_settings(StoreSettings {
                pressure_keep_backups: 1,
                ..Default::default()
            });

        let filler = "x".repeat(400);
        for _ in 0..4 {
            clock.advance_millis(1);
            let key = keys::backup_key(store.now());
            assert!(store.save(&key, &filler));
        }
        assert_eq!(store.backup_keys().len(), 4);

        // Does not fit until old backups are evicted
        assert!(store.save("big", &"y".repeat(900)));
        assert_eq!(store.backup_keys().len(), 1);
        assert!(store.load::<String>("big").is_some());
    }

    #[test]
    fn test_quota_failure_after_cleanup_reports_false() {
        let store = KvStore::new(MemBackend::new().with_quota(100));
        assert!(!store.save("big", &"z".repeat(500)));
        assert!(!store.contains("big"));
        let err = store.try_save("big", &"z".repeat(500)).unwrap_err();
        assert!(err.is_quota_exceeded());
    }

    #[test]
    fn test_backup_keys_newest_first() {
        let clock = Rc::new(ManualClock::default());
        let store = KvStore::new(MemBackend::new()).with_clock(clock.clone());
        let mut written = Vec::new();
        for _ in 0..3 {
            clock.advance_millis(10);
            let key = keys::backup_key(store.now());
            store.save(&key, &0);
            written.push(key);
        }
        written.reverse();
        assert_eq!(store.backup_keys(), written);
    }

    #[test]
    fn test_listeners_observe_successful_writes_only() {
        let store = make_store();
        let saves = Rc::new(Cell::new(0));
        let counter = saves.clone();
        store.subscribe(move |event| {
            if matches!(event, StorageEvent::Saved { .. }) {
                counter.set(counter.get() + 1);
            }
        });

        store.save("a", &1);
        store.backend().set_simulate_write_error(true);
        store.save("a", &2);
        assert_eq!(saves.get(), 1);
    }

    #[test]
    fn test_discarding_corrupted_entry_emits_removed() {
        let store = make_store();
        store.save("k", &json!({"x": 1}));
        let removed = Rc::new(RefCell::new(Vec::new()));
        let seen = removed.clone();
        store.subscribe(move |event| {
            if let StorageEvent::Removed { key } = event {
                seen.borrow_mut().push(key.clone());
            }
        });

        store.backend().set_item("folio:k", "{not json").unwrap();
        assert_eq!(store.load::<Value>("k"), None);
        assert_eq!(*removed.borrow(), vec!["k".to_string()]);
    }
}
