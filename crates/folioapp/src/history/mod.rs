//! # Edit History
//!
//! An ordered, bounded log of snapshots of one evolving document, with a cursor that
//! undo, redo and jumps move around.
//!
//! ## Linear Undo
//!
//! ```text
//! entries: [e0, e1, e2, e3]      cursor = 1 (after two undos)
//! append(e4)
//! entries: [e0, e1, e4]          cursor = 2 (e2, e3 discarded)
//! ```
//!
//! Appending while the cursor is not at the tail discards everything after the cursor.
//! `go_to` is pure navigation and never discards.
//!
//! ## Bound
//!
//! The log holds at most `max_entries`. When an append exceeds it the oldest entry is
//! evicted and the new entry stays the tail.
//!
//! ## Snapshots
//!
//! Entries own a clone of the document, so later edits to the live document can never
//! reach back into history.
//!
//! ## Debounced Appends
//!
//! Continuous edits (typing into a text field) go through [`HistoryManager::append_debounced`]:
//! calls inside the debounce window collapse into one entry carrying the most recent
//! arguments. The pending commit lands when [`HistoryManager::poll`] sees the window
//! elapsed, or immediately on [`HistoryManager::flush`]. Any other operation that reads
//! or moves the log flushes first, so a pending edit is never lost or reordered.
//!
//! ## Persistence
//!
//! Every mutation re-persists `{entries, currentIndex}` under `history_<scope>`. A missing
//! or invalid persisted log on [`HistoryManager::initialize`] falls back to a fresh log
//! seeded with the given document.

pub mod debounce;

use crate::error::{FolioError, Result};
use crate::store::keys;
use crate::store::{KvStore, StorageBackend};
use chrono::{DateTime, Duration, Utc};
use debounce::Debouncer;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_ENTRIES: usize = 50;
pub const DEFAULT_DEBOUNCE_MS: i64 = 1000;

pub const ACTION_INIT: &str = "init";
pub const ACTION_CLEAR: &str = "clear";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry<T> {
    pub id: String,
    pub data: T,
    pub timestamp: DateTime<Utc>,
    /// Category label, e.g. "personal-info".
    pub action: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl<T> HistoryEntry<T> {
    /// Human-readable label: the description when present, the action otherwise.
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.action)
    }
}

/// Serialized form of a history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLog<T> {
    pub entries: Vec<HistoryEntry<T>>,
    pub current_index: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryLogRef<'a, T> {
    entries: &'a [HistoryEntry<T>],
    current_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySettings {
    pub max_entries: usize,
    pub debounce: Duration,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            debounce: Duration::milliseconds(DEFAULT_DEBOUNCE_MS),
        }
    }
}

#[derive(Debug)]
struct PendingAppend<T> {
    data: T,
    action: String,
    description: Option<String>,
}

pub struct HistoryManager<T, B: StorageBackend> {
    kv: Rc<KvStore<B>>,
    key: String,
    max_entries: usize,
    entries: Vec<HistoryEntry<T>>,
    current: usize,
    debounce: Debouncer<PendingAppend<T>>,
}

impl<T, B> HistoryManager<T, B>
where
    T: Clone + Serialize + DeserializeOwned,
    B: StorageBackend,
{
    /// Open the history for `scope`, restoring its persisted log when there is a valid
    /// one and seeding a fresh log with `seed` otherwise.
    pub fn initialize(
        kv: Rc<KvStore<B>>,
        scope: &str,
        seed: &T,
        settings: HistorySettings,
    ) -> Self {
        let max_entries = settings.max_entries.max(1);
        let mut manager = Self {
            key: keys::history_key(scope),
            kv,
            max_entries,
            entries: Vec::new(),
            current: 0,
            debounce: Debouncer::new(settings.debounce),
        };

        let restored = manager
            .kv
            .load::<HistoryLog<T>>(&manager.key)
            .map(|log| validate_log(log, max_entries));

        match restored {
            Some(Ok((entries, current))) => {
                debug!(key = %manager.key, entries = entries.len(), current, "restored history");
                manager.entries = entries;
                manager.current = current;
            }
            other => {
                if let Some(Err(e)) = other {
                    warn!(key = %manager.key, error = %e, "persisted history is invalid, reseeding");
                }
                let entry = manager.new_entry(seed.clone(), ACTION_INIT, Some("Initial state"));
                manager.entries.push(entry);
                manager.persist();
            }
        }
        manager
    }

    fn new_entry(&self, data: T, action: &str, description: Option<&str>) -> HistoryEntry<T> {
        HistoryEntry {
            id: Uuid::new_v4().to_string(),
            data,
            timestamp: self.kv.now(),
            action: action.to_string(),
            description: description.map(str::to_string),
        }
    }

    fn persist(&self) -> bool {
        self.kv.save(
            &self.key,
            &HistoryLogRef {
                entries: &self.entries,
                current_index: self.current,
            },
        )
    }

    fn commit(&mut self, data: T, action: &str, description: Option<&str>) -> usize {
        let entry = self.new_entry(data, action, description);
        self.entries.truncate(self.current + 1);
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
        self.current = self.entries.len() - 1;
        debug!(key = %self.key, action, current = self.current, "history entry appended");
        self.persist();
        self.current
    }

    /// Record a snapshot of `data`, discarding any redo branch. Returns the new cursor.
    pub fn append(&mut self, data: &T, action: &str, description: Option<&str>) -> usize {
        self.flush();
        self.commit(data.clone(), action, description)
    }

    /// Schedule a snapshot, collapsing calls made within the debounce window.
    pub fn append_debounced(&mut self, data: &T, action: &str, description: Option<&str>) {
        let now = self.kv.now();
        self.debounce.schedule(
            PendingAppend {
                data: data.clone(),
                action: action.to_string(),
                description: description.map(str::to_string),
            },
            now,
        );
    }

    /// Commit the pending debounced append if its window has elapsed.
    pub fn poll(&mut self) -> bool {
        let now = self.kv.now();
        match self.debounce.take_due(now) {
            Some(pending) => {
                self.commit(pending.data, &pending.action, pending.description.as_deref());
                true
            }
            None => false,
        }
    }

    /// Commit the pending debounced append now.
    pub fn flush(&mut self) -> bool {
        match self.debounce.take() {
            Some(pending) => {
                self.commit(pending.data, &pending.action, pending.description.as_deref());
                true
            }
            None => false,
        }
    }

    pub fn cancel_pending(&mut self) -> bool {
        self.debounce.cancel()
    }

    pub fn has_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn can_undo(&self) -> bool {
        self.current > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current + 1 < self.entries.len()
    }

    pub fn undo(&mut self) -> Option<T> {
        self.flush();
        if !self.can_undo() {
            return None;
        }
        self.current -= 1;
        self.persist();
        Some(self.entries[self.current].data.clone())
    }

    pub fn redo(&mut self) -> Option<T> {
        self.flush();
        if !self.can_redo() {
            return None;
        }
        self.current += 1;
        self.persist();
        Some(self.entries[self.current].data.clone())
    }

    /// Move the cursor to `index` without discarding anything.
    pub fn go_to(&mut self, index: usize) -> Option<T> {
        self.flush();
        if index >= self.entries.len() {
            return None;
        }
        self.current = index;
        self.persist();
        Some(self.entries[index].data.clone())
    }

    /// Drop all entries and reseed with `live`, the document as it is now.
    pub fn clear(&mut self, live: &T) {
        self.debounce.cancel();
        let entry = self.new_entry(live.clone(), ACTION_CLEAR, Some("History cleared"));
        self.entries = vec![entry];
        self.current = 0;
        info!(key = %self.key, "history cleared");
        self.persist();
    }

    pub fn export_log(&mut self) -> Result<String> {
        self.flush();
        Ok(serde_json::to_string_pretty(&HistoryLogRef {
            entries: &self.entries,
            current_index: self.current,
        })?)
    }

    /// Replace the log with a previously exported one.
    ///
    /// Nothing changes unless the whole log validates.
    pub fn import_log(&mut self, serialized: &str) -> Result<()> {
        if serialized.trim().is_empty() {
            return Err(FolioError::Validation("history log is empty".to_string()));
        }
        let log: HistoryLog<T> = serde_json::from_str(serialized)
            .map_err(|e| FolioError::Validation(format!("malformed history log: {}", e)))?;
        let (entries, current) = validate_log(log, self.max_entries)?;

        self.debounce.cancel();
        self.entries = entries;
        self.current = current;
        info!(key = %self.key, entries = self.entries.len(), "history imported");
        self.persist();
        Ok(())
    }

    pub fn entries(&self) -> &[HistoryEntry<T>] {
        &self.entries
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &HistoryEntry<T> {
        &self.entries[self.current]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a manager holds at least one entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

/// Check a log and trim it to `max_entries`, keeping the most recent entries.
fn validate_log<T>(
    log: HistoryLog<T>,
    max_entries: usize,
) -> Result<(Vec<HistoryEntry<T>>, usize)> {
    let HistoryLog {
        mut entries,
        current_index,
    } = log;

    if entries.is_empty() {
        return Err(FolioError::Validation(
            "history log has no entries".to_string(),
        ));
    }
    if current_index >= entries.len() {
        return Err(FolioError::Validation(format!(
            "history cursor {} is out of range for {} entries",
            current_index,
            entries.len()
        )));
    }

    let mut current = current_index;
    if entries.len() > max_entries {
        let excess = entries.len() - max_entries;
        entries.drain(..excess);
        current = current.saturating_sub(excess);
    }
    Ok((entries, current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemBackend;
    use serde_json::{json, Value};

    struct Setup {
        clock: Rc<ManualClock>,
        kv: Rc<KvStore<MemBackend>>,
    }

    fn setup() -> Setup {
        let clock = Rc::new(ManualClock::default());
        let kv = Rc::new(KvStore::new(MemBackend::new()).with_clock(clock.clone()));
        Setup { clock, kv }
    }

    fn open(s: &Setup, max: usize) -> HistoryManager<Value, MemBackend> {
        HistoryManager::initialize(
            s.kv.clone(),
            "draft",
            &json!({"name": "A"}),
            HistorySettings {
                max_entries: max,
                ..Default::default()
            },
        )
    }

    fn datas(h: &HistoryManager<Value, MemBackend>) -> Vec<Value> {
        h.entries().iter().map(|e| e.data.clone()).collect()
    }

    #[test]
    fn test_initialize_seeds_init_entry() {
        let s = setup();
        let h = open(&s, 10);
        assert_eq!(h.len(), 1);
        assert_eq!(h.current().action, ACTION_INIT);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert!(s.kv.contains("history_draft"));
    }

    #[test]
    fn test_append_on_branch_truncates_future() {
        let s = setup();
        let mut h = open(&s, 10);
        h.append(&json!(1), "a", None);
        h.append(&json!(2), "a", None);
        h.append(&json!(3), "a", None);
        h.go_to(1);

        let cursor = h.append(&json!(4), "a", None);
        assert_eq!(cursor, 2);
        assert_eq!(datas(&h), vec![json!({"name": "A"}), json!(1), json!(4)]);
        assert!(!h.can_redo());
    }

    #[test]
    fn test_bound_keeps_most_recent_entries() {
        let s = setup();
        let n = 5;
        let mut h = open(&s, n);
        for i in 0..(n + 5) {
            h.append(&json!(i), "a", None);
        }
        assert_eq!(h.len(), n);
        assert_eq!(datas(&h), (5..10).map(|i| json!(i)).collect::<Vec<_>>());
        assert_eq!(h.current_index(), n - 1);
    }

    #[test]
    fn test_undo_redo_inverse() {
        let s = setup();
        let mut h = open(&s, 20);
        for i in 0..6 {
            h.append(&json!(i), "a", None);
        }
        let before_index = h.current_index();
        let before_data = h.current().data.clone();

        let mut undos = 0;
        while h.can_undo() {
            assert!(h.undo().is_some());
            undos += 1;
        }
        assert_eq!(h.undo(), None);
        for _ in 0..undos {
            assert!(h.redo().is_some());
        }
        assert_eq!(h.redo(), None);
        assert_eq!(h.current_index(), before_index);
        assert_eq!(h.current().data, before_data);
    }

    #[test]
    fn test_end_to_end_branching_scenario() {
        let s = setup();
        let mut h = open(&s, 50);
        let d1 = json!({"name": "A", "email": "a@x"});
        let d2 = json!({"name": "A", "jobs": 1});
        let d3 = json!({"name": "A", "skills": ["rust"]});

        h.append(&d1, "personal-info", None);
        h.append(&d2, "experience", None);
        assert_eq!(h.undo(), Some(d1.clone()));
        h.append(&d3, "skills", None);

        assert_eq!(datas(&h), vec![json!({"name": "A"}), d1, d3]);
        assert_eq!(h.redo(), None);
        assert_eq!(h.current_index(), 2);
    }

    #[test]
    fn test_go_to_out_of_range_is_noop() {
        let s = setup();
        let mut h = open(&s, 10);
        h.append(&json!(1), "a", None);
        assert_eq!(h.go_to(7), None);
        assert_eq!(h.current_index(), 1);
        assert_eq!(h.go_to(0), Some(json!({"name": "A"})));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn test_snapshots_do_not_alias_live_document() {
        let s = setup();
        let mut h = open(&s, 10);
        let mut live = json!({"skills": ["a"]});
        h.append(&live, "skills", None);
        live["skills"][0] = json!("changed");
        assert_eq!(h.current().data, json!({"skills": ["a"]}));
    }

    #[test]
    fn test_debounced_appends_collapse_to_last() {
        let s = setup();
        let mut h = open(&s, 10);
        h.append_debounced(&json!("J"), "personal-info", Some("typing"));
        s.clock.advance_millis(300);
        h.append_debounced(&json!("Jo"), "personal-info", Some("typing"));
        s.clock.advance_millis(300);
        h.append_debounced(&json!("Joe"), "personal-info", Some("Updated name"));

        s.clock.advance_millis(999);
        assert!(!h.poll());
        assert_eq!(h.len(), 1);

        s.clock.advance_millis(1);
        assert!(h.poll());
        assert_eq!(h.len(), 2);
        assert_eq!(h.current().data, json!("Joe"));
        assert_eq!(h.current().label(), "Updated name");
        assert!(!h.has_pending());
    }

    #[test]
    fn test_undo_flushes_pending_first() {
        let s = setup();
        let mut h = open(&s, 10);
        h.append_debounced(&json!("typed"), "personal-info", None);
        // The pending edit lands, then the undo steps back over it
        assert_eq!(h.undo(), Some(json!({"name": "A"})));
        assert_eq!(h.len(), 2);
        assert!(h.can_redo());
    }

    #[test]
    fn test_cancel_pending_drops_edit() {
        let s = setup();
        let mut h = open(&s, 10);
        h.append_debounced(&json!("x"), "a", None);
        assert!(h.cancel_pending());
        assert!(!h.flush());
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_clear_reseeds_with_live_data() {
        let s = setup();
        let mut h = open(&s, 10);
        h.append(&json!(1), "a", None);
        h.append(&json!(2), "a", None);
        h.clear(&json!(2));
        assert_eq!(h.len(), 1);
        assert_eq!(h.current().action, ACTION_CLEAR);
        assert_eq!(h.current().data, json!(2));
        assert!(!h.can_undo());
    }

    #[test]
    fn test_reopen_restores_entries_and_cursor() {
        let s = setup();
        {
            let mut h = open(&s, 10);
            h.append(&json!(1), "a", None);
            h.append(&json!(2), "a", None);
            h.undo();
        }
        let h = open(&s, 10);
        assert_eq!(h.len(), 3);
        assert_eq!(h.current_index(), 1);
        assert_eq!(h.current().data, json!(1));
    }

    #[test]
    fn test_reopen_with_smaller_bound_trims_oldest() {
        let s = setup();
        {
            let mut h = open(&s, 10);
            for i in 0..5 {
                h.append(&json!(i), "a", None);
            }
        }
        let h = open(&s, 3);
        assert_eq!(datas(&h), vec![json!(2), json!(3), json!(4)]);
        assert_eq!(h.current_index(), 2);
    }

    #[test]
    fn test_corrupted_persisted_log_falls_back_to_seed() {
        let s = setup();
        {
            let mut h = open(&s, 10);
            h.append(&json!(1), "a", None);
        }
        s.kv.backend()
            .set_item("folio:history_draft", "garbage")
            .unwrap();

        let h = open(&s, 10);
        assert_eq!(h.len(), 1);
        assert_eq!(h.current().action, ACTION_INIT);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let s = setup();
        let mut h = open(&s, 10);
        h.append(&json!(1), "a", Some("one"));
        h.append(&json!(2), "b", Some("two"));
        h.undo();
        let exported = h.export_log().unwrap();

        let other = Setup {
            clock: s.clock.clone(),
            kv: Rc::new(KvStore::new(MemBackend::new()).with_clock(s.clock.clone())),
        };
        let mut fresh = open(&other, 10);
        fresh.import_log(&exported).unwrap();
        assert_eq!(fresh.entries(), h.entries());
        assert_eq!(fresh.current_index(), 1);
    }

    #[test]
    fn test_import_rejects_invalid_logs_without_change() {
        let s = setup();
        let mut h = open(&s, 10);
        h.append(&json!(1), "a", None);

        assert!(matches!(
            h.import_log("   "),
            Err(FolioError::Validation(_))
        ));
        assert!(matches!(
            h.import_log("{\"entries\": 3}"),
            Err(FolioError::Validation(_))
        ));
        assert!(matches!(
            h.import_log(r#"{"entries": [], "currentIndex": 0}"#),
            Err(FolioError::Validation(_))
        ));

        let mut exported: Value = serde_json::from_str(&h.export_log().unwrap()).unwrap();
        exported["currentIndex"] = json!(9);
        assert!(h.import_log(&exported.to_string()).is_err());

        assert_eq!(h.len(), 2);
        assert_eq!(h.current_index(), 1);
    }
}
