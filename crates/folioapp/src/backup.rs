//! # Backup and Restore
//!
//! Whole-state export/import and rotating backups.
//!
//! ## Bundles
//!
//! A [`BackupBundle`] is one JSON object holding every collection this application owns
//! (saved documents, preferences, current draft, template selection) plus a `version` and
//! an `exportedAt` timestamp.
//!
//! ## All or Nothing
//!
//! Imports validate the whole payload before touching the store: it must parse, be an
//! object, carry a non-empty `version` and an RFC 3339 `exportedAt`, and every present
//! collection must have the expected shape. Only then are the collections written, each
//! through its repository. A bundle where nothing could be imported is a failure.
//!
//! ## Rotation
//!
//! Backups live in the store under `backup_<epoch-millis>`. After each successful backup
//! only the newest `keep` (default 5) are kept. When usage is above the high-water mark
//! the store's cleanup pass runs before the write.
//!
//! ## Files
//!
//! Bundles can be written to `folio-backup-<timestamp>.json`, optionally gzip-compressed.
//! Reading detects gzip by its magic bytes.

use crate::error::{FolioError, Result};
use crate::model::{CurrentDraft, Preferences, SavedDocument, TemplateSelection};
use crate::repo::{DocumentRepository, DraftRepository, PreferencesRepository, TemplateRepository};
use crate::store::keys;
use crate::store::{KvStore, StorageBackend};
use chrono::{DateTime, Duration, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const BUNDLE_VERSION: &str = "1.0";
pub const DEFAULT_BACKUPS_KEPT: usize = 5;
pub const DEFAULT_HIGH_USAGE_PERCENT: f64 = 90.0;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupBundle {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<SavedDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_draft: Option<CurrentDraft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateSelection>,
}

/// Which collections an import wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub documents: bool,
    pub preferences: bool,
    pub current_draft: bool,
    pub template: bool,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        [
            self.documents,
            self.preferences,
            self.current_draft,
            self.template,
        ]
        .iter()
        .filter(|written| **written)
        .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupInfo {
    pub key: String,
    pub date: DateTime<Utc>,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackupSettings {
    pub keep: usize,
    pub high_usage_percent: f64,
    /// Minimum age of the newest backup before an automatic one is taken.
    pub auto_interval: Option<Duration>,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            keep: DEFAULT_BACKUPS_KEPT,
            high_usage_percent: DEFAULT_HIGH_USAGE_PERCENT,
            auto_interval: Some(Duration::hours(24)),
        }
    }
}

pub struct BackupManager<B: StorageBackend> {
    kv: Rc<KvStore<B>>,
    documents: DocumentRepository<B>,
    drafts: DraftRepository<B>,
    preferences: PreferencesRepository<B>,
    templates: TemplateRepository<B>,
    settings: BackupSettings,
}

impl<B: StorageBackend> BackupManager<B> {
    pub fn new(kv: Rc<KvStore<B>>, settings: BackupSettings) -> Self {
        Self {
            documents: DocumentRepository::new(kv.clone()),
            drafts: DraftRepository::new(kv.clone()),
            preferences: PreferencesRepository::preferences(kv.clone()),
            templates: TemplateRepository::template(kv.clone()),
            kv,
            settings,
        }
    }

    pub fn settings(&self) -> &BackupSettings {
        &self.settings
    }

    pub fn export_all(&self) -> BackupBundle {
        BackupBundle {
            version: BUNDLE_VERSION.to_string(),
            exported_at: self.kv.now(),
            // Left out rather than exported empty when the stored list does not decode
            documents: self.documents.try_list(),
            preferences: self.preferences.load(),
            current_draft: self.drafts.load_current_draft(),
            template: self.templates.load(),
        }
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_all())?)
    }

    /// Validate and import a serialized bundle.
    pub fn import_json(&self, payload: &str) -> Result<ImportReport> {
        let bundle = parse_bundle(payload)?;
        self.import_bundle(bundle)
    }

    pub fn import_bundle(&self, bundle: BackupBundle) -> Result<ImportReport> {
        if bundle.documents.is_none()
            && bundle.preferences.is_none()
            && bundle.current_draft.is_none()
            && bundle.template.is_none()
        {
            return Err(FolioError::Validation(
                "bundle contains no collections to import".to_string(),
            ));
        }
        if bundle.version != BUNDLE_VERSION {
            debug!(version = %bundle.version, "importing bundle from another version");
        }

        let mut report = ImportReport::default();
        if let Some(docs) = &bundle.documents {
            report.documents = self.documents.replace_all(docs);
        }
        if let Some(prefs) = &bundle.preferences {
            report.preferences = self.preferences.save(prefs);
        }
        if let Some(draft) = &bundle.current_draft {
            report.current_draft = self.drafts.save(draft);
        }
        if let Some(template) = &bundle.template {
            report.template = self.templates.save(template);
        }

        if report.imported() == 0 {
            return Err(FolioError::Store(
                "no collection from the bundle could be written".to_string(),
            ));
        }
        info!(imported = report.imported(), "bundle imported");
        Ok(report)
    }

    /// Take a backup of the current state. Returns its key, or None if it could not be
    /// written.
    pub fn create_backup(&self) -> Option<String> {
        let bundle = self.export_all();

        let usage = self.kv.usage();
        if usage.percentage > self.settings.high_usage_percent {
            warn!(
                percentage = usage.percentage,
                "storage usage high, reclaiming space before backup"
            );
            self.kv.reclaim_space();
        }

        let mut at = self.kv.now();
        let mut key = keys::backup_key(at);
        while self.kv.contains(&key) {
            at += Duration::milliseconds(1);
            key = keys::backup_key(at);
        }

        if !self.kv.save(&key, &bundle) {
            warn!(key = %key, "backup could not be written");
            return None;
        }
        info!(key = %key, "backup created");
        self.rotate();
        Some(key)
    }

    fn rotate(&self) {
        for key in self.kv.backup_keys().into_iter().skip(self.settings.keep) {
            debug!(key = %key, "rotating out old backup");
            self.kv.remove(&key);
        }
    }

    /// Take a backup when the newest one is older than the configured interval.
    pub fn auto_backup_if_due(&self) -> Option<String> {
        let interval = self.settings.auto_interval?;
        let due = match self.latest_backup_at() {
            Some(latest) => self.kv.now() - latest >= interval,
            None => true,
        };
        if due {
            self.create_backup()
        } else {
            None
        }
    }

    pub fn latest_backup_at(&self) -> Option<DateTime<Utc>> {
        self.kv
            .backup_keys()
            .first()
            .and_then(|key| keys::parse_backup_key(key))
    }

    /// Restore the backup stored under `key`.
    ///
    /// Ok(false) means there is no such backup. Malformed keys and bundles are errors and
    /// leave the store untouched.
    pub fn restore_backup(&self, key: &str) -> Result<bool> {
        if !keys::is_backup_key(key) {
            return Err(FolioError::Validation(format!(
                "'{}' is not a backup key (expected {}<timestamp>)",
                key,
                keys::BACKUP_PREFIX
            )));
        }
        let Some(envelope) = self.kv.load_envelope(key) else {
            return Ok(false);
        };
        let bundle = bundle_from_value(envelope.data)?;
        self.import_bundle(bundle)?;
        info!(key, "backup restored");
        Ok(true)
    }

    /// Backups, newest first.
    pub fn list_backups(&self) -> Vec<BackupInfo> {
        self.kv
            .backup_keys()
            .into_iter()
            .filter_map(|key| {
                let date = keys::parse_backup_key(&key)?;
                let size = self.kv.entry_size(&key)?;
                Some(BackupInfo { key, date, size })
            })
            .collect()
    }

    pub fn delete_backup(&self, key: &str) -> bool {
        if !keys::is_backup_key(key) || !self.kv.contains(key) {
            return false;
        }
        self.kv.remove(key)
    }

    /// Write the current state to a timestamped file in `dir`.
    pub fn export_to_file(&self, dir: &Path, compress: bool) -> Result<PathBuf> {
        let json = self.export_json()?;
        let filename = format!(
            "folio-backup-{}.json{}",
            self.kv.now().format("%Y-%m-%d_%H-%M-%S"),
            if compress { ".gz" } else { "" }
        );
        let path = dir.join(filename);
        let file = File::create(&path).map_err(FolioError::Io)?;

        if compress {
            let mut enc = GzEncoder::new(file, Compression::default());
            enc.write_all(json.as_bytes()).map_err(FolioError::Io)?;
            enc.finish().map_err(FolioError::Io)?;
        } else {
            let mut file = file;
            file.write_all(json.as_bytes()).map_err(FolioError::Io)?;
        }
        info!(path = %path.display(), "exported bundle");
        Ok(path)
    }

    pub fn import_from_file(&self, path: &Path) -> Result<ImportReport> {
        let payload = read_bundle_file(path)?;
        self.import_json(&payload)
    }
}

/// Read a bundle file, inflating it if it is gzip-compressed.
pub fn read_bundle_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(FolioError::Io)?;
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut text = String::new();
        GzDecoder::new(&bytes[..])
            .read_to_string(&mut text)
            .map_err(|e| FolioError::Validation(format!("corrupt compressed bundle: {}", e)))?;
        Ok(text)
    } else {
        String::from_utf8(bytes)
            .map_err(|e| FolioError::Validation(format!("bundle is not UTF-8 text: {}", e)))
    }
}

/// Parse and validate a serialized bundle without touching any store.
pub fn parse_bundle(payload: &str) -> Result<BackupBundle> {
    if payload.trim().is_empty() {
        return Err(FolioError::Validation("import payload is empty".to_string()));
    }
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| FolioError::Validation(format!("import payload is not valid JSON: {}", e)))?;
    bundle_from_value(value)
}

fn bundle_from_value(value: Value) -> Result<BackupBundle> {
    let Some(object) = value.as_object() else {
        return Err(FolioError::Validation(
            "bundle must be a JSON object".to_string(),
        ));
    };

    let version_ok = object
        .get("version")
        .and_then(Value::as_str)
        .is_some_and(|v| !v.trim().is_empty());
    if !version_ok {
        return Err(FolioError::Validation(
            "bundle is missing its version".to_string(),
        ));
    }

    let exported_ok = object
        .get("exportedAt")
        .and_then(Value::as_str)
        .is_some_and(|at| DateTime::parse_from_rfc3339(at).is_ok());
    if !exported_ok {
        return Err(FolioError::Validation(
            "bundle is missing a valid exportedAt timestamp".to_string(),
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| FolioError::Validation(format!("bundle has malformed collections: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::ResumeDocument;
    use crate::store::MemBackend;

    struct Setup {
        clock: Rc<ManualClock>,
        kv: Rc<KvStore<MemBackend>>,
        backups: BackupManager<MemBackend>,
    }

    fn setup() -> Setup {
        let clock = Rc::new(ManualClock::default());
        let kv = Rc::new(KvStore::new(MemBackend::new()).with_clock(clock.clone()));
        let backups = BackupManager::new(kv.clone(), BackupSettings::default());
        Setup { clock, kv, backups }
    }

    fn seed_document(s: &Setup, name: &str) -> SavedDocument {
        let doc = SavedDocument::new(name, "modern", ResumeDocument::default(), s.kv.now());
        DocumentRepository::new(s.kv.clone()).upsert(doc.clone());
        doc
    }

    #[test]
    fn test_export_import_restores_collections() {
        let s = setup();
        let doc = seed_document(&s, "CV");
        PreferencesRepository::preferences(s.kv.clone()).save(&Preferences::default());
        let exported = s.backups.export_json().unwrap();

        let other = setup();
        let report = other.backups.import_json(&exported).unwrap();
        assert!(report.documents);
        assert!(report.preferences);
        assert!(!report.current_draft);
        assert_eq!(report.imported(), 2);
        assert_eq!(
            DocumentRepository::new(other.kv.clone()).list(),
            vec![doc]
        );
    }

    #[test]
    fn test_export_omits_undecodable_documents() {
        let s = setup();
        let legacy = serde_json::json!([{ "id": "old-1", "name": "Keep me" }]);
        assert!(s.kv.save(keys::DOCUMENTS, &legacy));
        PreferencesRepository::preferences(s.kv.clone()).save(&Preferences::default());

        let bundle = s.backups.export_all();
        assert!(bundle.documents.is_none());
        assert!(bundle.preferences.is_some());

        // Restoring that bundle leaves the stored list alone
        let key = s.backups.create_backup().unwrap();
        assert!(s.backups.restore_backup(&key).unwrap());
        let stored: Value = s.kv.load(keys::DOCUMENTS).unwrap();
        assert_eq!(stored, legacy);
    }

    #[test]
    fn test_import_missing_version_changes_nothing() {
        let s = setup();
        let doc = seed_document(&s, "Existing");
        let payload = r#"{"exportedAt":"2024-01-01T00:00:00Z","documents":[]}"#;

        let err = s.backups.import_json(payload).unwrap_err();
        assert!(matches!(err, FolioError::Validation(_)));
        assert_eq!(DocumentRepository::new(s.kv.clone()).list(), vec![doc]);
    }

    #[test]
    fn test_import_rejects_malformed_payloads() {
        let s = setup();
        for payload in [
            "",
            "not json",
            "[1,2]",
            r#"{"version":"1.0"}"#,
            r#"{"version":"1.0","exportedAt":"yesterday"}"#,
            r#"{"version":"","exportedAt":"2024-01-01T00:00:00Z","documents":[]}"#,
            r#"{"version":"1.0","exportedAt":"2024-01-01T00:00:00Z","documents":"oops"}"#,
        ] {
            assert!(
                matches!(s.backups.import_json(payload), Err(FolioError::Validation(_))),
                "payload should be rejected: {payload:?}"
            );
        }
    }

    #[test]
    fn test_import_with_no_collections_fails() {
        let s = setup();
        let err = s
            .backups
            .import_json(r#"{"version":"1.0","exportedAt":"2024-01-01T00:00:00Z"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("no collections"));
    }

    #[test]
    fn test_rotation_keeps_five_newest_first() {
        let s = setup();
        let mut created = Vec::new();
        for _ in 0..7 {
            s.clock.advance_millis(1_000);
            created.push(s.backups.create_backup().unwrap());
        }

        let listed = s.backups.list_backups();
        assert_eq!(listed.len(), 5);
        let keys: Vec<String> = listed.iter().map(|b| b.key.clone()).collect();
        let expected: Vec<String> = created.iter().rev().take(5).cloned().collect();
        assert_eq!(keys, expected);
        assert!(listed.windows(2).all(|w| w[0].date > w[1].date));
        assert!(listed.iter().all(|b| b.size > 0));
    }

    #[test]
    fn test_backups_in_same_millisecond_get_distinct_keys() {
        let s = setup();
        let a = s.backups.create_backup().unwrap();
        let b = s.backups.create_backup().unwrap();
        assert_ne!(a, b);
        assert_eq!(s.backups.list_backups().len(), 2);
    }

    #[test]
    fn test_restore_backup_overwrites_live_collections() {
        let s = setup();
        let original = seed_document(&s, "Before");
        let key = s.backups.create_backup().unwrap();

        let docs = DocumentRepository::new(s.kv.clone());
        docs.delete(&original.id);
        seed_document(&s, "After");

        assert!(s.backups.restore_backup(&key).unwrap());
        assert_eq!(docs.list(), vec![original]);
        // Restoring does not remove backups
        assert_eq!(s.backups.list_backups().len(), 1);
    }

    #[test]
    fn test_restore_unknown_and_malformed_keys() {
        let s = setup();
        assert!(!s.backups.restore_backup("backup_123").unwrap());
        assert!(matches!(
            s.backups.restore_backup("saved_resumes"),
            Err(FolioError::Validation(_))
        ));
    }

    #[test]
    fn test_delete_backup() {
        let s = setup();
        let key = s.backups.create_backup().unwrap();
        assert!(!s.backups.delete_backup("saved_resumes"));
        assert!(s.backups.delete_backup(&key));
        assert!(!s.backups.delete_backup(&key));
    }

    #[test]
    fn test_auto_backup_respects_interval() {
        let s = setup();
        assert!(s.backups.auto_backup_if_due().is_some());
        s.clock.advance(Duration::hours(23));
        assert!(s.backups.auto_backup_if_due().is_none());
        s.clock.advance(Duration::hours(1));
        assert!(s.backups.auto_backup_if_due().is_some());
        assert_eq!(s.backups.list_backups().len(), 2);
    }

    #[test]
    fn test_file_export_roundtrip_plain_and_gzip() {
        let s = setup();
        seed_document(&s, "On disk");
        let dir = tempfile::tempdir().unwrap();

        for compress in [false, true] {
            let path = s.backups.export_to_file(dir.path(), compress).unwrap();
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("folio-backup-"));
            assert_eq!(name.ends_with(".gz"), compress);

            let other = setup();
            let report = other.backups.import_from_file(&path).unwrap();
            assert!(report.documents);
            assert_eq!(DocumentRepository::new(other.kv.clone()).list().len(), 1);
        }
    }
}
