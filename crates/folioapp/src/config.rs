//! # Configuration
//!
//! Folio configuration is loaded with [`clapfig`] from layered sources.
//!
//! ## Resolution Order
//!
//! 1. **Environment variables**: `FOLIO__HISTORY_MAX_ENTRIES`, `FOLIO__SYNC_ENABLED`, etc.
//! 2. **Data directory config**: `<data dir>/folio.toml`.
//! 3. **Compiled defaults**: `#[config(default = ...)]`.
//!
//! A config that fails to load (bad TOML, wrong types) is reported and the compiled
//! defaults are used instead; a broken settings file never locks the user out of their
//! documents.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `capacity_bytes` | `5242880` | Capacity used for usage reporting |
//! | `history_max_entries` | `50` | Entries kept per history log |
//! | `history_debounce_ms` | `1000` | Window for collapsing continuous edits |
//! | `backups_kept` | `5` | Rotating backups kept |
//! | `high_usage_percent` | `90.0` | Usage above which backups clean up first |
//! | `pressure_keep_backups` | `2` | Backups kept by the quota cleanup pass |
//! | `auto_backup_hours` | `24` | Age of the newest backup before saving takes another (0 disables) |
//! | `sync_enabled` | `false` | Enqueue saves for sync |
//! | `sync_dir` | unset | Mirror synced items into this directory |

use crate::backup::{BackupSettings, DEFAULT_BACKUPS_KEPT, DEFAULT_HIGH_USAGE_PERCENT};
use crate::error::{FolioError, Result};
use crate::history::{HistorySettings, DEFAULT_DEBOUNCE_MS, DEFAULT_MAX_ENTRIES};
use crate::store::kv::DEFAULT_CAPACITY_BYTES;
use crate::store::{StoreSettings, SCHEMA_VERSION};
use chrono::Duration;
use clapfig::{Clapfig, SearchMode, SearchPath};
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CONFIG_FILE_NAME: &str = "folio.toml";

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FolioConfig {
    /// Capacity of the storage medium in bytes, used for usage reporting.
    #[config(default = 5242880)]
    pub capacity_bytes: usize,

    /// Maximum number of entries kept in each history log.
    #[config(default = 50)]
    pub history_max_entries: usize,

    /// Debounce window for continuous edits, in milliseconds.
    #[config(default = 1000)]
    pub history_debounce_ms: u64,

    /// Number of rotating backups kept.
    #[config(default = 5)]
    pub backups_kept: usize,

    /// Usage percentage above which creating a backup cleans up first.
    #[config(default = 90.0)]
    pub high_usage_percent: f64,

    /// Backups left in place when a write runs out of space.
    #[config(default = 2)]
    pub pressure_keep_backups: usize,

    /// Hours between automatic backups. 0 disables them.
    #[config(default = 24)]
    pub auto_backup_hours: u64,

    #[config(default = false)]
    pub sync_enabled: bool,

    /// Directory that synced items are mirrored into.
    pub sync_dir: Option<PathBuf>,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            history_max_entries: DEFAULT_MAX_ENTRIES,
            history_debounce_ms: DEFAULT_DEBOUNCE_MS as u64,
            backups_kept: DEFAULT_BACKUPS_KEPT,
            high_usage_percent: DEFAULT_HIGH_USAGE_PERCENT,
            pressure_keep_backups: 2,
            auto_backup_hours: 24,
            sync_enabled: false,
            sync_dir: None,
        }
    }
}

impl FolioConfig {
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            capacity_bytes: self.capacity_bytes,
            pressure_keep_backups: self.pressure_keep_backups,
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }

    pub fn history_settings(&self) -> HistorySettings {
        HistorySettings {
            max_entries: self.history_max_entries.max(1),
            debounce: Duration::milliseconds(self.history_debounce_ms as i64),
        }
    }

    pub fn backup_settings(&self) -> BackupSettings {
        BackupSettings {
            keep: self.backups_kept.max(1),
            high_usage_percent: self.high_usage_percent,
            auto_interval: match self.auto_backup_hours {
                0 => None,
                hours => Some(Duration::hours(hours as i64)),
            },
        }
    }
}

/// Load the config for a data directory, reporting load errors.
pub fn try_load(data_dir: &Path) -> Result<FolioConfig> {
    Clapfig::builder()
        .app_name("folio")
        .file_name(CONFIG_FILE_NAME)
        .search_paths(vec![SearchPath::Path(data_dir.to_path_buf())])
        .search_mode(SearchMode::Merge)
        .strict(false)
        .load()
        .map_err(|e| FolioError::Config(e.to_string()))
}

/// Load the config for a data directory, falling back to defaults.
pub fn load(data_dir: &Path) -> FolioConfig {
    try_load(data_dir).unwrap_or_else(|e| {
        warn!(error = %e, "could not load config, using defaults");
        FolioConfig::default()
    })
}
