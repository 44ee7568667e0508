//! # Command Layer
//!
//! The business operations of folio. Each command is a plain function over a
//! [`Session`](crate::session::Session) that returns a structured [`CmdResult`].
//!
//! ## Role and Responsibilities
//!
//! Commands:
//! - Apply edits to the live draft and record them in history
//! - Save, open, duplicate and delete documents
//! - Navigate history, create and restore backups
//! - Report what they did as leveled [`CmdMessage`]s ("Undone to: Added skill")
//!
//! ## What Commands Do NOT Do
//!
//! - **Any terminal I/O**: no stdout, stderr or formatting
//! - **Argument parsing**: that is the CLI's job
//! - **Exit codes**: they return `Result`, the caller decides
//!
//! ## Outcomes vs Errors
//!
//! An operation that simply did not happen (undo with nothing to undo, delete of a
//! document that is not there) is a normal result with an info or warning message.
//! `Err` is reserved for invalid input (`Validation`, `NotFound` for selectors that match
//! nothing) and failed I/O.
//!
//! ## Testing Strategy
//!
//! Command tests run against `MemBackend` with a `ManualClock`, so they never touch the
//! filesystem and time only moves when a test moves it.
//!
//! ## Command Modules
//!
//! - [`edit`]: structured edits of the live resume
//! - [`documents`]: new, save, open, list, delete, duplicate, rename, template
//! - [`history`]: undo, redo, go to, list, clear, export, import
//! - [`backup`]: create, list, restore, delete, file export and import
//! - [`prefs`]: show and change preferences
//! - [`status`]: storage usage and sync state
//! - [`sync`]: push stored state through the sync queue
//! - [`helpers`]: selector resolution

use crate::backup::BackupInfo;
use crate::model::{CurrentDraft, Preferences, SavedDocument};
use crate::store::StorageUsage;
use crate::sync::DrainReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

pub mod backup;
pub mod documents;
pub mod edit;
pub mod helpers;
pub mod history;
pub mod prefs;
pub mod status;
pub mod sync;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// One history entry as shown to a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryItem {
    pub index: usize,
    pub action: String,
    pub label: String,
    pub timestamp: DateTime<Utc>,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryView {
    pub items: Vec<HistoryItem>,
    pub current_index: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub enabled: bool,
    pub online: bool,
    pub pending: usize,
    pub transport: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub usage: StorageUsage,
    pub documents: usize,
    pub backups: usize,
    pub last_backup: Option<DateTime<Utc>>,
    pub history_entries: usize,
    pub history_position: usize,
    pub editing: Option<String>,
    pub sync: SyncStatus,
}

#[derive(Debug, Default, Serialize)]
pub struct CmdResult {
    pub messages: Vec<CmdMessage>,
    pub documents: Vec<SavedDocument>,
    pub draft: Option<CurrentDraft>,
    pub history: Option<HistoryView>,
    pub backups: Vec<BackupInfo>,
    pub usage: Option<StorageUsage>,
    pub status: Option<StatusReport>,
    pub preferences: Option<Preferences>,
    pub sync: Option<DrainReport>,
    pub paths: Vec<PathBuf>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_documents(mut self, documents: Vec<SavedDocument>) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_draft(mut self, draft: CurrentDraft) -> Self {
        self.draft = Some(draft);
        self
    }

    pub fn with_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.paths = paths;
        self
    }

    pub fn has_level(&self, level: MessageLevel) -> bool {
        self.messages.iter().any(|m| m.level == level)
    }
}
