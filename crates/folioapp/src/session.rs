//! # Editing Session
//!
//! The explicit context object the whole application runs on: one store, the
//! repositories over it, the backup manager, the sync queue, and the live draft with its
//! history log. It is built once at startup and handed to every command.
//!
//! ## The Live Draft
//!
//! The session keeps the document being edited in memory and mirrors it into the draft
//! slot on every change, so a restart resumes exactly where editing stopped.
//!
//! ## History Scope
//!
//! Each saved document has its own history log (`history_<id>`). A draft that was never
//! saved uses `history_draft`; the first save moves that log over to the new document.
//!
//! When the restored log does not end where the draft is (an edit made it to the draft
//! slot but not to history), the draft is appended as a recovery entry so undo still
//! starts from what the user sees.

use crate::backup::{BackupManager, BackupSettings};
use crate::history::{HistoryManager, HistorySettings};
use crate::model::{CurrentDraft, ResumeDocument};
use crate::repo::{DocumentRepository, DraftRepository, PreferencesRepository, TemplateRepository};
use crate::store::keys::{self, DRAFT_HISTORY_SCOPE};
use crate::store::{KvStore, StorageBackend};
use crate::sync::SyncQueue;
use std::rc::Rc;
use tracing::{debug, info, warn};

pub const ACTION_RECOVERED: &str = "recovered";

pub struct Session<B: StorageBackend> {
    kv: Rc<KvStore<B>>,
    pub documents: DocumentRepository<B>,
    pub drafts: DraftRepository<B>,
    pub preferences: PreferencesRepository<B>,
    pub templates: TemplateRepository<B>,
    pub backups: BackupManager<B>,
    pub sync: SyncQueue,
    history: HistoryManager<ResumeDocument, B>,
    history_settings: HistorySettings,
    draft: CurrentDraft,
}

impl<B: StorageBackend> Session<B> {
    pub fn open(
        kv: Rc<KvStore<B>>,
        history_settings: HistorySettings,
        backup_settings: BackupSettings,
        sync: SyncQueue,
    ) -> Self {
        sync.attach(&kv);
        let drafts = DraftRepository::new(kv.clone());
        let preferences = PreferencesRepository::preferences(kv.clone());
        let draft = drafts
            .load_current_draft()
            .unwrap_or_else(|| blank_draft(&kv, &preferences.load_or_default().default_template));
        let history = open_history(&kv, &draft, &history_settings);

        Self {
            documents: DocumentRepository::new(kv.clone()),
            templates: TemplateRepository::template(kv.clone()),
            backups: BackupManager::new(kv.clone(), backup_settings),
            drafts,
            preferences,
            sync,
            history,
            history_settings,
            draft,
            kv,
        }
    }

    pub fn kv(&self) -> &Rc<KvStore<B>> {
        &self.kv
    }

    pub fn draft(&self) -> &CurrentDraft {
        &self.draft
    }

    pub fn document(&self) -> &ResumeDocument {
        &self.draft.data
    }

    pub fn history(&self) -> &HistoryManager<ResumeDocument, B> {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryManager<ResumeDocument, B> {
        &mut self.history
    }

    /// History scope of the live draft: its document id, or `draft` when unsaved.
    pub fn history_scope(&self) -> &str {
        self.draft
            .document_id
            .as_deref()
            .unwrap_or(DRAFT_HISTORY_SCOPE)
    }

    /// Replace the live document and persist the draft slot.
    pub fn set_document(&mut self, data: ResumeDocument) -> bool {
        self.draft.data = data;
        self.persist_draft()
    }

    pub fn set_template(&mut self, template_id: &str) -> bool {
        self.draft.template_id = template_id.to_string();
        self.persist_draft()
    }

    fn persist_draft(&mut self) -> bool {
        self.draft.timestamp = self.kv.now();
        self.drafts.save(&self.draft)
    }

    /// Make `draft` the live draft and open its history log.
    pub fn switch_to(&mut self, draft: CurrentDraft) -> bool {
        self.history.flush();
        self.draft = draft;
        let saved = self.persist_draft();
        self.history = open_history(&self.kv, &self.draft, &self.history_settings);
        debug!(scope = self.history_scope(), "switched live draft");
        saved
    }

    /// Start over with an empty document.
    pub fn start_blank(&mut self, template_id: &str) -> bool {
        let draft = blank_draft(&self.kv, template_id);
        let saved = self.switch_to(draft);
        if self.history.len() > 1 {
            self.history.clear(&self.draft.data);
        }
        saved
    }

    /// Bind the live draft to saved document `id`, carrying the unsaved history over.
    pub fn attach_document(&mut self, id: &str) -> bool {
        if self.draft.document_id.as_deref() == Some(id) {
            return true;
        }
        let carried = match self.history.export_log() {
            Ok(log) => Some(log),
            Err(e) => {
                warn!(error = %e, "could not carry history over to the saved document");
                None
            }
        };
        let previous_key = self.history.key().to_string();

        self.draft.document_id = Some(id.to_string());
        let saved = self.persist_draft();
        self.history = HistoryManager::initialize(
            self.kv.clone(),
            id,
            &self.draft.data,
            self.history_settings.clone(),
        );
        if let Some(log) = carried {
            if let Err(e) = self.history.import_log(&log) {
                warn!(error = %e, "carried history was rejected");
            }
        }
        if previous_key == keys::history_key(DRAFT_HISTORY_SCOPE) {
            self.kv.remove(&previous_key);
        }
        info!(id, "draft attached to saved document");
        saved
    }

    /// Detach the live draft from its saved document (the document went away).
    pub fn detach_document(&mut self) -> bool {
        if self.draft.document_id.is_none() {
            return true;
        }
        let mut draft = self.draft.clone();
        draft.document_id = None;
        self.switch_to(draft)
    }

    /// Re-read the draft slot, e.g. after an import replaced it.
    pub fn reload(&mut self) {
        self.history.cancel_pending();
        self.draft = self.drafts.load_current_draft().unwrap_or_else(|| {
            blank_draft(
                &self.kv,
                &self.preferences.load_or_default().default_template,
            )
        });
        self.history = open_history(&self.kv, &self.draft, &self.history_settings);
    }

    /// Commit a pending debounced history entry whose window has elapsed.
    pub fn poll(&mut self) -> bool {
        self.history.poll()
    }

    /// Commit any pending debounced history entry now.
    pub fn flush(&mut self) -> bool {
        self.history.flush()
    }
}

fn blank_draft<B: StorageBackend>(kv: &KvStore<B>, template_id: &str) -> CurrentDraft {
    CurrentDraft {
        data: ResumeDocument::default(),
        template_id: template_id.to_string(),
        timestamp: kv.now(),
        document_id: None,
    }
}

fn open_history<B: StorageBackend>(
    kv: &Rc<KvStore<B>>,
    draft: &CurrentDraft,
    settings: &HistorySettings,
) -> HistoryManager<ResumeDocument, B> {
    let scope = draft.document_id.as_deref().unwrap_or(DRAFT_HISTORY_SCOPE);
    let mut history = HistoryManager::initialize(kv.clone(), scope, &draft.data, settings.clone());
    if history.current().data != draft.data {
        debug!(scope, "draft is ahead of its history, recording it");
        history.append(&draft.data, ACTION_RECOVERED, Some("Recovered draft"));
    }
    history
}
