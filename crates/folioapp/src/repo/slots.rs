use crate::model::{CurrentDraft, Preferences, ResumeDocument, TemplateSelection};
use crate::store::keys;
use crate::store::{KvStore, StorageBackend};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::rc::Rc;

/// A repository holding exactly one value under a fixed key.
pub struct SlotRepository<B: StorageBackend, T> {
    kv: Rc<KvStore<B>>,
    key: &'static str,
    _value: PhantomData<T>,
}

impl<B: StorageBackend, T: Serialize + DeserializeOwned> SlotRepository<B, T> {
    pub fn new(kv: Rc<KvStore<B>>, key: &'static str) -> Self {
        Self {
            kv,
            key,
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn save(&self, value: &T) -> bool {
        self.kv.save(self.key, value)
    }

    pub fn load(&self) -> Option<T> {
        self.kv.load(self.key)
    }

    pub fn clear(&self) -> bool {
        self.kv.remove(self.key)
    }
}

pub type PreferencesRepository<B> = SlotRepository<B, Preferences>;
pub type TemplateRepository<B> = SlotRepository<B, TemplateSelection>;

impl<B: StorageBackend> SlotRepository<B, Preferences> {
    pub fn preferences(kv: Rc<KvStore<B>>) -> Self {
        Self::new(kv, keys::PREFERENCES)
    }

    pub fn load_or_default(&self) -> Preferences {
        self.load().unwrap_or_default()
    }
}

impl<B: StorageBackend> SlotRepository<B, TemplateSelection> {
    pub fn template(kv: Rc<KvStore<B>>) -> Self {
        Self::new(kv, keys::TEMPLATE)
    }

    pub fn select(&self, template_id: &str) -> bool {
        self.save(&TemplateSelection {
            template_id: template_id.to_string(),
            selected_at: self.kv.now(),
        })
    }
}

/// The work-in-progress document, overwritten on every edit.
pub struct DraftRepository<B: StorageBackend> {
    slot: SlotRepository<B, CurrentDraft>,
}

impl<B: StorageBackend> DraftRepository<B> {
    pub fn new(kv: Rc<KvStore<B>>) -> Self {
        Self {
            slot: SlotRepository::new(kv, keys::CURRENT_DRAFT),
        }
    }

    pub fn save_current_draft(
        &self,
        data: &ResumeDocument,
        template_id: &str,
        document_id: Option<&str>,
    ) -> bool {
        self.slot.save(&CurrentDraft {
            data: data.clone(),
            template_id: template_id.to_string(),
            timestamp: self.slot.kv.now(),
            document_id: document_id.map(str::to_string),
        })
    }

    pub fn load_current_draft(&self) -> Option<CurrentDraft> {
        self.slot.load()
    }

    /// Write a draft record as is (used by restores).
    pub fn save(&self, draft: &CurrentDraft) -> bool {
        self.slot.save(draft)
    }

    pub fn clear(&self) -> bool {
        self.slot.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::PageSize;
    use crate::store::MemBackend;

    fn kv() -> Rc<KvStore<MemBackend>> {
        Rc::new(KvStore::new(MemBackend::new()).with_clock(Rc::new(ManualClock::default())))
    }

    #[test]
    fn test_draft_slot_is_overwritten() {
        let drafts = DraftRepository::new(kv());
        assert!(drafts.load_current_draft().is_none());

        let mut doc = ResumeDocument::default();
        doc.personal_info.full_name = "A".into();
        assert!(drafts.save_current_draft(&doc, "modern", None));

        doc.personal_info.full_name = "B".into();
        assert!(drafts.save_current_draft(&doc, "classic", Some("doc-1")));

        let draft = drafts.load_current_draft().unwrap();
        assert_eq!(draft.data.personal_info.full_name, "B");
        assert_eq!(draft.template_id, "classic");
        assert_eq!(draft.document_id.as_deref(), Some("doc-1"));
    }

    #[test]
    fn test_preferences_default_when_absent() {
        let prefs = PreferencesRepository::preferences(kv());
        assert_eq!(prefs.load_or_default(), Preferences::default());

        let custom = Preferences {
            page_size: PageSize::Letter,
            ..Default::default()
        };
        assert!(prefs.save(&custom));
        assert_eq!(prefs.load_or_default().page_size, PageSize::Letter);
    }

    #[test]
    fn test_template_selection() {
        let templates = TemplateRepository::template(kv());
        assert!(templates.select("minimal"));
        assert_eq!(templates.load().unwrap().template_id, "minimal");
        assert!(templates.clear());
        assert!(templates.load().is_none());
    }
}
