use crate::model::SavedDocument;
use crate::store::keys;
use crate::store::{KvStore, StorageBackend};
use std::rc::Rc;
use tracing::{debug, warn};

/// The saved-documents collection.
///
/// The medium has no partial updates, so every mutation loads the whole list and writes
/// it back as one `save`. That is fine for tens to low hundreds of documents.
pub struct DocumentRepository<B: StorageBackend> {
    kv: Rc<KvStore<B>>,
}

impl<B: StorageBackend> DocumentRepository<B> {
    pub fn new(kv: Rc<KvStore<B>>) -> Self {
        Self { kv }
    }

    /// All saved documents in stored order (empty if nothing was ever saved).
    ///
    /// A stored list that no longer decodes also reads as empty; see [`Self::try_list`].
    pub fn list(&self) -> Vec<SavedDocument> {
        self.try_list().unwrap_or_default()
    }

    /// The stored list, or `None` when the key holds a list this build cannot decode
    /// (written by another schema version, for instance).
    ///
    /// A missing or corrupted entry is an empty collection. An undecodable one is left in
    /// place, and the mutating methods refuse to overwrite it.
    pub fn try_list(&self) -> Option<Vec<SavedDocument>> {
        let Some(envelope) = self.kv.load_envelope(keys::DOCUMENTS) else {
            return Some(Vec::new());
        };
        match serde_json::from_value(envelope.data) {
            Ok(docs) => Some(docs),
            Err(e) => {
                warn!(version = %envelope.version, error = %e, "saved documents do not decode");
                None
            }
        }
    }

    fn writable_list(&self) -> Option<Vec<SavedDocument>> {
        let docs = self.try_list();
        if docs.is_none() {
            warn!("refusing to rewrite saved documents that do not decode");
        }
        docs
    }

    pub fn get(&self, id: &str) -> Option<SavedDocument> {
        self.list().into_iter().find(|doc| doc.id == id)
    }

    pub fn with_tag(&self, tag: &str) -> Vec<SavedDocument> {
        self.list()
            .into_iter()
            .filter(|doc| doc.tags.contains(tag))
            .collect()
    }

    /// Insert `doc`, or replace the document with the same id.
    ///
    /// A replacement keeps the original `created_at` and refreshes `updated_at`.
    pub fn upsert(&self, mut doc: SavedDocument) -> bool {
        let Some(mut docs) = self.writable_list() else {
            return false;
        };
        match docs.iter_mut().find(|existing| existing.id == doc.id) {
            Some(existing) => {
                doc.created_at = existing.created_at;
                doc.updated_at = self.kv.now();
                debug!(id = %doc.id, "updating saved document");
                *existing = doc;
            }
            None => {
                debug!(id = %doc.id, "adding saved document");
                docs.push(doc);
            }
        }
        self.kv.save(keys::DOCUMENTS, &docs)
    }

    /// Remove the document with `id`. Returns false if it was not there.
    pub fn delete(&self, id: &str) -> bool {
        let Some(mut docs) = self.writable_list() else {
            return false;
        };
        let before = docs.len();
        docs.retain(|doc| doc.id != id);
        if docs.len() == before {
            return false;
        }
        self.kv.save(keys::DOCUMENTS, &docs)
    }

    pub fn rename(&self, id: &str, name: &str) -> bool {
        match self.get(id) {
            Some(mut doc) => {
                doc.name = name.to_string();
                self.upsert(doc)
            }
            None => false,
        }
    }

    /// Save a copy of `id` under a fresh id. Returns the copy.
    pub fn duplicate(&self, id: &str) -> Option<SavedDocument> {
        let original = self.get(id)?;
        let copy = SavedDocument::new(
            format!("{} (copy)", original.name),
            original.template_id,
            original.data,
            self.kv.now(),
        )
        .with_tags(original.tags);

        if self.upsert(copy.clone()) {
            Some(copy)
        } else {
            None
        }
    }

    /// Overwrite the whole collection.
    pub fn replace_all(&self, docs: &[SavedDocument]) -> bool {
        self.kv.save(keys::DOCUMENTS, docs)
    }
}
