use crate::commands::{HistoryItem, HistoryView};
use crate::error::{FolioError, Result};
use crate::history::HistoryManager;
use crate::model::{ResumeDocument, SavedDocument};
use crate::session::Session;
use crate::store::StorageBackend;

/// Resolve a user selector to a saved document.
///
/// Accepted forms, tried in order: a full id, a case-insensitive exact name, a 1-based
/// position in the document list (`2` or `#2`), a unique id prefix. A name made of digits
/// therefore wins over the position; `#N` always means a position.
pub fn resolve_document<B: StorageBackend>(
    session: &Session<B>,
    selector: &str,
) -> Result<SavedDocument> {
    let docs = session.documents.list();
    let selector = selector.trim();

    if let Some(doc) = docs.iter().find(|d| d.id == selector) {
        return Ok(doc.clone());
    }

    let explicit_position = selector.strip_prefix('#');
    if explicit_position.is_none() {
        if let Some(doc) = docs.iter().find(|d| d.name.eq_ignore_ascii_case(selector)) {
            return Ok(doc.clone());
        }
    }

    if let Ok(position) = explicit_position.unwrap_or(selector).parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|i| docs.get(i).cloned())
            .ok_or_else(|| FolioError::NotFound(format!("no document at position {}", position)));
    }

    let by_prefix: Vec<&SavedDocument> = docs
        .iter()
        .filter(|d| !selector.is_empty() && d.id.starts_with(selector))
        .collect();
    match by_prefix.as_slice() {
        [doc] => Ok((*doc).clone()),
        [] => Err(FolioError::NotFound(format!("no document matches '{}'", selector))),
        _ => Err(FolioError::Validation(format!(
            "'{}' matches {} documents, use a longer id",
            selector,
            by_prefix.len()
        ))),
    }
}

/// Resolve a selector for an entry in an ordered list of ids: a 1-based position or an
/// id prefix.
pub fn resolve_entry(ids: &[&str], selector: &str, kind: &str) -> Result<String> {
    let selector = selector.trim();
    if let Ok(position) = selector.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|i| ids.get(i))
            .map(|id| id.to_string())
            .ok_or_else(|| FolioError::NotFound(format!("no {} at position {}", kind, position)));
    }

    let matches: Vec<&&str> = ids
        .iter()
        .filter(|id| !selector.is_empty() && id.starts_with(selector))
        .collect();
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => Err(FolioError::NotFound(format!(
            "no {} matches '{}'",
            kind, selector
        ))),
        _ => Err(FolioError::Validation(format!(
            "'{}' matches several {} entries",
            selector, kind
        ))),
    }
}

pub fn experience_ids(doc: &ResumeDocument) -> Vec<&str> {
    doc.experience.iter().map(|e| e.id.as_str()).collect()
}

pub fn education_ids(doc: &ResumeDocument) -> Vec<&str> {
    doc.education.iter().map(|e| e.id.as_str()).collect()
}

pub fn history_view<B: StorageBackend>(history: &HistoryManager<ResumeDocument, B>) -> HistoryView {
    let current_index = history.current_index();
    HistoryView {
        items: history
            .entries()
            .iter()
            .enumerate()
            .map(|(index, entry)| HistoryItem {
                index,
                action: entry.action.clone(),
                label: entry.label().to_string(),
                timestamp: entry.timestamp,
                current: index == current_index,
            })
            .collect(),
        current_index,
        can_undo: history.can_undo(),
        can_redo: history.can_redo(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mem_session, sample_document};

    #[test]
    fn test_resolve_document_by_position_id_and_name() {
        let (_, session) = mem_session();
        let first = SavedDocument::new("Backend CV", "modern", sample_document(), session.kv().now());
        let second = SavedDocument::new("Frontend CV", "classic", sample_document(), session.kv().now());
        session.documents.upsert(first.clone());
        session.documents.upsert(second.clone());

        assert_eq!(resolve_document(&session, "2").unwrap().id, second.id);
        assert_eq!(resolve_document(&session, &first.id).unwrap().id, first.id);
        assert_eq!(resolve_document(&session, &second.id[..8]).unwrap().id, second.id);
        assert_eq!(resolve_document(&session, "backend cv").unwrap().id, first.id);
        assert!(matches!(
            resolve_document(&session, "3"),
            Err(FolioError::NotFound(_))
        ));
        assert!(matches!(
            resolve_document(&session, "nothing"),
            Err(FolioError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_document_numeric_name_beats_position() {
        let (_, session) = mem_session();
        let first = SavedDocument::new("Backend CV", "modern", sample_document(), session.kv().now());
        let dated = SavedDocument::new("2024", "modern", sample_document(), session.kv().now());
        let other = SavedDocument::new("1", "classic", sample_document(), session.kv().now());
        for doc in [&first, &dated, &other] {
            session.documents.upsert(doc.clone());
        }

        assert_eq!(resolve_document(&session, "2024").unwrap().id, dated.id);
        assert_eq!(resolve_document(&session, "1").unwrap().id, other.id);
        assert_eq!(resolve_document(&session, "#1").unwrap().id, first.id);
        assert_eq!(resolve_document(&session, "2").unwrap().id, dated.id);
        assert!(matches!(
            resolve_document(&session, "#9"),
            Err(FolioError::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve_entry() {
        let ids = ["abc123", "abd456", "xyz789"];
        assert_eq!(resolve_entry(&ids, "3", "experience").unwrap(), "xyz789");
        assert_eq!(resolve_entry(&ids, "abc", "experience").unwrap(), "abc123");
        assert!(matches!(
            resolve_entry(&ids, "ab", "experience"),
            Err(FolioError::Validation(_))
        ));
        assert!(matches!(
            resolve_entry(&ids, "0", "experience"),
            Err(FolioError::NotFound(_))
        ));
    }
}
