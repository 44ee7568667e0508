use crate::commands::helpers::resolve_document;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::SavedDocument;
use crate::session::Session;
use crate::store::keys;
use crate::store::StorageBackend;
use std::collections::BTreeSet;

/// Start a new blank draft.
pub fn new<B: StorageBackend>(
    session: &mut Session<B>,
    template_id: Option<&str>,
) -> Result<CmdResult> {
    let template = template_id
        .map(str::to_string)
        .unwrap_or_else(|| session.preferences.load_or_default().default_template);
    session.flush();
    session.start_blank(&template);

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Started a new resume ({} template)",
        template
    )));
    Ok(result.with_draft(session.draft().clone()))
}

/// Save the live draft as a document.
///
/// A draft opened from a document updates that document; otherwise a new one is created
/// and the draft becomes bound to it.
pub fn save<B: StorageBackend>(
    session: &mut Session<B>,
    name: Option<&str>,
    tags: &[String],
) -> Result<CmdResult> {
    session.flush();
    let mut result = CmdResult::default();
    let draft = session.draft().clone();
    let now = session.kv().now();

    let existing = draft
        .document_id
        .as_deref()
        .and_then(|id| session.documents.get(id));

    let doc = match existing {
        Some(mut doc) => {
            if let Some(name) = name {
                doc.name = name.to_string();
            }
            doc.data = draft.data.clone();
            doc.template_id = draft.template_id.clone();
            doc.tags.extend(tags.iter().cloned());
            doc
        }
        None => SavedDocument::new(
            name.map(str::to_string)
                .unwrap_or_else(|| draft.data.display_name()),
            draft.template_id.clone(),
            draft.data.clone(),
            now,
        )
        .with_tags(tags.iter().cloned()),
    };

    if !session.documents.upsert(doc.clone()) {
        result.add_message(CmdMessage::error(format!(
            "Could not save \"{}\": storage is full",
            doc.name
        )));
        return Ok(result);
    }
    session.attach_document(&doc.id);
    result.add_message(CmdMessage::success(format!("Saved \"{}\"", doc.name)));

    if let Some(key) = session.backups.auto_backup_if_due() {
        result.add_message(CmdMessage::info(format!("Backup created: {}", key)));
    }

    let saved = session.documents.get(&doc.id).unwrap_or(doc);
    Ok(result
        .with_documents(vec![saved])
        .with_draft(session.draft().clone()))
}

/// Load a saved document into the live draft.
pub fn open<B: StorageBackend>(session: &mut Session<B>, selector: &str) -> Result<CmdResult> {
    let doc = resolve_document(session, selector)?;
    let draft = crate::model::CurrentDraft {
        data: doc.data.clone(),
        template_id: doc.template_id.clone(),
        timestamp: session.kv().now(),
        document_id: Some(doc.id.clone()),
    };
    session.switch_to(draft);

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Opened \"{}\"", doc.name)));
    Ok(result
        .with_documents(vec![doc])
        .with_draft(session.draft().clone()))
}

pub fn list<B: StorageBackend>(session: &Session<B>, tag: Option<&str>) -> Result<CmdResult> {
    let docs = match tag {
        Some(tag) => session.documents.with_tag(tag),
        None => session.documents.list(),
    };
    let mut result = CmdResult::default();
    if docs.is_empty() {
        result.add_message(CmdMessage::info("No saved documents"));
    }
    Ok(result.with_documents(docs))
}

/// Delete a document and its history. A draft bound to it stays, unbound.
pub fn delete<B: StorageBackend>(session: &mut Session<B>, selector: &str) -> Result<CmdResult> {
    let doc = resolve_document(session, selector)?;
    let mut result = CmdResult::default();

    if !session.documents.delete(&doc.id) {
        result.add_message(CmdMessage::warning(format!(
            "\"{}\" was not deleted",
            doc.name
        )));
        return Ok(result);
    }
    if session.draft().document_id.as_deref() == Some(doc.id.as_str()) {
        session.detach_document();
        result.add_message(CmdMessage::info(
            "The open draft is no longer linked to a saved document",
        ));
    }
    session.kv().remove(&keys::history_key(&doc.id));

    result.add_message(CmdMessage::success(format!("Deleted \"{}\"", doc.name)));
    Ok(result.with_documents(vec![doc]))
}

pub fn duplicate<B: StorageBackend>(session: &Session<B>, selector: &str) -> Result<CmdResult> {
    let doc = resolve_document(session, selector)?;
    let mut result = CmdResult::default();
    match session.documents.duplicate(&doc.id) {
        Some(copy) => {
            result.add_message(CmdMessage::success(format!(
                "Duplicated \"{}\" as \"{}\"",
                doc.name, copy.name
            )));
            Ok(result.with_documents(vec![copy]))
        }
        None => {
            result.add_message(CmdMessage::error(format!(
                "Could not duplicate \"{}\"",
                doc.name
            )));
            Ok(result)
        }
    }
}

pub fn rename<B: StorageBackend>(
    session: &Session<B>,
    selector: &str,
    name: &str,
) -> Result<CmdResult> {
    let doc = resolve_document(session, selector)?;
    let mut result = CmdResult::default();
    if session.documents.rename(&doc.id, name) {
        result.add_message(CmdMessage::success(format!(
            "Renamed \"{}\" to \"{}\"",
            doc.name, name
        )));
    } else {
        result.add_message(CmdMessage::error(format!("Could not rename \"{}\"", doc.name)));
    }
    Ok(result.with_documents(session.documents.get(&doc.id).into_iter().collect()))
}

/// Add or remove tags on a document.
pub fn tag<B: StorageBackend>(
    session: &Session<B>,
    selector: &str,
    add: &[String],
    remove: &[String],
) -> Result<CmdResult> {
    let mut doc = resolve_document(session, selector)?;
    let before: BTreeSet<String> = doc.tags.clone();
    doc.tags.extend(add.iter().cloned());
    for tag in remove {
        doc.tags.remove(tag);
    }

    let mut result = CmdResult::default();
    if doc.tags == before {
        result.add_message(CmdMessage::info("Tags unchanged"));
    } else if session.documents.upsert(doc.clone()) {
        result.add_message(CmdMessage::success(format!(
            "Tags for \"{}\": {}",
            doc.name,
            doc.tags.iter().cloned().collect::<Vec<_>>().join(", ")
        )));
    }
    Ok(result.with_documents(session.documents.get(&doc.id).into_iter().collect()))
}

/// Select the template for the live draft and remember it as the last selection.
pub fn template<B: StorageBackend>(session: &mut Session<B>, template_id: &str) -> Result<CmdResult> {
    let template_id = template_id.trim();
    if template_id.is_empty() {
        return Err(crate::error::FolioError::Validation(
            "template id cannot be empty".to_string(),
        ));
    }
    session.templates.select(template_id);
    session.set_template(template_id);

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Template set to {}", template_id)));
    Ok(result.with_draft(session.draft().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::edit::{self, Edit};
    use crate::commands::MessageLevel;
    use crate::model::PersonalField;
    use crate::test_utils::mem_session;

    fn set_name<B: StorageBackend>(session: &mut Session<B>, name: &str) {
        edit::run(
            session,
            &[Edit::SetPersonal {
                field: PersonalField::FullName,
                value: name.to_string(),
            }],
        )
        .unwrap();
    }

    #[test]
    fn test_first_save_creates_then_updates() {
        let (clock, mut session) = mem_session();
        set_name(&mut session, "Ada");
        let first = save(&mut session, None, &[]).unwrap();
        assert_eq!(first.documents[0].name, "Ada resume");
        let id = first.documents[0].id.clone();
        assert_eq!(session.draft().document_id.as_deref(), Some(id.as_str()));

        clock.advance_millis(5_000);
        set_name(&mut session, "Ada L.");
        let second = save(&mut session, Some("Main"), &[]).unwrap();

        let docs = session.documents.list();
        assert_eq!(docs.len(), 1);
        assert_eq!(second.documents[0].id, id);
        assert_eq!(docs[0].name, "Main");
        assert_eq!(docs[0].data.personal_info.full_name, "Ada L.");
        assert!(docs[0].updated_at > docs[0].created_at);
    }

    #[test]
    fn test_save_keeps_history_under_document_scope() {
        let (_, mut session) = mem_session();
        set_name(&mut session, "Ada");
        save(&mut session, None, &[]).unwrap();

        assert_ne!(session.history_scope(), "draft");
        assert_eq!(session.history().len(), 2);
        assert!(session.history().can_undo());
    }

    #[test]
    fn test_save_takes_first_automatic_backup() {
        let (_, mut session) = mem_session();
        let result = save(&mut session, Some("CV"), &[]).unwrap();
        assert!(result
            .messages
            .iter()
            .any(|m| m.content.starts_with("Backup created: backup_")));
        assert_eq!(session.backups.list_backups().len(), 1);
    }

    #[test]
    fn test_open_switches_draft_and_history() {
        let (_, mut session) = mem_session();
        set_name(&mut session, "First");
        save(&mut session, Some("One"), &[]).unwrap();
        new(&mut session, None).unwrap();
        set_name(&mut session, "Second");
        save(&mut session, Some("Two"), &[]).unwrap();

        open(&mut session, "One").unwrap();
        assert_eq!(session.document().personal_info.full_name, "First");
        assert_eq!(session.history().current().data.personal_info.full_name, "First");
    }

    #[test]
    fn test_delete_unbinds_open_draft() {
        let (_, mut session) = mem_session();
        save(&mut session, Some("Gone"), &[]).unwrap();
        let result = delete(&mut session, "Gone").unwrap();
        assert!(result.has_level(MessageLevel::Success));
        assert!(session.documents.list().is_empty());
        assert_eq!(session.draft().document_id, None);
        assert_eq!(session.history_scope(), "draft");
    }

    #[test]
    fn test_duplicate_and_tags() {
        let (_, mut session) = mem_session();
        save(&mut session, Some("Base"), &["eng".to_string()]).unwrap();
        let copy = duplicate(&session, "1").unwrap();
        assert_eq!(copy.documents[0].name, "Base (copy)");
        assert_eq!(session.documents.with_tag("eng").len(), 2);

        tag(&session, "2", &["remote".to_string()], &["eng".to_string()]).unwrap();
        assert_eq!(session.documents.with_tag("eng").len(), 1);
        assert_eq!(session.documents.with_tag("remote").len(), 1);
    }

    #[test]
    fn test_template_selection_updates_draft() {
        let (_, mut session) = mem_session();
        template(&mut session, "classic").unwrap();
        assert_eq!(session.draft().template_id, "classic");
        assert_eq!(session.templates.load().unwrap().template_id, "classic");
        assert!(template(&mut session, " ").is_err());
    }
}
