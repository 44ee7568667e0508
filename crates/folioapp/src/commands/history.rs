use crate::commands::helpers::history_view;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{FolioError, Result};
use crate::model::ResumeDocument;
use crate::session::Session;
use crate::store::StorageBackend;
use std::fs;
use std::path::{Path, PathBuf};

fn after_move<B: StorageBackend>(
    session: &mut Session<B>,
    moved: Option<ResumeDocument>,
    verb: &str,
    nothing: &str,
) -> CmdResult {
    let mut result = CmdResult::default();
    match moved {
        Some(doc) => {
            session.set_document(doc);
            let label = session.history().current().label().to_string();
            result.add_message(CmdMessage::success(format!("{} to: {}", verb, label)));
            result.draft = Some(session.draft().clone());
        }
        None => result.add_message(CmdMessage::info(nothing)),
    }
    result.history = Some(history_view(session.history()));
    result
}

pub fn undo<B: StorageBackend>(session: &mut Session<B>) -> Result<CmdResult> {
    let moved = session.history_mut().undo();
    Ok(after_move(session, moved, "Undone", "Nothing to undo"))
}

pub fn redo<B: StorageBackend>(session: &mut Session<B>) -> Result<CmdResult> {
    let moved = session.history_mut().redo();
    Ok(after_move(session, moved, "Redone", "Nothing to redo"))
}

/// Jump to the entry at `index` (0-based, as listed).
pub fn go_to<B: StorageBackend>(session: &mut Session<B>, index: usize) -> Result<CmdResult> {
    session.flush();
    let len = session.history().len();
    if index >= len {
        return Err(FolioError::NotFound(format!(
            "no history entry {} (history has {} entries)",
            index, len
        )));
    }
    let moved = session.history_mut().go_to(index);
    Ok(after_move(session, moved, "Jumped", "Already there"))
}

pub fn list<B: StorageBackend>(session: &mut Session<B>) -> Result<CmdResult> {
    session.flush();
    Ok(CmdResult {
        history: Some(history_view(session.history())),
        ..Default::default()
    })
}

/// Drop the history of the live draft, keeping the draft as it is.
pub fn clear<B: StorageBackend>(session: &mut Session<B>) -> Result<CmdResult> {
    let live = session.document().clone();
    session.history_mut().clear(&live);
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success("History cleared"));
    result.history = Some(history_view(session.history()));
    Ok(result)
}

/// Write the history log of the live draft to `path`.
pub fn export<B: StorageBackend>(session: &mut Session<B>, path: &Path) -> Result<CmdResult> {
    let log = session.history_mut().export_log()?;
    fs::write(path, log)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "History exported to {}",
        path.display()
    )));
    Ok(result.with_paths(vec![PathBuf::from(path)]))
}

/// Replace the history of the live draft with a log file, moving the draft to its
/// current entry.
pub fn import<B: StorageBackend>(session: &mut Session<B>, path: &Path) -> Result<CmdResult> {
    let text = fs::read_to_string(path)?;
    session.history_mut().import_log(&text)?;
    let current = session.history().current().data.clone();
    session.set_document(current);

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Imported {} history entries",
        session.history().len()
    )));
    result.draft = Some(session.draft().clone());
    result.history = Some(history_view(session.history()));
    Ok(result)
}
