use crate::backup::ImportReport;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::session::Session;
use crate::store::StorageBackend;
use std::path::Path;

fn describe_import(report: &ImportReport) -> String {
    let mut parts = Vec::new();
    if report.documents {
        parts.push("documents");
    }
    if report.preferences {
        parts.push("preferences");
    }
    if report.current_draft {
        parts.push("draft");
    }
    if report.template {
        parts.push("template");
    }
    parts.join(", ")
}

pub fn create<B: StorageBackend>(session: &mut Session<B>) -> Result<CmdResult> {
    session.flush();
    let mut result = CmdResult::default();
    match session.backups.create_backup() {
        Some(key) => result.add_message(CmdMessage::success(format!("Backup created: {}", key))),
        None => result.add_message(CmdMessage::error(
            "Backup could not be written: storage is full",
        )),
    }
    result.backups = session.backups.list_backups();
    Ok(result)
}

pub fn list<B: StorageBackend>(session: &Session<B>) -> Result<CmdResult> {
    let mut result = CmdResult {
        backups: session.backups.list_backups(),
        ..Default::default()
    };
    if result.backups.is_empty() {
        result.add_message(CmdMessage::info("No backups yet"));
    }
    Ok(result)
}

/// Restore a backup by key or 1-based position in the (newest first) list.
pub fn restore<B: StorageBackend>(session: &mut Session<B>, selector: &str) -> Result<CmdResult> {
    let key = resolve_backup_key(session, selector);
    let mut result = CmdResult::default();
    if session.backups.restore_backup(&key)? {
        session.reload();
        result.add_message(CmdMessage::success(format!("Restored backup {}", key)));
        result.draft = Some(session.draft().clone());
    } else {
        result.add_message(CmdMessage::warning(format!("No backup named {}", key)));
    }
    Ok(result)
}

pub fn delete<B: StorageBackend>(session: &Session<B>, selector: &str) -> Result<CmdResult> {
    let key = resolve_backup_key(session, selector);
    let mut result = CmdResult::default();
    if session.backups.delete_backup(&key) {
        result.add_message(CmdMessage::success(format!("Deleted backup {}", key)));
    } else {
        result.add_message(CmdMessage::warning(format!("No backup named {}", key)));
    }
    Ok(result)
}

fn resolve_backup_key<B: StorageBackend>(session: &Session<B>, selector: &str) -> String {
    let selector = selector.trim();
    // Positions are small; backup keys carry 13-digit timestamps
    if selector.len() <= 4 {
        if let Ok(position) = selector.parse::<usize>() {
            if let Some(info) = position
                .checked_sub(1)
                .and_then(|i| session.backups.list_backups().into_iter().nth(i))
            {
                return info.key;
            }
        }
    }
    selector.to_string()
}

/// Write the whole state to a timestamped bundle file in `dir`.
pub fn export_file<B: StorageBackend>(
    session: &mut Session<B>,
    dir: &Path,
    compress: bool,
) -> Result<CmdResult> {
    session.flush();
    let path = session.backups.export_to_file(dir, compress)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Exported to {}", path.display())));
    Ok(result.with_paths(vec![path]))
}

/// Import a bundle file. Nothing changes when the file does not validate.
pub fn import_file<B: StorageBackend>(session: &mut Session<B>, path: &Path) -> Result<CmdResult> {
    session.flush();
    let report = session.backups.import_from_file(path)?;
    session.reload();

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Imported {}",
        describe_import(&report)
    )));
    result.draft = Some(session.draft().clone());
    Ok(result.with_documents(session.documents.list()))
}
