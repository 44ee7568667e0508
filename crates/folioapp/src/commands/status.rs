use crate::commands::{CmdMessage, CmdResult, StatusReport, SyncStatus};
use crate::error::Result;
use crate::session::Session;
use crate::store::StorageBackend;

pub fn run<B: StorageBackend>(session: &mut Session<B>, high_usage_percent: f64) -> Result<CmdResult> {
    session.flush();
    let usage = session.kv().usage();
    let editing = session
        .draft()
        .document_id
        .as_deref()
        .and_then(|id| session.documents.get(id))
        .map(|doc| doc.name);

    let report = StatusReport {
        usage,
        documents: session.documents.list().len(),
        backups: session.backups.list_backups().len(),
        last_backup: session.backups.latest_backup_at(),
        history_entries: session.history().len(),
        history_position: session.history().current_index(),
        editing,
        sync: sync_status(session),
    };

    let mut result = CmdResult::default();
    if usage.percentage > high_usage_percent {
        result.add_message(CmdMessage::warning(format!(
            "Storage is {:.0}% full; old backups will be removed to make room",
            usage.percentage
        )));
    }
    result.usage = Some(usage);
    result.status = Some(report);
    Ok(result)
}

pub fn sync_status<B: StorageBackend>(session: &Session<B>) -> SyncStatus {
    SyncStatus {
        enabled: session.sync.is_enabled(),
        online: session.sync.is_online(),
        pending: session.sync.pending_count(),
        transport: session.sync.transport_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::documents;
    use crate::test_utils::mem_session;

    #[test]
    fn test_status_counts() {
        let (_, mut session) = mem_session();
        documents::save(&mut session, Some("CV"), &[]).unwrap();

        let status = run(&mut session, 90.0).unwrap().status.unwrap();
        assert_eq!(status.documents, 1);
        assert_eq!(status.backups, 1);
        assert!(status.last_backup.is_some());
        assert_eq!(status.editing.as_deref(), Some("CV"));
        assert!(status.usage.used > 0);
        assert!(!status.sync.enabled);
    }

    #[test]
    fn test_high_usage_warning() {
        let (_, mut session) = mem_session();
        documents::save(&mut session, Some("CV"), &[]).unwrap();
        let result = run(&mut session, 0.0).unwrap();
        assert!(result.messages[0].content.starts_with("Storage is"));
    }
}
