use crate::commands::status::sync_status;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::session::Session;
use crate::store::StorageBackend;
use crate::sync::SyncQueueItem;

pub fn status<B: StorageBackend>(session: &Session<B>) -> Result<CmdResult> {
    let status = sync_status(session);
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::info(format!(
        "Sync {} via {} ({}, {} pending)",
        if status.enabled { "enabled" } else { "disabled" },
        status.transport,
        if status.online { "online" } else { "offline" },
        status.pending
    )));
    Ok(result)
}

/// Queue the current value of every stored key and drain the queue.
pub fn push_all<B: StorageBackend>(session: &mut Session<B>) -> Result<CmdResult> {
    session.flush();
    let mut result = CmdResult::default();
    if !session.sync.is_enabled() {
        result.add_message(CmdMessage::warning(
            "Sync is disabled; set sync_enabled = true in folio.toml to enable it",
        ));
        return Ok(result);
    }

    let kv = session.kv().clone();
    let items: Vec<SyncQueueItem> = kv
        .keys()
        .into_iter()
        .filter_map(|key| {
            kv.load_envelope(&key).map(|envelope| SyncQueueItem {
                key,
                data: envelope.data,
                timestamp: envelope.timestamp,
            })
        })
        .collect();

    let report = session.sync.enqueue_all(items);
    if report.halted {
        result.add_message(CmdMessage::warning(format!(
            "Pushed {} items, {} still pending",
            report.pushed, report.remaining
        )));
    } else {
        result.add_message(CmdMessage::success(format!("Pushed {} items", report.pushed)));
    }
    result.sync = Some(report);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mem_session, mem_session_with_sync};
    use crate::sync::DirTransport;

    #[test]
    fn test_push_all_disabled() {
        let (_, mut session) = mem_session();
        let result = push_all(&mut session).unwrap();
        assert!(result.sync.is_none());
        assert!(result.messages[0].content.starts_with("Sync is disabled"));
    }

    #[test]
    fn test_push_all_mirrors_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let (_, mut session) =
            mem_session_with_sync(Box::new(DirTransport::new(dir.path().to_path_buf())));
        session.preferences.save(&Default::default());

        let report = push_all(&mut session).unwrap().sync.unwrap();
        assert!(report.pushed >= 2);
        assert_eq!(report.remaining, 0);
        assert!(dir.path().join("user_preferences.json").exists());
        assert!(dir.path().join("history_draft.json").exists());
    }
}
