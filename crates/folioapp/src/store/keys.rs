//! The persisted key namespace.
//!
//! These names must stay stable across releases, otherwise stored data is orphaned on
//! upgrade. Each logical collection owns exactly one key (or one key family) and no
//! component writes another component's key.

use chrono::{DateTime, Utc};

/// Prefix applied on the medium to every key the store manages.
pub const NAMESPACE: &str = "folio:";

pub const CURRENT_DRAFT: &str = "current_resume";
pub const DOCUMENTS: &str = "saved_resumes";
pub const PREFERENCES: &str = "user_preferences";
pub const TEMPLATE: &str = "selected_template";

pub const HISTORY_PREFIX: &str = "history_";
pub const BACKUP_PREFIX: &str = "backup_";

/// History key for a draft that was never saved as a document.
pub const DRAFT_HISTORY_SCOPE: &str = "draft";

pub fn history_key(scope: &str) -> String {
    format!("{}{}", HISTORY_PREFIX, scope)
}

pub fn backup_key(at: DateTime<Utc>) -> String {
    format!("{}{}", BACKUP_PREFIX, at.timestamp_millis())
}

/// Parse a `backup_<epoch-millis>` key into its creation time.
pub fn parse_backup_key(key: &str) -> Option<DateTime<Utc>> {
    let millis = key.strip_prefix(BACKUP_PREFIX)?;
    if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    DateTime::from_timestamp_millis(millis.parse().ok()?)
}

pub fn is_backup_key(key: &str) -> bool {
    parse_backup_key(key).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_key_roundtrip() {
        let at = DateTime::from_timestamp_millis(1_704_067_200_123).unwrap();
        let key = backup_key(at);
        assert_eq!(key, "backup_1704067200123");
        assert_eq!(parse_backup_key(&key), Some(at));
    }

    #[test]
    fn test_parse_backup_key_rejects_malformed() {
        assert_eq!(parse_backup_key("backup_"), None);
        assert_eq!(parse_backup_key("backup_12ab"), None);
        assert_eq!(parse_backup_key("backup_-5"), None);
        assert_eq!(parse_backup_key("saved_resumes"), None);
        assert!(!is_backup_key("history_draft"));
    }

    #[test]
    fn test_history_key() {
        assert_eq!(history_key(DRAFT_HISTORY_SCOPE), "history_draft");
        assert_eq!(history_key("abc"), "history_abc");
    }
}
