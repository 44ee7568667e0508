use crate::commands::{CmdMessage, CmdResult};
use crate::error::{FolioError, Result};
use crate::model::{PageSize, Preferences};
use crate::session::Session;
use crate::store::StorageBackend;

pub const PREFERENCE_KEYS: &[&str] = &["theme", "auto-save", "default-template", "page-size"];

pub fn show<B: StorageBackend>(session: &Session<B>) -> Result<CmdResult> {
    Ok(CmdResult {
        preferences: Some(session.preferences.load_or_default()),
        ..Default::default()
    })
}

pub fn set<B: StorageBackend>(session: &Session<B>, key: &str, value: &str) -> Result<CmdResult> {
    let mut prefs = session.preferences.load_or_default();
    apply(&mut prefs, key, value)?;

    let mut result = CmdResult::default();
    if session.preferences.save(&prefs) {
        result.add_message(CmdMessage::success(format!("{} set to {}", key, value)));
    } else {
        result.add_message(CmdMessage::error("Preferences could not be saved"));
    }
    result.preferences = Some(prefs);
    Ok(result)
}

fn apply(prefs: &mut Preferences, key: &str, value: &str) -> Result<()> {
    let value = value.trim();
    match key.to_ascii_lowercase().replace('_', "-").as_str() {
        "theme" => match value {
            "light" | "dark" | "system" => prefs.theme = value.to_string(),
            other => {
                return Err(FolioError::Validation(format!(
                    "unknown theme '{}' (light, dark, system)",
                    other
                )))
            }
        },
        "auto-save" | "autosave" => {
            prefs.auto_save = parse_bool(value)?;
        }
        "default-template" => {
            if value.is_empty() {
                return Err(FolioError::Validation(
                    "default template cannot be empty".to_string(),
                ));
            }
            prefs.default_template = value.to_string();
        }
        "page-size" => {
            prefs.page_size = match value.to_ascii_lowercase().as_str() {
                "a4" => PageSize::A4,
                "letter" => PageSize::Letter,
                other => {
                    return Err(FolioError::Validation(format!(
                        "unknown page size '{}' (a4, letter)",
                        other
                    )))
                }
            }
        }
        _ => {
            return Err(FolioError::Validation(format!(
                "unknown preference '{}' (expected one of: {})",
                key,
                PREFERENCE_KEYS.join(", ")
            )))
        }
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(FolioError::Validation(format!(
            "expected true or false, got '{}'",
            other
        ))),
    }
}
