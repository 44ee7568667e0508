//! # API Facade
//!
//! A **thin facade** over the command layer and the single entry point for every folio
//! operation, whichever UI is driving it.
//!
//! ## Role and Responsibilities
//!
//! The API:
//! - **Dispatches** to the command functions in [`crate::commands`]
//! - **Normalizes inputs** (field names, 1-based positions, selectors) into typed values
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! It owns the [`Session`], the one context object the application runs on. There are
//! no globals: a second `FolioApi` over another store is a completely separate instance.
//!
//! ## Generic Over the Medium
//!
//! `FolioApi<B: StorageBackend>` runs on any medium:
//! - Production: `FolioApi<FsBackend>`
//! - Testing: `FolioApi<MemBackend>` with a `ManualClock`
//!
//! ## Debounced Edits
//!
//! Personal-info edits reach history through a debounce window. An interactive UI calls
//! [`FolioApi::poll`] from its event loop; a short-lived process calls
//! [`FolioApi::close`] before exiting so the pending entry is not lost.

use crate::clock::Clock;
use crate::commands::{self, edit::Edit, CmdResult};
use crate::config::FolioConfig;
use crate::error::{FolioError, Result};
use crate::model::{Education, Experience, PersonalField};
use crate::session::Session;
use crate::store::{KvStore, StorageBackend};
use crate::sync::{DirTransport, LogTransport, SyncQueue, Transport};
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub struct FolioApi<B: StorageBackend> {
    session: Session<B>,
    config: FolioConfig,
    data_dir: Option<PathBuf>,
}

impl<B: StorageBackend> FolioApi<B> {
    /// Build the whole application context over `backend`.
    pub fn open(backend: B, config: FolioConfig, clock: Rc<dyn Clock>) -> Self {
        let kv = Rc::new(
            KvStore::new(backend)
                .with_settings(config.store_settings())
                .with_clock(clock),
        );
        let sync = SyncQueue::new(transport_for(&config), config.sync_enabled);
        let session = Session::open(
            kv,
            config.history_settings(),
            config.backup_settings(),
            sync,
        );
        Self {
            session,
            config,
            data_dir: None,
        }
    }

    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = Some(data_dir);
        self
    }

    pub fn session(&self) -> &Session<B> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<B> {
        &mut self.session
    }

    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    // --- editing ---

    pub fn show(&self) -> Result<CmdResult> {
        Ok(CmdResult::default().with_draft(self.session.draft().clone()))
    }

    pub fn edit(&mut self, edits: &[Edit]) -> Result<CmdResult> {
        commands::edit::run(&mut self.session, edits)
    }

    pub fn set_personal(&mut self, field: &str, value: &str) -> Result<CmdResult> {
        let field = PersonalField::parse(field).ok_or_else(|| {
            FolioError::Validation(format!(
                "unknown field '{}' (name, email, phone, location, website, summary)",
                field
            ))
        })?;
        self.edit(&[Edit::SetPersonal {
            field,
            value: value.to_string(),
        }])
    }

    /// The experience entry a selector (1-based position or id prefix) points at.
    pub fn find_experience(&self, selector: &str) -> Result<Experience> {
        let doc = self.session.document();
        let id = commands::helpers::resolve_entry(
            &commands::helpers::experience_ids(doc),
            selector,
            "experience",
        )?;
        doc.experience
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| FolioError::NotFound(format!("no experience entry {}", selector)))
    }

    pub fn find_education(&self, selector: &str) -> Result<Education> {
        let doc = self.session.document();
        let id = commands::helpers::resolve_entry(
            &commands::helpers::education_ids(doc),
            selector,
            "education",
        )?;
        doc.education
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| FolioError::NotFound(format!("no education entry {}", selector)))
    }

    pub fn remove_experience(&mut self, selector: &str) -> Result<CmdResult> {
        let id = self.find_experience(selector)?.id;
        self.edit(&[Edit::RemoveExperience { id }])
    }

    /// Move an experience entry to a 1-based position.
    pub fn move_experience(&mut self, selector: &str, position: usize) -> Result<CmdResult> {
        let id = self.find_experience(selector)?.id;
        let to = to_index(position)?;
        self.edit(&[Edit::MoveExperience { id, to }])
    }

    pub fn remove_education(&mut self, selector: &str) -> Result<CmdResult> {
        let id = self.find_education(selector)?.id;
        self.edit(&[Edit::RemoveEducation { id }])
    }

    pub fn move_education(&mut self, selector: &str, position: usize) -> Result<CmdResult> {
        let id = self.find_education(selector)?.id;
        let to = to_index(position)?;
        self.edit(&[Edit::MoveEducation { id, to }])
    }

    /// Remove a skill by 1-based position or case-insensitive name.
    pub fn remove_skill(&mut self, selector: &str) -> Result<CmdResult> {
        let index = self.skill_index(selector)?;
        self.edit(&[Edit::RemoveSkill { index }])
    }

    pub fn move_skill(&mut self, selector: &str, position: usize) -> Result<CmdResult> {
        let from = self.skill_index(selector)?;
        let to = to_index(position)?;
        self.edit(&[Edit::MoveSkill { from, to }])
    }

    fn skill_index(&self, selector: &str) -> Result<usize> {
        let skills = &self.session.document().skills;
        if let Ok(position) = selector.parse::<usize>() {
            let index = to_index(position)?;
            if index < skills.len() {
                return Ok(index);
            }
        }
        skills
            .iter()
            .position(|s| s.eq_ignore_ascii_case(selector.trim()))
            .ok_or_else(|| FolioError::NotFound(format!("no skill matches '{}'", selector)))
    }

    // --- documents ---

    pub fn new_document(&mut self, template_id: Option<&str>) -> Result<CmdResult> {
        commands::documents::new(&mut self.session, template_id)
    }

    pub fn save(&mut self, name: Option<&str>, tags: &[String]) -> Result<CmdResult> {
        commands::documents::save(&mut self.session, name, tags)
    }

    pub fn open_document(&mut self, selector: &str) -> Result<CmdResult> {
        commands::documents::open(&mut self.session, selector)
    }

    pub fn list_documents(&self, tag: Option<&str>) -> Result<CmdResult> {
        commands::documents::list(&self.session, tag)
    }

    pub fn delete_document(&mut self, selector: &str) -> Result<CmdResult> {
        commands::documents::delete(&mut self.session, selector)
    }

    pub fn duplicate_document(&self, selector: &str) -> Result<CmdResult> {
        commands::documents::duplicate(&self.session, selector)
    }

    pub fn rename_document(&self, selector: &str, name: &str) -> Result<CmdResult> {
        commands::documents::rename(&self.session, selector, name)
    }

    pub fn tag_document(
        &self,
        selector: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<CmdResult> {
        commands::documents::tag(&self.session, selector, add, remove)
    }

    pub fn select_template(&mut self, template_id: &str) -> Result<CmdResult> {
        commands::documents::template(&mut self.session, template_id)
    }

    // --- history ---

    pub fn undo(&mut self) -> Result<CmdResult> {
        commands::history::undo(&mut self.session)
    }

    pub fn redo(&mut self) -> Result<CmdResult> {
        commands::history::redo(&mut self.session)
    }

    pub fn go_to(&mut self, index: usize) -> Result<CmdResult> {
        commands::history::go_to(&mut self.session, index)
    }

    pub fn history(&mut self) -> Result<CmdResult> {
        commands::history::list(&mut self.session)
    }

    pub fn clear_history(&mut self) -> Result<CmdResult> {
        commands::history::clear(&mut self.session)
    }

    pub fn export_history(&mut self, path: &Path) -> Result<CmdResult> {
        commands::history::export(&mut self.session, path)
    }

    pub fn import_history(&mut self, path: &Path) -> Result<CmdResult> {
        commands::history::import(&mut self.session, path)
    }

    // --- backups ---

    pub fn create_backup(&mut self) -> Result<CmdResult> {
        commands::backup::create(&mut self.session)
    }

    pub fn list_backups(&self) -> Result<CmdResult> {
        commands::backup::list(&self.session)
    }

    pub fn restore_backup(&mut self, selector: &str) -> Result<CmdResult> {
        commands::backup::restore(&mut self.session, selector)
    }

    pub fn delete_backup(&self, selector: &str) -> Result<CmdResult> {
        commands::backup::delete(&self.session, selector)
    }

    pub fn export_bundle(&mut self, dir: &Path, compress: bool) -> Result<CmdResult> {
        commands::backup::export_file(&mut self.session, dir, compress)
    }

    pub fn import_bundle(&mut self, path: &Path) -> Result<CmdResult> {
        commands::backup::import_file(&mut self.session, path)
    }

    // --- settings and status ---

    pub fn preferences(&self) -> Result<CmdResult> {
        commands::prefs::show(&self.session)
    }

    pub fn set_preference(&self, key: &str, value: &str) -> Result<CmdResult> {
        commands::prefs::set(&self.session, key, value)
    }

    pub fn status(&mut self) -> Result<CmdResult> {
        let high = self.config.high_usage_percent;
        let result = commands::status::run(&mut self.session, high)?;
        Ok(result.with_paths(self.data_dir.iter().cloned().collect()))
    }

    pub fn sync_status(&self) -> Result<CmdResult> {
        commands::sync::status(&self.session)
    }

    pub fn sync_push(&mut self) -> Result<CmdResult> {
        commands::sync::push_all(&mut self.session)
    }

    // --- lifecycle ---

    /// Commit a debounced history entry whose window has elapsed.
    pub fn poll(&mut self) -> bool {
        self.session.poll()
    }

    /// Commit any pending debounced history entry. Call before the process exits.
    pub fn close(&mut self) -> bool {
        self.session.flush()
    }
}

fn to_index(position: usize) -> Result<usize> {
    position
        .checked_sub(1)
        .ok_or_else(|| FolioError::Validation("positions start at 1".to_string()))
}

/// The transport configured for sync: a mirror directory when one is set.
pub fn transport_for(config: &FolioConfig) -> Box<dyn Transport> {
    match &config.sync_dir {
        Some(dir) => Box::new(DirTransport::new(dir.clone())),
        None => Box::new(LogTransport),
    }
}

pub use crate::commands::{CmdMessage, MessageLevel};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemBackend;

    fn api() -> FolioApi<MemBackend> {
        FolioApi::open(
            MemBackend::new(),
            FolioConfig::default(),
            Rc::new(ManualClock::default()),
        )
    }

    #[test]
    fn test_set_personal_parses_field_names() {
        let mut api = api();
        api.set_personal("full-name", "Ada").unwrap();
        assert_eq!(api.session().document().personal_info.full_name, "Ada");
        assert!(matches!(
            api.set_personal("nickname", "x"),
            Err(FolioError::Validation(_))
        ));
    }

    #[test]
    fn test_close_commits_pending_edit() {
        let mut api = api();
        api.set_personal("email", "ada@example.com").unwrap();
        assert!(api.session().history().has_pending());
        assert!(api.close());
        assert_eq!(api.session().history().len(), 2);
    }

    #[test]
    fn test_entry_selectors_use_positions() {
        let mut api = api();
        api.edit(&[
            Edit::AddExperience(Experience::new("A", "x")),
            Edit::AddExperience(Experience::new("B", "y")),
        ])
        .unwrap();
        assert_eq!(api.find_experience("2").unwrap().company, "B");

        api.move_experience("2", 1).unwrap();
        assert_eq!(api.session().document().experience[0].company, "B");

        api.remove_experience("1").unwrap();
        assert_eq!(api.session().document().experience.len(), 1);
        assert!(api.move_experience("1", 0).is_err());
    }

    #[test]
    fn test_skill_selectors() {
        let mut api = api();
        api.edit(&[Edit::AddSkill("Rust".into()), Edit::AddSkill("Go".into())])
            .unwrap();
        api.move_skill("go", 1).unwrap();
        assert_eq!(api.session().document().skills, vec!["Go", "Rust"]);
        api.remove_skill("2").unwrap();
        assert_eq!(api.session().document().skills, vec!["Go"]);
    }

    #[test]
    fn test_transport_choice() {
        assert_eq!(transport_for(&FolioConfig::default()).name(), "log");
        let config = FolioConfig {
            sync_dir: Some(PathBuf::from("/tmp/folio-sync")),
            ..Default::default()
        };
        assert_eq!(transport_for(&config).name(), "dir");
    }
}
