//! Structured edits of the live resume.
//!
//! Every edit updates the draft slot and records a history entry labelled by the section
//! it touched. Personal-info fields are typed continuously in an editor, so those edits
//! go through the debounced append; everything else is recorded immediately.

use crate::commands::{CmdMessage, CmdResult};
use crate::error::{FolioError, Result};
use crate::model::{Education, Experience, PersonalField, ResumeDocument};
use crate::session::Session;
use crate::store::StorageBackend;

pub const ACTION_PERSONAL_INFO: &str = "personal-info";
pub const ACTION_EXPERIENCE: &str = "experience";
pub const ACTION_EDUCATION: &str = "education";
pub const ACTION_SKILLS: &str = "skills";

#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    SetPersonal { field: PersonalField, value: String },
    AddExperience(Experience),
    /// Replace the experience entry with the same id.
    UpdateExperience(Experience),
    RemoveExperience { id: String },
    MoveExperience { id: String, to: usize },
    AddEducation(Education),
    UpdateEducation(Education),
    RemoveEducation { id: String },
    MoveEducation { id: String, to: usize },
    AddSkill(String),
    RemoveSkill { index: usize },
    MoveSkill { from: usize, to: usize },
}

impl Edit {
    pub fn action(&self) -> &'static str {
        match self {
            Edit::SetPersonal { .. } => ACTION_PERSONAL_INFO,
            Edit::AddExperience(_)
            | Edit::UpdateExperience(_)
            | Edit::RemoveExperience { .. }
            | Edit::MoveExperience { .. } => ACTION_EXPERIENCE,
            Edit::AddEducation(_)
            | Edit::UpdateEducation(_)
            | Edit::RemoveEducation { .. }
            | Edit::MoveEducation { .. } => ACTION_EDUCATION,
            Edit::AddSkill(_) | Edit::RemoveSkill { .. } | Edit::MoveSkill { .. } => ACTION_SKILLS,
        }
    }

    /// Continuous edits collapse into one history entry per debounce window.
    pub fn is_continuous(&self) -> bool {
        matches!(self, Edit::SetPersonal { .. })
    }

    /// Apply the edit to `doc`. `doc` is unchanged when this fails.
    pub fn apply(&self, doc: &mut ResumeDocument) -> Result<String> {
        match self {
            Edit::SetPersonal { field, value } => {
                doc.personal_info.set(*field, value.clone());
                Ok(format!("Updated {}", field.label()))
            }
            Edit::AddExperience(entry) => {
                doc.experience.push(entry.clone());
                Ok(format!("Added experience at {}", entry.company))
            }
            Edit::UpdateExperience(entry) => {
                let slot = find_mut(&mut doc.experience, &entry.id, |e| &e.id, "experience")?;
                *slot = entry.clone();
                Ok(format!("Updated experience at {}", entry.company))
            }
            Edit::RemoveExperience { id } => {
                let removed = remove_by_id(&mut doc.experience, id, |e| &e.id, "experience")?;
                Ok(format!("Removed experience at {}", removed.company))
            }
            Edit::MoveExperience { id, to } => {
                move_by_id(&mut doc.experience, id, *to, |e| &e.id, "experience")?;
                Ok(format!("Moved experience to position {}", to + 1))
            }
            Edit::AddEducation(entry) => {
                doc.education.push(entry.clone());
                Ok(format!("Added education at {}", entry.institution))
            }
            Edit::UpdateEducation(entry) => {
                let slot = find_mut(&mut doc.education, &entry.id, |e| &e.id, "education")?;
                *slot = entry.clone();
                Ok(format!("Updated education at {}", entry.institution))
            }
            Edit::RemoveEducation { id } => {
                let removed = remove_by_id(&mut doc.education, id, |e| &e.id, "education")?;
                Ok(format!("Removed education at {}", removed.institution))
            }
            Edit::MoveEducation { id, to } => {
                move_by_id(&mut doc.education, id, *to, |e| &e.id, "education")?;
                Ok(format!("Moved education to position {}", to + 1))
            }
            Edit::AddSkill(skill) => {
                let skill = skill.trim();
                if skill.is_empty() {
                    return Err(FolioError::Validation("skill cannot be empty".to_string()));
                }
                if doc.skills.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
                    return Err(FolioError::Validation(format!(
                        "skill '{}' is already listed",
                        skill
                    )));
                }
                doc.skills.push(skill.to_string());
                Ok(format!("Added skill {}", skill))
            }
            Edit::RemoveSkill { index } => {
                if *index >= doc.skills.len() {
                    return Err(FolioError::NotFound(format!(
                        "no skill at position {}",
                        index + 1
                    )));
                }
                let removed = doc.skills.remove(*index);
                Ok(format!("Removed skill {}", removed))
            }
            Edit::MoveSkill { from, to } => {
                if *from >= doc.skills.len() {
                    return Err(FolioError::NotFound(format!(
                        "no skill at position {}",
                        from + 1
                    )));
                }
                let skill = doc.skills.remove(*from);
                let to = (*to).min(doc.skills.len());
                doc.skills.insert(to, skill);
                Ok(format!("Moved skill to position {}", to + 1))
            }
        }
    }
}

fn find_mut<'a, T>(
    items: &'a mut [T],
    id: &str,
    id_of: impl Fn(&T) -> &String,
    kind: &str,
) -> Result<&'a mut T> {
    items
        .iter_mut()
        .find(|item| id_of(item) == id)
        .ok_or_else(|| FolioError::NotFound(format!("no {} entry with id {}", kind, id)))
}

fn remove_by_id<T>(
    items: &mut Vec<T>,
    id: &str,
    id_of: impl Fn(&T) -> &String,
    kind: &str,
) -> Result<T> {
    let position = items
        .iter()
        .position(|item| id_of(item) == id)
        .ok_or_else(|| FolioError::NotFound(format!("no {} entry with id {}", kind, id)))?;
    Ok(items.remove(position))
}

fn move_by_id<T>(
    items: &mut Vec<T>,
    id: &str,
    to: usize,
    id_of: impl Fn(&T) -> &String,
    kind: &str,
) -> Result<()> {
    let item = remove_by_id(items, id, id_of, kind)?;
    let to = to.min(items.len());
    items.insert(to, item);
    Ok(())
}

/// Apply `edits` in order to the live draft.
///
/// Edits are all-or-nothing: they are applied to a copy, and the draft and history only
/// change when every edit succeeded. The whole batch becomes one history entry.
pub fn run<B: StorageBackend>(session: &mut Session<B>, edits: &[Edit]) -> Result<CmdResult> {
    let Some(first) = edits.first() else {
        return Ok(CmdResult::default());
    };

    let mut doc = session.document().clone();
    let mut descriptions = Vec::with_capacity(edits.len());
    for edit in edits {
        descriptions.push(edit.apply(&mut doc)?);
    }

    let action = if edits.iter().all(|e| e.action() == first.action()) {
        first.action()
    } else {
        "edit"
    };
    let description = descriptions.join("; ");

    let mut result = CmdResult::default();
    if !session.set_document(doc.clone()) {
        result.add_message(CmdMessage::warning(
            "Draft could not be saved, changes are only in memory",
        ));
    }
    if edits.iter().all(Edit::is_continuous) {
        session
            .history_mut()
            .append_debounced(&doc, action, Some(&description));
    } else {
        session.history_mut().append(&doc, action, Some(&description));
    }

    for text in descriptions {
        result.add_message(CmdMessage::success(text));
    }
    Ok(result.with_draft(session.draft().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mem_session;

    fn set(field: PersonalField, value: &str) -> Edit {
        Edit::SetPersonal {
            field,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_personal_edits_are_debounced() {
        let (clock, mut session) = mem_session();
        run(&mut session, &[set(PersonalField::FullName, "A")]).unwrap();
        clock.advance_millis(300);
        run(&mut session, &[set(PersonalField::FullName, "Ad")]).unwrap();
        clock.advance_millis(300);
        run(&mut session, &[set(PersonalField::FullName, "Ada")]).unwrap();

        // Draft follows every keystroke, history waits for the window
        assert_eq!(session.document().personal_info.full_name, "Ada");
        assert_eq!(session.history().len(), 1);

        clock.advance_millis(1_000);
        assert!(session.poll());
        assert_eq!(session.history().len(), 2);
        let entry = session.history().current();
        assert_eq!(entry.action, ACTION_PERSONAL_INFO);
        assert_eq!(entry.data.personal_info.full_name, "Ada");
    }

    #[test]
    fn test_structural_edits_record_immediately() {
        let (_, mut session) = mem_session();
        let job = Experience::new("Acme", "Engineer");
        run(&mut session, &[Edit::AddExperience(job.clone())]).unwrap();
        run(&mut session, &[Edit::AddSkill("Rust".into())]).unwrap();

        let history = session.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history.entries()[1].action, ACTION_EXPERIENCE);
        assert_eq!(history.entries()[2].action, ACTION_SKILLS);
        assert_eq!(history.entries()[2].label(), "Added skill Rust");
    }

    #[test]
    fn test_pending_personal_edit_lands_before_next_edit() {
        let (_, mut session) = mem_session();
        run(&mut session, &[set(PersonalField::Email, "a@b.c")]).unwrap();
        run(&mut session, &[Edit::AddSkill("SQL".into())]).unwrap();

        let actions: Vec<&str> = session
            .history()
            .entries()
            .iter()
            .map(|e| e.action.as_str())
            .collect();
        assert_eq!(actions, vec!["init", ACTION_PERSONAL_INFO, ACTION_SKILLS]);
    }

    #[test]
    fn test_failed_batch_changes_nothing() {
        let (_, mut session) = mem_session();
        let result = run(
            &mut session,
            &[
                Edit::AddSkill("Go".into()),
                Edit::RemoveExperience { id: "missing".into() },
            ],
        );
        assert!(matches!(result, Err(FolioError::NotFound(_))));
        assert!(session.document().skills.is_empty());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_move_and_remove_entries() {
        let mut doc = ResumeDocument::default();
        let a = Experience::new("A", "x");
        let b = Experience::new("B", "y");
        Edit::AddExperience(a.clone()).apply(&mut doc).unwrap();
        Edit::AddExperience(b.clone()).apply(&mut doc).unwrap();

        Edit::MoveExperience {
            id: b.id.clone(),
            to: 0,
        }
        .apply(&mut doc)
        .unwrap();
        assert_eq!(doc.experience[0].company, "B");

        Edit::RemoveExperience { id: a.id.clone() }
            .apply(&mut doc)
            .unwrap();
        assert_eq!(doc.experience.len(), 1);
    }

    #[test]
    fn test_skill_validation() {
        let mut doc = ResumeDocument::default();
        Edit::AddSkill("Rust".into()).apply(&mut doc).unwrap();
        assert!(Edit::AddSkill("rust".into()).apply(&mut doc).is_err());
        assert!(Edit::AddSkill("  ".into()).apply(&mut doc).is_err());
        assert!(Edit::RemoveSkill { index: 4 }.apply(&mut doc).is_err());

        Edit::AddSkill("SQL".into()).apply(&mut doc).unwrap();
        Edit::MoveSkill { from: 1, to: 0 }.apply(&mut doc).unwrap();
        assert_eq!(doc.skills, vec!["SQL", "Rust"]);
    }
}
