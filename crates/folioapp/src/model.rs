//! # Domain Model
//!
//! The editable resume ([`ResumeDocument`]) and the records persisted around it:
//! [`SavedDocument`], [`CurrentDraft`], [`Preferences`] and [`TemplateSelection`].
//!
//! ## Identity and Order
//!
//! A resume has no identity of its own while it is being edited. It only gets one when it
//! is saved as a [`SavedDocument`], whose `id` then stays stable across saves.
//!
//! Inside a resume, list order is meaningful: it is the render order. Experience and
//! education entries carry an `id` assigned when the entry is created, so an entry can be
//! addressed regardless of where reorders move it. Skills are plain strings and are
//! addressed by position.
//!
//! ## Wire Format
//!
//! Persisted records use camelCase field names (`templateId`, `createdAt`). Every field of
//! the resume itself defaults when absent, so older or partial payloads still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

pub const DEFAULT_TEMPLATE: &str = "modern";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub website: String,
    pub summary: String,
}

/// Settable personal-info fields, addressed by name from UIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalField {
    FullName,
    Email,
    Phone,
    Location,
    Website,
    Summary,
}

impl PersonalField {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "name" | "fullname" => Some(Self::FullName),
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "location" => Some(Self::Location),
            "website" | "url" => Some(Self::Website),
            "summary" => Some(Self::Summary),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FullName => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Location => "location",
            Self::Website => "website",
            Self::Summary => "summary",
        }
    }
}

impl PersonalInfo {
    pub fn set(&mut self, field: PersonalField, value: String) {
        let slot = match field {
            PersonalField::FullName => &mut self.full_name,
            PersonalField::Email => &mut self.email,
            PersonalField::Phone => &mut self.phone,
            PersonalField::Location => &mut self.location,
            PersonalField::Website => &mut self.website,
            PersonalField::Summary => &mut self.summary,
        };
        *slot = value;
    }

    pub fn get(&self, field: PersonalField) -> &str {
        match field {
            PersonalField::FullName => &self.full_name,
            PersonalField::Email => &self.email,
            PersonalField::Phone => &self.phone,
            PersonalField::Location => &self.location,
            PersonalField::Website => &self.website,
            PersonalField::Summary => &self.summary,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    pub id: String,
    pub company: String,
    pub position: String,
    pub location: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub current: bool,
    pub description: String,
    pub highlights: Vec<String>,
}

impl Experience {
    pub fn new(company: impl Into<String>, position: impl Into<String>) -> Self {
        Self {
            id: new_item_id(),
            company: company.into(),
            position: position.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    pub id: String,
    pub institution: String,
    pub degree: String,
    pub field: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub gpa: Option<String>,
}

impl Education {
    pub fn new(institution: impl Into<String>, degree: impl Into<String>) -> Self {
        Self {
            id: new_item_id(),
            institution: institution.into(),
            degree: degree.into(),
            ..Default::default()
        }
    }
}

/// The user's editable resume content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeDocument {
    pub personal_info: PersonalInfo,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub skills: Vec<String>,
}

impl ResumeDocument {
    /// Name used when saving without an explicit document name.
    pub fn display_name(&self) -> String {
        let name = self.personal_info.full_name.trim();
        if name.is_empty() {
            "Untitled resume".to_string()
        } else {
            format!("{} resume", name)
        }
    }

    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }
}

fn new_item_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// One persisted resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDocument {
    pub id: String,
    pub name: String,
    pub template_id: String,
    pub data: ResumeDocument,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl SavedDocument {
    pub fn new(
        name: impl Into<String>,
        template_id: impl Into<String>,
        data: ResumeDocument,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            template_id: template_id.into(),
            data,
            created_at: now,
            updated_at: now,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// The single work-in-progress slot used to resume editing after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentDraft {
    pub data: ResumeDocument,
    pub template_id: String,
    pub timestamp: DateTime<Utc>,
    /// Saved document this draft was opened from, if any.
    #[serde(default)]
    pub document_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub theme: String,
    pub auto_save: bool,
    pub default_template: String,
    pub page_size: PageSize,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: "system".to_string(),
            auto_save: true,
            default_template: DEFAULT_TEMPLATE.to_string(),
            page_size: PageSize::A4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSelection {
    pub template_id: String,
    pub selected_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personal_field_parse_accepts_aliases() {
        assert_eq!(PersonalField::parse("name"), Some(PersonalField::FullName));
        assert_eq!(
            PersonalField::parse("full-name"),
            Some(PersonalField::FullName)
        );
        assert_eq!(PersonalField::parse("Full_Name"), Some(PersonalField::FullName));
        assert_eq!(PersonalField::parse("url"), Some(PersonalField::Website));
        assert_eq!(PersonalField::parse("nickname"), None);
    }

    #[test]
    fn test_partial_resume_payload_defaults_missing_fields() {
        let doc: ResumeDocument =
            serde_json::from_str(r#"{"personalInfo":{"fullName":"A"}}"#).unwrap();
        assert_eq!(doc.personal_info.full_name, "A");
        assert!(doc.experience.is_empty());
        assert!(doc.skills.is_empty());
    }

    #[test]
    fn test_saved_document_uses_camel_case() {
        let doc = SavedDocument::new("Mine", "modern", ResumeDocument::default(), Utc::now())
            .with_tags(["tech"]);
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("templateId").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["tags"][0], "tech");
    }

    #[test]
    fn test_display_name() {
        let mut doc = ResumeDocument::default();
        assert_eq!(doc.display_name(), "Untitled resume");
        doc.personal_info.full_name = "Ada".into();
        assert_eq!(doc.display_name(), "Ada resume");
    }

    #[test]
    fn test_new_entries_get_distinct_ids() {
        let a = Experience::new("Acme", "Engineer");
        let b = Experience::new("Acme", "Engineer");
        assert_ne!(a.id, b.id);
        assert!(!Education::new("MIT", "BSc").id.is_empty());
    }
}
