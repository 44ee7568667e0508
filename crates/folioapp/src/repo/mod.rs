//! # Entity Repositories
//!
//! Typed views over specific keys of the [`KvStore`](crate::store::KvStore). Each
//! repository owns one logical collection and never writes another collection's key.
//!
//! - [`documents::DocumentRepository`]: the saved-documents list (create, read, update,
//!   delete, list).
//! - [`slots::DraftRepository`]: the single work-in-progress draft.
//! - [`slots::PreferencesRepository`], [`slots::TemplateRepository`]: single-slot settings.
//!
//! Writes report success as `bool`, like the store underneath.

pub mod documents;
pub mod slots;

pub use documents::DocumentRepository;
pub use slots::{DraftRepository, PreferencesRepository, SlotRepository, TemplateRepository};
