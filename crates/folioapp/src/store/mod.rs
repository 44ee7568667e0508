//! # Storage Layer
//!
//! Durable, integrity-checked storage of named values on a small synchronous medium.
//!
//! ## Two Layers
//!
//! 1. **Medium** ([`backend::StorageBackend`]): raw string-keyed reads and writes with a
//!    fixed quota and no transactions. [`fs_backend::FsBackend`] keeps one file per key;
//!    [`mem_backend::MemBackend`] keeps everything in memory for tests.
//! 2. **Store** ([`kv::KvStore`]): wraps every value in a [`envelope::StorageEnvelope`]
//!    (schema version, timestamp, checksum), namespaces keys, verifies on load and
//!    manages capacity.
//!
//! ## Integrity
//!
//! A load that finds a checksum mismatch or an unreadable envelope removes the entry and
//! reports it as absent. Corrupted data is never returned.
//!
//! ## Capacity
//!
//! A write that hits the medium quota triggers a cleanup pass (corrupted entries, then
//! the oldest backups) and a single retry. If that also fails the save reports `false`
//! and the previous value stays in place.
//!
//! ## Storage Layout
//!
//! ```text
//! <data dir>/
//! ├── folio%3Asaved_resumes.json        # Saved documents (one list)
//! ├── folio%3Acurrent_resume.json       # Work-in-progress draft
//! ├── folio%3Auser_preferences.json
//! ├── folio%3Aselected_template.json
//! ├── folio%3Ahistory_<doc>.json        # Undo/redo log per document
//! └── folio%3Abackup_<millis>.json      # Rotating backups
//! ```
//!
//! ## Known Limitation
//!
//! Each `save` is one atomic write. Updates that span two keys are two writes; a crash
//! between them can leave one updated and the other stale. Two processes writing the
//! same key is last-write-wins.

pub mod backend;
pub mod envelope;
pub mod fs_backend;
pub mod keys;
pub mod kv;
pub mod mem_backend;

pub use backend::StorageBackend;
pub use envelope::{StorageEnvelope, SCHEMA_VERSION};
pub use fs_backend::FsBackend;
pub use kv::{KvStore, Loaded, StorageEvent, StorageUsage, StoreSettings};
pub use mem_backend::MemBackend;
