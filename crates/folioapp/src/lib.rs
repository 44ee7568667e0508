//! # Folio Architecture
//!
//! Folio keeps resumes: a live draft that is edited field by field, named saved
//! documents, an undo/redo history per document and rotating backups, all on a small
//! key-value medium with a fixed quota.
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/folio)                                   │
//! │  - Argument parsing, terminal output, exit codes            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Normalizes selectors and field names                     │
//! │  - Dispatches to command functions                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*) over a Session (session.rs)     │
//! │  - Business logic, returns CmdResult                        │
//! │  - Session: the one context object, no globals              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Services: history/, backup.rs, sync.rs                     │
//! │  Repositories: repo/ (documents, draft, preferences, ...)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - Checksummed envelopes, quota handling, change events     │
//! │  - FsBackend (files) or MemBackend (tests)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## No I/O Assumptions in Core
//!
//! Nothing from `api.rs` inward prints or exits. Commands return `Result<CmdResult>`
//! with leveled messages and the data a UI needs; the CLI decides how to show them.
//! Time comes from an injected [`clock::Clock`], so history debounce and backup
//! rotation are tested without sleeping.
//!
//! ## Testing Strategy
//!
//! - Unit tests next to each module, on `MemBackend` and `ManualClock`
//! - `tests/` in this crate: the filesystem medium and end-to-end flows through
//!   [`api::FolioApi`]
//! - The CLI crate runs the binary with `assert_cmd` against a temporary data dir
//!
//! ## Module Overview
//!
//! - [`api`]: the facade, entry point for all operations
//! - [`commands`]: business logic for each command
//! - [`session`]: the application context (repositories, history, backups, sync)
//! - [`history`]: undo/redo log with debounced commits
//! - [`backup`]: bundle export/import and rotating backups
//! - [`sync`]: outbound change queue and transports
//! - [`repo`]: typed repositories over the store
//! - [`store`]: envelopes, media and capacity management
//! - [`model`]: resume data types
//! - [`config`]: `folio.toml` settings
//! - [`init`]: data directory resolution and startup
//! - [`clock`]: time source
//! - [`error`]: error types

pub mod api;
pub mod backup;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod init;
pub mod model;
pub mod repo;
pub mod session;
pub mod store;
pub mod sync;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
