//! # Folio CLI
//!
//! Folio ships a command-line client, but the binary is thin: the CLI lives in
//! `src/cli/`, while this file only invokes `cli::run()` and handles process termination.
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/folio/src/cli/)                          │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Dispatch + context wiring (mod.rs)                       │
//! │  - Terminal rendering (render.rs)                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (crates/folioapp/src/api.rs)                     │
//! │  - Normalizes selectors, positions and field names          │
//! │  - Returns structured `CmdResult` values                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything from `api.rs` inward is UI agnostic. The CLI owns argument parsing,
//! context initialization, rendering and exit codes.
//!
//! ## One Process, One Edit
//!
//! Each invocation opens the data directory, runs one command and exits. Debounced
//! history entries are committed before exit, so `folio set name ...` always leaves an
//! undoable entry behind.
//!
//! ## Testing Approach
//!
//! - Business logic is tested in `folioapp`.
//! - `tests/` here runs the built binary against a temporary data directory.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
