//! # Startup
//!
//! Resolves where folio keeps its data, loads the config found there and builds the
//! application context on the filesystem medium.
//!
//! ## Data Directory Resolution
//!
//! 1. An explicit override (the CLI's `--data-dir`).
//! 2. The `FOLIO_DATA_DIR` environment variable.
//! 3. The OS data directory for folio (via the `directories` crate), e.g.
//!    `~/.local/share/folio` on Linux.
//!
//! The directory is created if it does not exist yet. `folio.toml` is read from the same
//! directory.

use crate::api::FolioApi;
use crate::clock::SystemClock;
use crate::config::{self, FolioConfig};
use crate::error::{FolioError, Result};
use crate::store::FsBackend;
use directories::ProjectDirs;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

pub const DATA_DIR_ENV: &str = "FOLIO_DATA_DIR";

pub struct FolioContext {
    pub api: FolioApi<FsBackend>,
    pub config: FolioConfig,
    pub data_dir: PathBuf,
}

pub fn resolve_data_dir(data_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = data_override {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    ProjectDirs::from("com", "folio", "folio")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            FolioError::Config(format!(
                "could not determine a data directory; set {} or pass --data-dir",
                DATA_DIR_ENV
            ))
        })
}

/// Build the filesystem-backed context.
pub fn initialize(data_override: Option<PathBuf>) -> Result<FolioContext> {
    let data_dir = resolve_data_dir(data_override)?;
    fs::create_dir_all(&data_dir)?;

    let config = config::load(&data_dir);
    debug!(data_dir = %data_dir.display(), ?config, "initializing");

    let backend = FsBackend::new(data_dir.clone()).with_quota(config.capacity_bytes);
    let api = FolioApi::open(backend, config.clone(), Rc::new(SystemClock))
        .with_data_dir(data_dir.clone());

    Ok(FolioContext {
        api,
        config,
        data_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_data_dir(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn test_initialize_creates_data_dir_and_persists() {
        let temp = tempfile::tempdir().unwrap();
        let data_dir = temp.path().join("nested").join("folio");

        {
            let mut ctx = initialize(Some(data_dir.clone())).unwrap();
            assert!(data_dir.is_dir());
            ctx.api.set_personal("name", "Ada").unwrap();
            ctx.api.save(Some("CV"), &[]).unwrap();
        }

        let ctx = initialize(Some(data_dir)).unwrap();
        let docs = ctx.api.list_documents(None).unwrap().documents;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "CV");
        assert_eq!(ctx.api.session().document().personal_info.full_name, "Ada");
    }
}
