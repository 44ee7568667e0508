use crate::api::FolioApi;
use crate::backup::BackupSettings;
use crate::clock::ManualClock;
use crate::config::FolioConfig;
use crate::history::HistorySettings;
use crate::model::{Education, Experience, ResumeDocument};
use crate::session::Session;
use crate::store::{FsBackend, KvStore, MemBackend};
use crate::sync::{LogTransport, SyncQueue, Transport};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// A filesystem-backed API in a temporary directory, on a manual clock.
pub struct TestEnv {
    // Keeps the directory alive until the test is done
    pub _temp_dir: TempDir,
    pub root: PathBuf,
    pub clock: Rc<ManualClock>,
    pub api: FolioApi<FsBackend>,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(FolioConfig::default())
    }

    pub fn with_config(config: FolioConfig) -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let clock = Rc::new(ManualClock::default());
        let api = open_fs_api(&root, config, clock.clone());
        Self {
            _temp_dir: temp_dir,
            root,
            clock,
            api,
        }
    }

    /// Drop the current API and open a new one on the same directory, as a restart would.
    pub fn reopen(&mut self) {
        self.api.close();
        let config = self.api.config().clone();
        self.api = open_fs_api(&self.root, config, self.clock.clone());
    }
}

fn open_fs_api(root: &Path, config: FolioConfig, clock: Rc<ManualClock>) -> FolioApi<FsBackend> {
    let backend = FsBackend::new(root.to_path_buf()).with_quota(config.capacity_bytes);
    FolioApi::open(backend, config, clock).with_data_dir(root.to_path_buf())
}

/// An in-memory session with sync disabled.
pub fn mem_session() -> (Rc<ManualClock>, Session<MemBackend>) {
    build_mem_session(Box::new(LogTransport), false)
}

/// An in-memory session with sync enabled over `transport`.
pub fn mem_session_with_sync(transport: Box<dyn Transport>) -> (Rc<ManualClock>, Session<MemBackend>) {
    build_mem_session(transport, true)
}

fn build_mem_session(
    transport: Box<dyn Transport>,
    sync_enabled: bool,
) -> (Rc<ManualClock>, Session<MemBackend>) {
    let clock = Rc::new(ManualClock::default());
    let kv = Rc::new(KvStore::new(MemBackend::new()).with_clock(clock.clone()));
    let session = Session::open(
        kv,
        HistorySettings::default(),
        BackupSettings::default(),
        SyncQueue::new(transport, sync_enabled),
    );
    (clock, session)
}

/// A filled-in resume.
pub fn sample_document() -> ResumeDocument {
    let mut doc = ResumeDocument::default();
    doc.personal_info.full_name = "Ada Lovelace".to_string();
    doc.personal_info.email = "ada@example.com".to_string();
    doc.personal_info.summary = "Analyst and first programmer.".to_string();

    let mut job = Experience::new("Analytical Engine Co.", "Programmer");
    job.start_date = "1842-01".to_string();
    job.end_date = Some("1843-09".to_string());
    job.highlights = vec!["Published the first algorithm for a machine".to_string()];
    doc.experience.push(job);

    let mut school = Education::new("Home tutoring", "Mathematics");
    school.field = "Mathematics".to_string();
    doc.education.push(school);

    doc.skills = vec!["Mathematics".to_string(), "Notes".to_string()];
    doc
}
