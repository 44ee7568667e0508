//! # Sync Queue
//!
//! An in-memory FIFO of writes that have not reached a remote counterpart yet.
//!
//! Once [attached](SyncQueue::attach) to a [`KvStore`], every successful save is enqueued
//! as `{key, data, timestamp}`. While the queue is online and enabled it drains in order,
//! one [`Transport::push`] per item. A failed push puts the item back at the front and
//! stops the drain, so a retry can never overtake a newer write. A transport that reports
//! [`FolioError::Offline`] takes the queue offline until [`SyncQueue::set_online`] brings
//! it back.
//!
//! There is no remote service behind this. [`LogTransport`] acknowledges everything and
//! [`DirTransport`] mirrors items into a local directory; anything implementing
//! [`Transport`] can stand in for a real endpoint.

use crate::error::{FolioError, Result};
use crate::store::{KvStore, StorageBackend, StorageEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    pub key: String,
    pub data: Value,
    pub timestamp: i64,
}

/// The remote side of the queue.
pub trait Transport {
    /// Deliver one item. `Err(FolioError::Offline)` means the remote is unreachable.
    fn push(&self, item: &SyncQueueItem) -> Result<()>;

    fn name(&self) -> &str;
}

/// Acknowledges every item without sending it anywhere.
#[derive(Debug, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn push(&self, item: &SyncQueueItem) -> Result<()> {
        info!(key = %item.key, timestamp = item.timestamp, "sync push (no remote configured)");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Mirrors each key's latest item as `<key>.json` inside a directory.
#[derive(Debug)]
pub struct DirTransport {
    dir: PathBuf,
}

impl DirTransport {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn item_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl Transport for DirTransport {
    fn push(&self, item: &SyncQueueItem) -> Result<()> {
        if !self.dir.is_dir() {
            // An unmounted or removed target behaves like a remote that went away
            return Err(FolioError::Offline);
        }
        let path = self.item_path(&item.key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(item)?;
        fs::write(&tmp, json).map_err(|e| FolioError::Transport(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| FolioError::Transport(e.to_string()))?;
        debug!(path = %path.display(), "mirrored sync item");
        Ok(())
    }

    fn name(&self) -> &str {
        "dir"
    }
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub pushed: usize,
    pub remaining: usize,
    /// The pass stopped with items still queued (offline, disabled or a failed push).
    pub halted: bool,
}

#[derive(Debug)]
struct QueueState {
    items: VecDeque<SyncQueueItem>,
    online: bool,
    enabled: bool,
}

impl QueueState {
    /// Queue `item` behind everything else. Only the latest value per key is sent, so an
    /// older pending item for the same key is dropped.
    fn push(&mut self, item: SyncQueueItem) {
        self.items.retain(|queued| queued.key != item.key);
        self.items.push_back(item);
    }
}

struct Inner {
    state: RefCell<QueueState>,
    transport: Box<dyn Transport>,
}

/// Cheap to clone: clones share one queue.
#[derive(Clone)]
pub struct SyncQueue {
    inner: Rc<Inner>,
}

impl SyncQueue {
    pub fn new(transport: Box<dyn Transport>, enabled: bool) -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(QueueState {
                    items: VecDeque::new(),
                    online: true,
                    enabled,
                }),
                transport,
            }),
        }
    }

    /// Enqueue every successful save made through `kv`.
    pub fn attach<B: StorageBackend>(&self, kv: &KvStore<B>) {
        let queue = self.clone();
        kv.subscribe(move |event| {
            if let StorageEvent::Saved {
                key,
                data,
                timestamp,
            } = event
            {
                queue.enqueue(SyncQueueItem {
                    key: key.clone(),
                    data: data.clone(),
                    timestamp: *timestamp,
                });
            }
        });
    }

    /// Add an item and drain if the queue is online. Ignored while sync is disabled.
    ///
    /// A pending item for the same key is replaced, and the new one goes to the back.
    pub fn enqueue(&self, item: SyncQueueItem) {
        let online = {
            let mut state = self.inner.state.borrow_mut();
            if !state.enabled {
                return;
            }
            debug!(key = %item.key, "queued for sync");
            state.push(item);
            state.online
        };
        if online {
            self.drain();
        }
    }

    /// Add several items, then drain once. Ignored while sync is disabled.
    pub fn enqueue_all(&self, items: impl IntoIterator<Item = SyncQueueItem>) -> DrainReport {
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.enabled {
                return DrainReport::default();
            }
            for item in items {
                state.push(item);
            }
        }
        self.drain()
    }

    /// Push queued items in order until the queue is empty or a push fails.
    pub fn drain(&self) -> DrainReport {
        let mut report = DrainReport::default();
        loop {
            let item = {
                let mut state = self.inner.state.borrow_mut();
                if !state.online || !state.enabled {
                    break;
                }
                match state.items.pop_front() {
                    Some(item) => item,
                    None => break,
                }
            };

            match self.inner.transport.push(&item) {
                Ok(()) => report.pushed += 1,
                Err(e) => {
                    let mut state = self.inner.state.borrow_mut();
                    if matches!(e, FolioError::Offline) {
                        warn!(transport = self.inner.transport.name(), "remote offline, sync paused");
                        state.online = false;
                    } else {
                        warn!(key = %item.key, error = %e, "sync push failed, will retry");
                    }
                    state.items.push_front(item);
                    break;
                }
            }
        }

        report.remaining = self.pending_count();
        report.halted = report.remaining > 0;
        if report.pushed > 0 {
            debug!(pushed = report.pushed, remaining = report.remaining, "sync drain");
        }
        report
    }

    /// Going online resumes draining; the returned report covers that pass.
    pub fn set_online(&self, online: bool) -> DrainReport {
        self.inner.state.borrow_mut().online = online;
        info!(online, "sync connectivity changed");
        if online {
            self.drain()
        } else {
            DrainReport {
                remaining: self.pending_count(),
                halted: self.pending_count() > 0,
                ..Default::default()
            }
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.state.borrow_mut().enabled = enabled;
    }

    pub fn is_online(&self) -> bool {
        self.inner.state.borrow().online
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.state.borrow().enabled
    }

    pub fn pending_count(&self) -> usize {
        self.inner.state.borrow().items.len()
    }

    pub fn pending(&self) -> Vec<SyncQueueItem> {
        self.inner.state.borrow().items.iter().cloned().collect()
    }

    pub fn transport_name(&self) -> &str {
        self.inner.transport.name()
    }
}
