//! Destinations for self-watch snapshots.

use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use anyhow::Context;

use super::WatchSnapshot;

/// Addressable target receiving self-watch snapshots.
///
/// Each write supersedes the previous one, the way a status blob is
/// overwritten; sinks that keep history do so for inspection only.
pub trait WatchSink: Send + Sync + Debug {
    fn write_snapshot(&self, snapshot: &WatchSnapshot) -> anyhow::Result<()>;
}

/// Keeps every snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryWatchSink {
    snapshots: Mutex<Vec<WatchSnapshot>>,
}

impl MemoryWatchSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<WatchSnapshot> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last(&self) -> Option<WatchSnapshot> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }
}

impl WatchSink for MemoryWatchSink {
    fn write_snapshot(&self, snapshot: &WatchSnapshot) -> anyhow::Result<()> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot.clone());
        Ok(())
    }
}

/// Overwrites a file with the rendered snapshot on every write.
#[derive(Debug, Clone)]
pub struct FileWatchSink {
    path: PathBuf,
}

impl FileWatchSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WatchSink for FileWatchSink {
    fn write_snapshot(&self, snapshot: &WatchSnapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| format!("failed to create self-watch directory {}", parent.display()))?;
        }
        fs::write(&self.path, snapshot.render()).with_context(|| format!("failed to write self-watch file {}", self.path.display()))
    }
}
