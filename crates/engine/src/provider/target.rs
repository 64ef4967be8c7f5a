//! Destinations for collector batches.

use std::{
    fmt::Debug,
    fs::{OpenOptions, create_dir_all},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use serde_json::Value;

use crate::Fault;

/// Receives batches of items flushed by a [`BatchCollector`](super::BatchCollector).
///
/// Implementations must be safe to call from the collector while it holds its
/// buffer lock; a batch is delivered at most once.
pub trait OutputTarget: Send + Sync + Debug {
    fn send_batch(&self, items: &[Value]) -> Result<(), Fault>;
}

/// Appends each item as one JSON document per line.
#[derive(Debug, Clone)]
pub struct JsonLinesTarget {
    path: PathBuf,
}

impl JsonLinesTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputTarget for JsonLinesTarget {
    fn send_batch(&self, items: &[Value]) -> Result<(), Fault> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = BufWriter::new(file);
        for item in items {
            serde_json::to_writer(&mut writer, item)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// In-memory target keeping every batch it receives, in delivery order.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    batches: Mutex<Vec<Vec<Value>>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<Value>> {
        self.batches.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// All delivered items flattened in delivery order.
    pub fn items(&self) -> Vec<Value> {
        self.batches().into_iter().flatten().collect()
    }
}

impl OutputTarget for MemoryTarget {
    fn send_batch(&self, items: &[Value]) -> Result<(), Fault> {
        self.batches.lock().unwrap_or_else(PoisonError::into_inner).push(items.to_vec());
        Ok(())
    }
}
