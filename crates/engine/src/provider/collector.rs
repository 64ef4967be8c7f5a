//! Batching output collector.
//!
//! The function fills its argument with a JSON array of items. On commit each
//! item is appended to the collector; a full batch is flushed to the output
//! target under the same lock as the append so a concurrent flush can never
//! observe a half-updated buffer. The remainder is flushed on release, unless
//! the commit failed: then the undelivered items are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use spindle_types::StepOrder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{OutputTarget, ProviderCapabilities, ValueProvider};
use crate::{Fault, watch::Watcher};

#[derive(Debug, Default)]
struct CollectorState {
    buffer: Vec<Value>,
    written: usize,
}

/// Buffers items and forwards them to an [`OutputTarget`] in batches.
#[derive(Debug)]
pub struct BatchCollector {
    state: Mutex<CollectorState>,
    batch_size: usize,
    target: Arc<dyn OutputTarget>,
}

impl BatchCollector {
    /// Creates a collector; a `batch_size` of zero is treated as one.
    pub fn new(target: Arc<dyn OutputTarget>, batch_size: usize) -> Self {
        Self {
            state: Mutex::new(CollectorState::default()),
            batch_size: batch_size.max(1),
            target,
        }
    }

    /// Appends `item`, flushing when the batch is full.
    pub fn add(&self, item: Value) -> Result<(), Fault> {
        let mut state = self.lock_state();
        state.buffer.push(item);
        if state.buffer.len() >= self.batch_size {
            self.flush_locked(&mut state)?;
        }
        Ok(())
    }

    /// Sends any buffered items.
    pub fn flush(&self) -> Result<(), Fault> {
        let mut state = self.lock_state();
        self.flush_locked(&mut state)
    }

    /// Drops buffered items without sending them, returning how many were dropped.
    pub fn discard_pending(&self) -> usize {
        let mut state = self.lock_state();
        let dropped = state.buffer.len();
        state.buffer.clear();
        dropped
    }

    /// Items delivered to the target so far.
    pub fn written(&self) -> usize {
        self.lock_state().written
    }

    /// Items buffered but not yet delivered.
    pub fn pending(&self) -> usize {
        self.lock_state().buffer.len()
    }

    fn lock_state(&self) -> MutexGuard<'_, CollectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Items stay buffered when the target fails so a later flush can retry them.
    fn flush_locked(&self, state: &mut CollectorState) -> Result<(), Fault> {
        if state.buffer.is_empty() {
            return Ok(());
        }
        self.target.send_batch(&state.buffer)?;
        state.written += state.buffer.len();
        debug!(items = state.buffer.len(), total = state.written, "collector flushed batch");
        state.buffer.clear();
        Ok(())
    }
}

impl Watcher for BatchCollector {
    fn status(&self) -> Result<String, Fault> {
        let state = self.lock_state();
        let mut status = format!("Wrote {} item(s)", state.written);
        if !state.buffer.is_empty() {
            status.push_str(&format!(", {} pending", state.buffer.len()));
        }
        Ok(status)
    }
}

/// Output binding that hands the function an empty array and enqueues
/// whatever it contains when the function returns.
///
/// Commits with [`StepOrder::ENQUEUE`] so messages leave only after every
/// other binding has been persisted.
#[derive(Debug, Clone)]
pub struct CollectorProvider {
    collector: Arc<BatchCollector>,
    commit_failed: bool,
}

impl CollectorProvider {
    pub fn new(collector: Arc<BatchCollector>) -> Self {
        Self {
            collector,
            commit_failed: false,
        }
    }

    pub fn collector(&self) -> &Arc<BatchCollector> {
        &self.collector
    }
}

impl ValueProvider for CollectorProvider {
    fn get_value(&mut self, _cancellation: &CancellationToken) -> Result<Value, Fault> {
        Ok(Value::Array(Vec::new()))
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::COMMIT_AND_RELEASE
    }

    fn step_order(&self) -> StepOrder {
        StepOrder::ENQUEUE
    }

    fn watcher(&self) -> Option<Arc<dyn Watcher>> {
        let watcher: Arc<dyn Watcher> = self.collector.clone();
        Some(watcher)
    }

    fn commit(&mut self, value: &Value, _cancellation: &CancellationToken) -> Result<(), Fault> {
        let committed = match value {
            Value::Null => Ok(()),
            Value::Array(items) => items.iter().try_for_each(|item| self.collector.add(item.clone())),
            single => self.collector.add(single.clone()),
        };
        self.commit_failed = committed.is_err();
        committed
    }

    fn release(&mut self) -> Result<(), Fault> {
        if self.commit_failed {
            let dropped = self.collector.discard_pending();
            if dropped > 0 {
                warn!(items = dropped, "commit failed; dropping undelivered items");
            }
            return Ok(());
        }
        self.collector.flush()
    }
}
