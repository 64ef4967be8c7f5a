//! In/out bindings backed by a shared value slot.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use spindle_types::StepOrder;
use tokio_util::sync::CancellationToken;

use super::{ProviderCapabilities, ValueProvider};
use crate::Fault;

/// Shared storage cell that a [`SlotProvider`] reads from and commits to.
///
/// Cloning the slot shares the cell, so the host keeps a handle and observes
/// what the function left in its argument once the invocation finishes.
#[derive(Debug, Clone, Default)]
pub struct ValueSlot {
    inner: Arc<Mutex<SlotState>>,
}

#[derive(Debug, Default)]
struct SlotState {
    value: Value,
    commits: usize,
}

impl ValueSlot {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SlotState {
                value: value.into(),
                commits: 0,
            })),
        }
    }

    pub fn get(&self) -> Value {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).value.clone()
    }

    /// Number of commits the slot has received.
    pub fn commit_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).commits
    }

    fn store(&self, value: Value) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.value = value;
        state.commits += 1;
    }
}

/// Provider passing the slot's current value in and committing the function's
/// final argument back out.
#[derive(Debug, Clone)]
pub struct SlotProvider {
    slot: ValueSlot,
    step_order: StepOrder,
}

impl SlotProvider {
    pub fn new(slot: ValueSlot) -> Self {
        Self {
            slot,
            step_order: StepOrder::DEFAULT,
        }
    }

    pub fn with_step_order(mut self, step_order: StepOrder) -> Self {
        self.step_order = step_order;
        self
    }
}

impl ValueProvider for SlotProvider {
    fn get_value(&mut self, _cancellation: &CancellationToken) -> Result<Value, Fault> {
        Ok(self.slot.get())
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::COMMIT
    }

    fn step_order(&self) -> StepOrder {
        self.step_order
    }

    fn commit(&mut self, value: &Value, _cancellation: &CancellationToken) -> Result<(), Fault> {
        self.slot.store(value.clone());
        Ok(())
    }
}
