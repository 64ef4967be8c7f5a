//! Value providers: the per-parameter binding contract.
//!
//! Modules:
//! - `constant`: Read-only literal values
//! - `slot`: In/out values backed by a shared slot
//! - `collector`: Batching output collector committed with enqueue priority
//! - `target`: Output targets that receive collector batches
//! - `file`: UTF-8 files read before and written after invocation
//! - `watchable`: Byte-counting reader/writer wrappers that report progress

mod collector;
mod constant;
mod file;
mod slot;
mod target;
mod watchable;

use std::{fmt::Debug, sync::Arc};

pub use collector::{BatchCollector, CollectorProvider};
pub use constant::ConstantProvider;
pub use file::FileProvider;
pub use slot::{SlotProvider, ValueSlot};
pub use target::{JsonLinesTarget, MemoryTarget, OutputTarget};
pub use watchable::{StreamProgress, WatchableReader, WatchableWriter};

use serde_json::Value;
use spindle_types::StepOrder;
use tokio_util::sync::CancellationToken;

use crate::{Fault, watch::Watcher};

/// Optional capabilities a provider supports beyond producing a value.
///
/// The executor consults these flags instead of inspecting provider types:
/// `commit` is only called when `commit` is set, `release` only when
/// `release` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub commit: bool,
    pub release: bool,
}

impl ProviderCapabilities {
    pub const READ_ONLY: ProviderCapabilities = ProviderCapabilities {
        commit: false,
        release: false,
    };
    pub const COMMIT: ProviderCapabilities = ProviderCapabilities {
        commit: true,
        release: false,
    };
    pub const RELEASE: ProviderCapabilities = ProviderCapabilities {
        commit: false,
        release: true,
    };
    pub const COMMIT_AND_RELEASE: ProviderCapabilities = ProviderCapabilities {
        commit: true,
        release: true,
    };
}

/// Supplies (and optionally persists) the value bound to one parameter.
///
/// Only [`get_value`](ValueProvider::get_value) is required. The remaining
/// methods have inert defaults so a provider can support any subset of
/// commit, step order, watcher, and release.
pub trait ValueProvider: Send + Debug {
    /// Produce the argument passed to the function.
    fn get_value(&mut self, cancellation: &CancellationToken) -> Result<Value, Fault>;

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::READ_ONLY
    }

    /// Commit priority; see [`StepOrder`].
    fn step_order(&self) -> StepOrder {
        StepOrder::DEFAULT
    }

    /// Diagnostic watcher sampled by the self-watch while the invocation runs.
    fn watcher(&self) -> Option<Arc<dyn Watcher>> {
        None
    }

    /// Persist the argument as it stood when the function returned.
    fn commit(&mut self, _value: &Value, _cancellation: &CancellationToken) -> Result<(), Fault> {
        Ok(())
    }

    /// Release resources held for this invocation. Runs right after commit.
    fn release(&mut self) -> Result<(), Fault> {
        Ok(())
    }
}

/// Renders a bound value for diagnostics: strings verbatim, everything else as JSON.
pub fn value_for_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
