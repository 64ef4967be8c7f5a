#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use serde_json::Value;
use spindle_engine::{Fault, ProviderCapabilities, ValueProvider, WatchSink, WatchSnapshot, Watcher};
use spindle_types::StepOrder;
use tokio_util::sync::CancellationToken;

/// Ordered record of everything the spies observed.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<(String, Instant)>>>,
}

impl Journal {
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().expect("journal lock").push((event.into(), Instant::now()));
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("journal lock").iter().map(|(event, _)| event.clone()).collect()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|recorded| recorded.as_str() == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|recorded| recorded == event)
    }

    pub fn instant(&self, event: &str) -> Option<Instant> {
        self.events.lock().expect("journal lock").iter().find(|(recorded, _)| recorded == event).map(|(_, at)| *at)
    }
}

/// Provider recording every call into a shared journal.
#[derive(Debug)]
pub struct SpyProvider {
    name: String,
    journal: Journal,
    value: Value,
    capabilities: ProviderCapabilities,
    step_order: StepOrder,
    fail_get: bool,
    fail_commit: bool,
    watched: bool,
    panic_in_watcher: bool,
    panic_in_step_order: bool,
    committed: Arc<Mutex<Vec<Value>>>,
}

impl SpyProvider {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            value: Value::Null,
            capabilities: ProviderCapabilities::COMMIT_AND_RELEASE,
            step_order: StepOrder::DEFAULT,
            fail_get: false,
            fail_commit: false,
            watched: true,
            panic_in_watcher: false,
            panic_in_step_order: false,
            committed: Arc::default(),
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    pub fn with_step_order(mut self, step_order: StepOrder) -> Self {
        self.step_order = step_order;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.capabilities = ProviderCapabilities::READ_ONLY;
        self
    }

    pub fn without_watcher(mut self) -> Self {
        self.watched = false;
        self
    }

    pub fn failing_get(mut self) -> Self {
        self.fail_get = true;
        self
    }

    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    pub fn panicking_watcher(mut self) -> Self {
        self.panic_in_watcher = true;
        self
    }

    pub fn panicking_step_order(mut self) -> Self {
        self.panic_in_step_order = true;
        self
    }

    /// Handle on the values this provider committed.
    pub fn committed(&self) -> Arc<Mutex<Vec<Value>>> {
        self.committed.clone()
    }
}

impl ValueProvider for SpyProvider {
    fn get_value(&mut self, _cancellation: &CancellationToken) -> Result<Value, Fault> {
        self.journal.record(format!("get:{}", self.name));
        if self.fail_get {
            return Err(Fault::new("ProviderError", format!("{} unavailable", self.name)));
        }
        Ok(self.value.clone())
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    fn step_order(&self) -> StepOrder {
        if self.panic_in_step_order {
            panic!("{} has no step order", self.name);
        }
        self.step_order
    }

    fn watcher(&self) -> Option<Arc<dyn Watcher>> {
        if self.panic_in_watcher {
            panic!("{} watcher is broken", self.name);
        }
        self.watched.then(|| {
            Arc::new(SpyWatcher {
                name: self.name.clone(),
                journal: self.journal.clone(),
            }) as Arc<dyn Watcher>
        })
    }

    fn commit(&mut self, value: &Value, _cancellation: &CancellationToken) -> Result<(), Fault> {
        self.journal.record(format!("commit:{}", self.name));
        if self.fail_commit {
            return Err(Fault::new("StorageError", "write rejected"));
        }
        self.committed.lock().expect("committed lock").push(value.clone());
        Ok(())
    }

    fn release(&mut self) -> Result<(), Fault> {
        self.journal.record(format!("release:{}", self.name));
        Ok(())
    }
}

/// Watcher journaling every sample as `sample:<name>`.
struct SpyWatcher {
    name: String,
    journal: Journal,
}

impl Watcher for SpyWatcher {
    fn status(&self) -> Result<String, Fault> {
        self.journal.record(format!("sample:{}", self.name));
        Ok(format!("watching {}", self.name))
    }
}

/// Watch sink journaling the final snapshot as `watch:stop`.
#[derive(Debug, Clone)]
pub struct JournalWatchSink {
    journal: Journal,
    last: Arc<Mutex<Option<WatchSnapshot>>>,
}

impl JournalWatchSink {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            last: Arc::default(),
        }
    }

    pub fn last(&self) -> Option<WatchSnapshot> {
        self.last.lock().expect("sink lock").clone()
    }
}

impl WatchSink for JournalWatchSink {
    fn write_snapshot(&self, snapshot: &WatchSnapshot) -> anyhow::Result<()> {
        if snapshot.is_final {
            self.journal.record("watch:stop");
        }
        *self.last.lock().expect("sink lock") = Some(snapshot.clone());
        Ok(())
    }
}
