//! File-backed in/out binding.

use std::{
    fs::{self, File},
    io::{BufWriter, ErrorKind, Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use serde_json::Value;
use spindle_types::StepOrder;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ProviderCapabilities, StreamProgress, ValueProvider, WatchableReader, WatchableWriter};
use crate::{Fault, watch::Watcher};

/// Binds a UTF-8 file: its contents are the argument (or `null` when the file
/// does not exist yet) and the function's final argument is written back.
///
/// A `null` argument at commit time leaves the file untouched; strings are
/// written verbatim and any other JSON value is written pretty-printed.
#[derive(Debug)]
pub struct FileProvider {
    path: PathBuf,
    step_order: StepOrder,
    progress: Arc<StreamProgress>,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            step_order: StepOrder::DEFAULT,
            progress: Arc::new(StreamProgress::new()),
        }
    }

    pub fn with_step_order(mut self, step_order: StepOrder) -> Self {
        self.step_order = step_order;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ValueProvider for FileProvider {
    fn get_value(&mut self, _cancellation: &CancellationToken) -> Result<Value, Fault> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "bound file does not exist yet");
                return Ok(Value::Null);
            }
            Err(error) => {
                return Err(Fault::new("FileBindError", format!("could not open '{}'", self.path.display())).with_cause(error.into()));
            }
        };
        let expected_length = file.metadata()?.len();
        self.progress = Arc::new(StreamProgress::with_expected_length(expected_length));

        let mut contents = String::new();
        WatchableReader::new(file, self.progress.clone()).read_to_string(&mut contents)?;
        Ok(Value::String(contents))
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::COMMIT
    }

    fn step_order(&self) -> StepOrder {
        self.step_order
    }

    fn watcher(&self) -> Option<Arc<dyn Watcher>> {
        let watcher: Arc<dyn Watcher> = self.progress.clone();
        Some(watcher)
    }

    fn commit(&mut self, value: &Value, _cancellation: &CancellationToken) -> Result<(), Fault> {
        let contents = match value {
            Value::Null => return Ok(()),
            Value::String(text) => text.clone(),
            other => serde_json::to_string_pretty(other)?,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)?;
        let mut writer = WatchableWriter::new(BufWriter::new(file), self.progress.clone());
        writer.write_all(contents.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}
