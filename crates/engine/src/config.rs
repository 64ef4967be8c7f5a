//! Executor configuration.
//!
//! Values come from code (builder methods) or from the process environment:
//!
//! - `SPINDLE_WATCH_FILE`: path of the file receiving self-watch snapshots. Unset disables self-watch.
//! - `SPINDLE_WATCH_INTERVAL_MS`: sampling interval in milliseconds (default 3000).

use std::{sync::Arc, time::Duration};

use spindle_util::{parse_duration_millis_from_environment, parse_path_from_environment};

use crate::watch::{FileWatchSink, WatchSink};

pub const WATCH_FILE_ENV: &str = "SPINDLE_WATCH_FILE";
pub const WATCH_INTERVAL_ENV: &str = "SPINDLE_WATCH_INTERVAL_MS";
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(3);

/// Settings shared by every invocation run through one executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Delay between self-watch snapshots.
    pub watch_interval: Duration,
    /// Destination of self-watch snapshots. `None` disables the sampler entirely.
    pub watch_sink: Option<Arc<dyn WatchSink>>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            watch_interval: DEFAULT_WATCH_INTERVAL,
            watch_sink: None,
        }
    }
}

impl ExecutorConfig {
    pub fn from_environment() -> Self {
        let watch_interval = parse_duration_millis_from_environment(WATCH_INTERVAL_ENV).unwrap_or(DEFAULT_WATCH_INTERVAL);
        let watch_sink = parse_path_from_environment(WATCH_FILE_ENV).map(|path| Arc::new(FileWatchSink::new(path)) as Arc<dyn WatchSink>);
        Self {
            watch_interval,
            watch_sink,
        }
    }

    pub fn with_watch_sink(mut self, sink: Arc<dyn WatchSink>) -> Self {
        self.watch_sink = Some(sink);
        self
    }

    pub fn with_watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = interval;
        self
    }
}
