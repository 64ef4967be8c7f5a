//! Self-watch: periodic diagnostic sampling of bound parameters.
//!
//! A [`SelfWatch`] owns a background thread that wakes on a fixed interval,
//! asks every parameter watcher for its status, and writes the snapshot to a
//! [`WatchSink`]. The executor stops it only after every commit has run, and
//! stopping writes one last snapshot so commit-time effects are visible.

mod sink;

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        mpsc::{Receiver, RecvTimeoutError, SyncSender, sync_channel},
    },
    thread::JoinHandle,
    time::Duration,
};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};

pub use sink::{FileWatchSink, MemoryWatchSink, WatchSink};

use crate::Fault;

const SELF_WATCH_THREAD_NAME: &str = "spindle-self-watch";

/// Reports human-readable diagnostic state for one bound parameter.
///
/// Called from the self-watch thread while the function runs, so
/// implementations read shared state (atomics, mutexes) and must not block
/// for long.
pub trait Watcher: Send + Sync {
    fn status(&self) -> Result<String, Fault>;
}

/// A watcher labelled with the parameter it observes.
#[derive(Clone)]
pub struct Watch {
    parameter: String,
    watcher: Arc<dyn Watcher>,
}

impl Watch {
    pub fn new(parameter: impl Into<String>, watcher: Arc<dyn Watcher>) -> Self {
        Self {
            parameter: parameter.into(),
            watcher,
        }
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// Samples the watcher, turning errors and panics into a status line.
    fn sample(&self) -> String {
        let status = panic::catch_unwind(AssertUnwindSafe(|| self.watcher.status()));
        match status {
            Ok(Ok(status)) => status,
            Ok(Err(fault)) => {
                debug!(parameter = %self.parameter, error = %fault, "watcher status unavailable");
                format!("<status unavailable: {}>", fault)
            }
            Err(payload) => {
                let fault = Fault::from_panic(payload);
                warn!(parameter = %self.parameter, error = %fault, "watcher panicked while sampling");
                format!("<status unavailable: watcher panicked: {}>", fault)
            }
        }
    }
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch").field("parameter", &self.parameter).finish_non_exhaustive()
    }
}

/// One sampled view of every watched parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSnapshot {
    pub taken_at: DateTime<Utc>,
    /// `(parameter, status)` pairs in parameter order.
    pub entries: Vec<(String, String)>,
    /// True for the snapshot written while stopping.
    pub is_final: bool,
}

impl WatchSnapshot {
    fn capture(watches: &[Option<Watch>], is_final: bool) -> Self {
        let entries = watches
            .iter()
            .flatten()
            .map(|watch| (watch.parameter.clone(), watch.sample()))
            .collect();
        Self {
            taken_at: Utc::now(),
            entries,
            is_final,
        }
    }

    /// Text written to file-like sinks.
    pub fn render(&self) -> String {
        let mut text = format!("Last update: {}\n", self.taken_at.to_rfc3339_opts(SecondsFormat::Millis, true));
        for (parameter, status) in &self.entries {
            text.push_str(parameter);
            text.push_str(": ");
            text.push_str(status);
            text.push('\n');
        }
        text
    }
}

/// Handle to a running self-watch sampler.
///
/// [`stop`](SelfWatch::stop) consumes the handle, so the sampler is stopped at
/// most once. Dropping a running handle stops it as well.
#[derive(Debug)]
pub struct SelfWatch {
    stop_sender: Option<SyncSender<()>>,
    join_handle: Option<JoinHandle<()>>,
    watched: usize,
}

impl SelfWatch {
    /// Starts sampling `watches` (aligned with parameter indexes, `None` where a
    /// parameter has no watcher) every `interval`.
    pub fn start(watches: Vec<Option<Watch>>, sink: Arc<dyn WatchSink>, interval: Duration) -> anyhow::Result<Self> {
        let watched = watches.iter().flatten().count();
        let (stop_sender, stop_receiver) = sync_channel(1);
        let join_handle = std::thread::Builder::new()
            .name(SELF_WATCH_THREAD_NAME.to_string())
            .spawn(move || run_sampler_loop(watches, sink, interval, stop_receiver))
            .map_err(|error| anyhow::anyhow!("failed to spawn self-watch thread: {error}"))?;

        Ok(Self {
            stop_sender: Some(stop_sender),
            join_handle: Some(join_handle),
            watched,
        })
    }

    /// Number of parameters with a watcher.
    pub fn watched_count(&self) -> usize {
        self.watched
    }

    /// Stops the sampler after it writes a final snapshot.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(sender) = self.stop_sender.take() {
            drop(sender);
        }
        if let Some(handle) = self.join_handle.take()
            && handle.join().is_err()
        {
            warn!("self-watch thread terminated abnormally");
        }
    }
}

impl Drop for SelfWatch {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_sampler_loop(watches: Vec<Option<Watch>>, sink: Arc<dyn WatchSink>, interval: Duration, stop_receiver: Receiver<()>) {
    loop {
        match stop_receiver.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => publish(&*sink, &WatchSnapshot::capture(&watches, false)),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                publish(&*sink, &WatchSnapshot::capture(&watches, true));
                break;
            }
        }
    }
}

fn publish(sink: &dyn WatchSink, snapshot: &WatchSnapshot) {
    if let Err(error) = sink.write_snapshot(snapshot) {
        warn!(error = %error, is_final = snapshot.is_final, "failed to write self-watch snapshot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    impl Watcher for Counter {
        fn status(&self) -> Result<String, Fault> {
            Ok(format!("Processed {}", self.0.load(Ordering::SeqCst)))
        }
    }

    struct Broken;

    impl Watcher for Broken {
        fn status(&self) -> Result<String, Fault> {
            Err(Fault::new("WatchError", "lease lost"))
        }
    }

    struct Panicking;

    impl Watcher for Panicking {
        fn status(&self) -> Result<String, Fault> {
            panic!("sampling exploded");
        }
    }

    #[test]
    fn stop_writes_exactly_one_final_snapshot_with_latest_state() {
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let sink = Arc::new(MemoryWatchSink::new());
        let watches = vec![None, Some(Watch::new("items", counter.clone()))];
        let watch = SelfWatch::start(watches, sink.clone(), Duration::from_secs(60)).expect("start");
        assert_eq!(watch.watched_count(), 1);

        counter.0.store(5, Ordering::SeqCst);
        watch.stop();

        let snapshots = sink.snapshots();
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].is_final);
        assert_eq!(snapshots[0].entries, vec![("items".to_string(), "Processed 5".to_string())]);
    }

    #[test]
    fn samples_periodically_until_stopped() {
        let sink = Arc::new(MemoryWatchSink::new());
        let watches = vec![Some(Watch::new("items", Arc::new(Counter(AtomicUsize::new(1))) as Arc<dyn Watcher>))];
        let watch = SelfWatch::start(watches, sink.clone(), Duration::from_millis(10)).expect("start");
        std::thread::sleep(Duration::from_millis(80));
        watch.stop();

        let snapshots = sink.snapshots();
        assert!(snapshots.len() >= 2, "expected periodic snapshots, got {}", snapshots.len());
        assert_eq!(snapshots.iter().filter(|snapshot| snapshot.is_final).count(), 1);
        assert!(snapshots.last().unwrap().is_final);
    }

    #[test]
    fn failing_watchers_do_not_hide_healthy_ones() {
        let sink = Arc::new(MemoryWatchSink::new());
        let watches = vec![
            Some(Watch::new("broken", Arc::new(Broken) as Arc<dyn Watcher>)),
            Some(Watch::new("panicking", Arc::new(Panicking) as Arc<dyn Watcher>)),
            Some(Watch::new("healthy", Arc::new(Counter(AtomicUsize::new(3))) as Arc<dyn Watcher>)),
        ];
        SelfWatch::start(watches, sink.clone(), Duration::from_secs(60)).expect("start").stop();

        let snapshot = sink.last().expect("final snapshot");
        assert_eq!(snapshot.entries.len(), 3);
        assert_eq!(snapshot.entries[0].1, "<status unavailable: lease lost>");
        assert!(snapshot.entries[1].1.contains("sampling exploded"));
        assert_eq!(snapshot.entries[2].1, "Processed 3");
    }

    #[test]
    fn dropping_the_handle_stops_the_sampler() {
        let sink = Arc::new(MemoryWatchSink::new());
        {
            let _watch = SelfWatch::start(Vec::new(), sink.clone(), Duration::from_secs(60)).expect("start");
        }
        assert_eq!(sink.snapshots().len(), 1);
    }

    #[test]
    fn render_lists_each_parameter() {
        let snapshot = WatchSnapshot {
            taken_at: Utc::now(),
            entries: vec![("input".into(), "Read 2 bytes".into()), ("output".into(), "Wrote 1 item(s)".into())],
            is_final: false,
        };
        let text = snapshot.render();
        assert!(text.starts_with("Last update: "));
        assert!(text.contains("input: Read 2 bytes\n"));
        assert!(text.ends_with("output: Wrote 1 item(s)\n"));
    }
}
