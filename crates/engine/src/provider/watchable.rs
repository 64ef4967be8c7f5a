//! Byte-counting stream wrappers.
//!
//! Providers wrap the reader or writer they hand to storage with these types
//! and expose the shared [`StreamProgress`] as their watcher, so the
//! self-watch can report transfer progress while the invocation runs.

use std::{
    io::{self, Read, Write},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{Fault, watch::Watcher};

/// Shared byte counters for one bound stream.
#[derive(Debug, Default)]
pub struct StreamProgress {
    read: AtomicU64,
    written: AtomicU64,
    expected_length: Option<u64>,
}

impl StreamProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress for a stream whose total length is known, enabling percentages.
    pub fn with_expected_length(expected_length: u64) -> Self {
        Self {
            expected_length: Some(expected_length),
            ..Self::default()
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.read.load(Ordering::Relaxed)
    }

    pub fn bytes_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    fn record_read(&self, count: usize) {
        self.read.fetch_add(count as u64, Ordering::Relaxed);
    }

    fn record_write(&self, count: usize) {
        self.written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

impl Watcher for StreamProgress {
    fn status(&self) -> Result<String, Fault> {
        let read = self.bytes_read();
        let written = self.bytes_written();
        let mut parts = Vec::new();
        if read > 0 || self.expected_length.is_some() {
            match self.expected_length {
                Some(total) if total > 0 => {
                    let percent = read.saturating_mul(100) / total;
                    parts.push(format!("Read {} bytes ({}%)", read, percent.min(100)));
                }
                _ => parts.push(format!("Read {} bytes", read)),
            }
        }
        if written > 0 {
            parts.push(format!("Wrote {} bytes", written));
        }
        if parts.is_empty() {
            return Ok("No bytes transferred".to_string());
        }
        Ok(parts.join(", "))
    }
}

/// Reader that counts every byte it yields.
#[derive(Debug)]
pub struct WatchableReader<R> {
    inner: R,
    progress: Arc<StreamProgress>,
}

impl<R: Read> WatchableReader<R> {
    pub fn new(inner: R, progress: Arc<StreamProgress>) -> Self {
        Self { inner, progress }
    }

    pub fn progress(&self) -> &Arc<StreamProgress> {
        &self.progress
    }
}

impl<R: Read> Read for WatchableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        self.progress.record_read(count);
        Ok(count)
    }
}

/// Writer that counts every byte it accepts.
#[derive(Debug)]
pub struct WatchableWriter<W> {
    inner: W,
    progress: Arc<StreamProgress>,
}

impl<W: Write> WatchableWriter<W> {
    pub fn new(inner: W, progress: Arc<StreamProgress>) -> Self {
        Self { inner, progress }
    }

    pub fn progress(&self) -> &Arc<StreamProgress> {
        &self.progress
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for WatchableWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let count = self.inner.write(buf)?;
        self.progress.record_write(count);
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
