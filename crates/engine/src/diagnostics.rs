//! The invocation transcript.
//!
//! [`DiagnosticLog`] is the human-readable text sink shared by the executor
//! and the reporter. It is separate from `tracing`: the transcript is output
//! for the person running the function, tracing is for the operator.

use std::{
    fmt,
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
};

use tracing::warn;

/// Serialized, cloneable writer for transcript lines.
#[derive(Clone)]
pub struct DiagnosticLog {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl DiagnosticLog {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// A transcript kept in memory, returned with a handle for reading it back.
    pub fn memory() -> (Self, MemoryTranscript) {
        let transcript = MemoryTranscript::default();
        (Self::new(transcript.clone()), transcript)
    }

    pub fn line(&self, text: impl AsRef<str>) {
        self.lines(std::iter::once(text.as_ref()));
    }

    /// Writes several lines without interleaving output from other writers.
    pub fn lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        for line in lines {
            if let Err(error) = writeln!(writer, "{}", line.as_ref()) {
                warn!(error = %error, "failed to write diagnostic transcript");
                return;
            }
        }
        if let Err(error) = writer.flush() {
            warn!(error = %error, "failed to flush diagnostic transcript");
        }
    }
}

impl fmt::Debug for DiagnosticLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticLog").finish_non_exhaustive()
    }
}

/// Shared in-memory buffer behind [`DiagnosticLog::memory`].
#[derive(Debug, Clone, Default)]
pub struct MemoryTranscript {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemoryTranscript {
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Write for MemoryTranscript {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn grouped_lines_are_not_interleaved() {
        let (log, transcript) = DiagnosticLog::memory();
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let log = log.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        log.lines([format!("begin {worker}"), format!("end {worker}")]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        let contents = transcript.contents();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 200);
        for pair in lines.chunks(2) {
            let worker = pair[0].trim_start_matches("begin ");
            assert_eq!(pair[1], format!("end {worker}"));
        }
    }

    #[derive(Clone, Default)]
    struct UnflushableWriter {
        written: Arc<Mutex<Vec<u8>>>,
        flushes: Arc<Mutex<usize>>,
    }

    impl Write for UnflushableWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            *self.flushes.lock().unwrap() += 1;
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "transcript closed"))
        }
    }

    #[test]
    fn flush_failures_do_not_stop_later_lines() {
        let writer = UnflushableWriter::default();
        let log = DiagnosticLog::new(writer.clone());

        log.line("first");
        log.lines(["second", "third"]);

        assert_eq!(String::from_utf8_lossy(&writer.written.lock().unwrap()), "first\nsecond\nthird\n");
        assert_eq!(*writer.flushes.lock().unwrap(), 2);
    }
}
