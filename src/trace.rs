//! Trace capability for codec internals.
//!
//! Components that want decode/encode tracing receive a `&dyn TraceSink`
//! instead of reaching for a global logger. The codec only ever writes lines
//! through it; correctness never depends on the output.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Fire-and-forget line sink.
pub trait TraceSink {
    fn log(&self, line: &str);
}

/// Default sink: discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrace;

impl TraceSink for NoTrace {
    fn log(&self, _line: &str) {}
}

/// Forwards lines to the active `tracing` subscriber at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleTrace;

impl TraceSink for ConsoleTrace {
    fn log(&self, line: &str) {
        tracing::debug!(target: "iso8583codec", "{line}");
    }
}

/// Appends lines to a file. The file is opened per call so the sink can be
/// shared freely; write failures are swallowed, tracing must never fail the
/// codec.
#[derive(Debug, Clone)]
pub struct FileTrace {
    path: PathBuf,
}

impl FileTrace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileTrace { path: path.into() }
    }
}

impl TraceSink for FileTrace {
    fn log(&self, line: &str) {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "{line}");
        }
    }
}
