//! Script context: bindings plus the host's output and error writers.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bindings::Bindings;

/// A host writer shared between the engine and the console router.
#[derive(Clone)]
pub struct HostWriter(Arc<Mutex<Box<dyn Write + Send>>>);

impl HostWriter {
    pub fn new(w: impl Write + Send + 'static) -> Self {
        HostWriter(Arc::new(Mutex::new(Box::new(w))))
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// A writer that keeps everything written to it in memory.
    pub fn capture() -> (Self, Captured) {
        let buf = Captured::default();
        (Self::new(buf.clone()), buf)
    }

    /// Write `text` and flush.
    pub fn write_str(&self, text: &str) -> io::Result<()> {
        let mut w = self.0.lock();
        w.write_all(text.as_bytes())?;
        w.flush()
    }

    pub fn flush(&self) -> io::Result<()> {
        self.0.lock().flush()
    }
}

impl std::fmt::Debug for HostWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HostWriter")
    }
}

/// In-memory sink returned by [`HostWriter::capture`].
#[derive(Debug, Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Everything one execution needs from the host.
#[derive(Debug)]
pub struct ScriptContext {
    pub bindings: Option<Bindings>,
    pub writer: HostWriter,
    pub error_writer: HostWriter,
}

impl ScriptContext {
    /// Context writing to the process's stdout/stderr.
    pub fn new(bindings: Bindings) -> Self {
        ScriptContext {
            bindings: Some(bindings),
            writer: HostWriter::stdout(),
            error_writer: HostWriter::stderr(),
        }
    }

    pub fn with_writers(bindings: Bindings, writer: HostWriter, error_writer: HostWriter) -> Self {
        ScriptContext {
            bindings: Some(bindings),
            writer,
            error_writer,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_collects_writes() {
        let (w, captured) = HostWriter::capture();
        w.write_str("hello ").unwrap();
        w.clone().write_str("world").unwrap();
        assert_eq!(captured.contents(), "hello world");
    }
}
