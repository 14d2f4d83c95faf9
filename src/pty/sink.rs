//! Output sinks for relayed PTY bytes.
//!
//! The relay thread delivers raw byte spans in arrival order, with no
//! framing or encoding imposed. A sink is invoked only from the relay
//! thread, never from the caller's thread, and never while any session
//! lock is held, so a sink may safely call back into the session.

use std::io::{self, Write};

use parking_lot::Mutex;

/// A single consumer of the child's output stream.
///
/// Console writers, in-memory buffers, and network relays are all
/// substitutable implementations.
pub trait OutputSink: Send + Sync {
    fn on_output(&self, bytes: &[u8]);
}

/// Any `Fn(&[u8])` closure works as a sink.
impl<F> OutputSink for F
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn on_output(&self, bytes: &[u8]) {
        self(bytes)
    }
}

/// Writes relayed bytes straight to the hosting process's stdout.
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn on_output(&self, bytes: &[u8]) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(bytes);
        let _ = stdout.flush();
    }
}

/// Collects relayed bytes in memory. Useful for tests and programmatic
/// capture of a child's output.
#[derive(Default)]
pub struct BufferSink {
    bytes: Mutex<Vec<u8>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    /// Lossy UTF-8 view of the captured bytes.
    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }
}

impl OutputSink for BufferSink {
    fn on_output(&self, bytes: &[u8]) {
        self.bytes.lock().extend_from_slice(bytes);
    }
}
