//! Session facade: one pty, one child, two background threads.
//!
//! A session is started exactly once; restart requires a fresh instance.
//! `write`, `resize`, `set_output_sink`, `is_running`, `wait`, and
//! `last_error` are safe to call concurrently from any thread. `start`
//! and `stop` take `&mut self`, so the borrow checker serializes them.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::pty::error::PtyError;
use crate::pty::pair::{PtyHandle, PtyPair, TerminalSize};
use crate::pty::sink::OutputSink;
use crate::pty::spawn::{spawn_child, ProcessGroup};
use crate::pty::{monitor, relay};

/// Exit-code sentinel for "timed out", "no process", or "unknown".
pub const EXIT_UNKNOWN: i32 = -1;

/// What to run and how big the terminal should appear.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub size: TerminalSize,
    pub command: String,
    pub args: Vec<String>,
    /// `None` means inherit the caller's current directory.
    pub working_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            size: TerminalSize::default(),
            command: default_shell(),
            args: Vec::new(),
            working_dir: None,
        }
    }
}

impl SessionConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }
}

/// Platform shell used when no command is configured.
pub fn default_shell() -> String {
    #[cfg(windows)]
    {
        "cmd.exe".to_string()
    }
    #[cfg(not(windows))]
    {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
    }
}

/// Monotonic lifecycle; no transition skips `Initialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Running,
    Stopped,
}

/// State shared with the relay and monitor threads. Critical sections are
/// short: no lock is held across a blocking call or a sink invocation.
pub(crate) struct SessionShared {
    running: AtomicBool,
    stop_requested: AtomicBool,
    child_exited: AtomicBool,
    sink: Mutex<Option<Arc<dyn OutputSink>>>,
    last_error: Mutex<String>,
    exit_code: Mutex<Option<i32>>,
    exit_signal: Condvar,
}

impl SessionShared {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            child_exited: AtomicBool::new(false),
            sink: Mutex::new(None),
            last_error: Mutex::new(String::new()),
            exit_code: Mutex::new(None),
            exit_signal: Condvar::new(),
        }
    }

    pub(crate) fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, value: bool) {
        self.running.store(value, Ordering::SeqCst);
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub(crate) fn child_exited(&self) -> bool {
        self.child_exited.load(Ordering::SeqCst)
    }

    pub(crate) fn sink_snapshot(&self) -> Option<Arc<dyn OutputSink>> {
        self.sink.lock().clone()
    }

    fn set_sink(&self, sink: Arc<dyn OutputSink>) {
        *self.sink.lock() = Some(sink);
    }

    fn set_error(&self, err: &PtyError) {
        tracing::warn!(%err, "pty session error");
        *self.last_error.lock() = err.to_string();
    }

    fn last_error(&self) -> String {
        self.last_error.lock().clone()
    }

    pub(crate) fn publish_exit(&self, code: i32) {
        {
            let mut exit_code = self.exit_code.lock();
            *exit_code = Some(code);
        }
        self.child_exited.store(true, Ordering::SeqCst);
        self.exit_signal.notify_all();
    }

    fn wait_for_exit(&self, timeout: Duration) -> i32 {
        let mut exit_code = self.exit_code.lock();
        if exit_code.is_none() {
            let _ = self.exit_signal.wait_for(&mut exit_code, timeout);
        }
        exit_code.unwrap_or(EXIT_UNKNOWN)
    }
}

/// A headless pseudo-terminal hosting one child process.
///
/// Owns the pty, the child, and both background threads. Move-only: OS
/// handles cannot be safely duplicated implicitly.
pub struct Session {
    shared: Arc<SessionShared>,
    state: SessionState,
    pty: Option<PtyHandle>,
    group: Option<ProcessGroup>,
    relay: Option<JoinHandle<()>>,
    monitor: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SessionShared::new()),
            state: SessionState::Uninitialized,
            pty: None,
            group: None,
            relay: None,
            monitor: None,
        }
    }

    /// Initialize the pty, spawn the child, and start both background
    /// threads, in that order. Any step's failure aborts the sequence and
    /// records the error; whatever succeeded is released by `stop`/drop.
    pub fn start(&mut self, config: &SessionConfig) -> bool {
        match self.try_start(config) {
            Ok(()) => true,
            Err(err) => {
                self.shared.set_error(&err);
                false
            }
        }
    }

    fn try_start(&mut self, config: &SessionConfig) -> Result<(), PtyError> {
        if self.state != SessionState::Uninitialized {
            return Err(PtyError::AlreadyStarted);
        }

        let mut pair = PtyPair::open(config.size)?;
        self.pty = Some(pair.handle());
        self.state = SessionState::Initialized;

        let (child, group) = spawn_child(
            &mut pair,
            &config.command,
            &config.args,
            config.working_dir.as_deref(),
        )?;
        self.group = Some(group);

        let reader = pair.take_reader().ok_or(PtyError::NotInitialized)?;
        self.shared.set_running(true);
        self.relay = Some(relay::spawn(reader, pair.handle(), Arc::clone(&self.shared)));
        self.monitor = Some(monitor::spawn(child, pair.handle(), Arc::clone(&self.shared)));
        self.state = SessionState::Running;
        Ok(())
    }

    /// Forward bytes to the child's terminal. Returns `false` if the pipe
    /// is absent or the OS write reports broken/partial; never retried.
    pub fn write(&self, bytes: &[u8]) -> bool {
        let Some(pty) = &self.pty else {
            self.shared
                .set_error(&PtyError::write("write pipe not available"));
            return false;
        };
        match pty.write(bytes) {
            Ok(()) => true,
            Err(err) => {
                self.shared.set_error(&err);
                false
            }
        }
    }

    /// Convenience for textual input.
    pub fn write_str(&self, input: &str) -> bool {
        self.write(input.as_bytes())
    }

    /// Adjust the terminal dimensions. On failure the session keeps its
    /// previous size.
    pub fn resize(&self, size: TerminalSize) -> bool {
        let Some(pty) = &self.pty else {
            self.shared.set_error(&PtyError::NotInitialized);
            return false;
        };
        match pty.resize(size) {
            Ok(()) => true,
            Err(err) => {
                self.shared.set_error(&err);
                false
            }
        }
    }

    /// Replace the output sink. Takes effect for subsequent deliveries
    /// only; may be called before or after `start`.
    pub fn set_output_sink(&self, sink: Arc<dyn OutputSink>) {
        self.shared.set_sink(sink);
    }

    /// Shared write/resize surface for helper threads (e.g. a CLI's stdin
    /// forwarder). Present once `start` has initialized the pty.
    pub fn handle(&self) -> Option<PtyHandle> {
        self.pty.clone()
    }

    /// Idempotent shutdown: force-kill a live child, tear down the pty,
    /// and join both background threads. Bounded, because the kill
    /// guarantees the monitor's wait returns and teardown unblocks the
    /// relay.
    pub fn stop(&mut self) {
        self.shared.request_stop();

        if let Some(group) = self.group.as_mut() {
            if !self.shared.child_exited() {
                let _ = group.kill();
            }
        }
        if let Some(pty) = &self.pty {
            pty.teardown();
        }
        if let Some(handle) = self.monitor.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.relay.take() {
            let _ = handle.join();
        }

        self.shared.set_running(false);
        if self.state != SessionState::Uninitialized {
            self.state = SessionState::Stopped;
        }
        self.group = None;
    }

    /// Block up to `timeout` for child exit. Returns the real exit code,
    /// or [`EXIT_UNKNOWN`] when the child has not exited in time or was
    /// never spawned.
    pub fn wait(&self, timeout: Duration) -> i32 {
        match self.state {
            SessionState::Uninitialized | SessionState::Initialized => EXIT_UNKNOWN,
            _ => self.shared.wait_for_exit(timeout),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Snapshot of the most recent diagnostic. Each new failure
    /// overwrites, not appends.
    pub fn last_error(&self) -> String {
        self.shared.last_error()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_platform_shell() {
        let config = SessionConfig::default();
        assert!(!config.command.is_empty());
        assert_eq!((config.size.cols, config.size.rows), (120, 40));
        assert!(config.args.is_empty());
        assert!(config.working_dir.is_none());
    }

    #[test]
    fn wait_without_start_returns_sentinel() {
        let session = Session::new();
        assert_eq!(session.wait(Duration::ZERO), EXIT_UNKNOWN);
        assert!(!session.is_running());
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[test]
    fn write_without_start_fails_and_records_error() {
        let session = Session::new();
        assert!(!session.write(b"hello"));
        assert!(session.last_error().contains("write pipe not available"));
    }

    #[test]
    fn resize_without_start_fails() {
        let session = Session::new();
        assert!(!session.resize(TerminalSize::new(80, 24)));
        assert!(session.last_error().contains("not initialized"));
    }

    #[test]
    fn stop_before_start_is_a_no_op() {
        let mut session = Session::new();
        session.stop();
        session.stop();
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[test]
    fn each_failure_overwrites_last_error() {
        let session = Session::new();
        assert!(!session.write(b"x"));
        let first = session.last_error();
        assert!(!session.resize(TerminalSize::new(10, 10)));
        let second = session.last_error();
        assert_ne!(first, second);
        assert!(second.contains("not initialized"));
    }
}
