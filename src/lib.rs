//! Headless pseudo-terminal host.
//!
//! Creates a real, OS-backed pseudo-terminal, spawns a child process
//! attached to it, relays the child's byte stream to a caller-supplied
//! sink, and manages the child's full lifecycle even when no visible
//! terminal window exists. The spawned process sees `isatty() == true`.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use headless_pty::{BufferSink, Session, SessionConfig};
//!
//! let sink = Arc::new(BufferSink::new());
//! let mut session = Session::new();
//! session.set_output_sink(sink.clone());
//! assert!(session.start(&SessionConfig::default()));
//! session.write_str("echo hi\n");
//! session.write_str("exit\n");
//! assert_eq!(session.wait(Duration::from_secs(5)), 0);
//! ```

pub mod pty;

pub use pty::{
    BufferSink, OutputSink, PtyError, PtyHandle, Session, SessionConfig, SessionState, StdoutSink,
    TerminalSize, EXIT_UNKNOWN,
};
