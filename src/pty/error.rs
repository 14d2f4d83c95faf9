//! Error types for PTY session operations.
//!
//! Every OS-level failure is captured with the caller's context and the
//! system's own message so `Session::last_error()` can surface it verbatim.

use std::fmt::Display;

use thiserror::Error;

/// Errors that can occur while hosting a process on a pseudo-terminal.
#[derive(Debug, Error)]
pub enum PtyError {
    /// Pipe or device allocation failed. Fatal to `start`; everything
    /// allocated up to the failing step has already been released.
    #[error("{context}: {message}")]
    Initialization {
        context: &'static str,
        message: String,
    },

    /// Child process creation failed. Fatal to `start`.
    #[error("{context}: {message}")]
    Spawn {
        context: &'static str,
        message: String,
    },

    /// The write pipe is missing or the OS reported a broken/partial write.
    /// Reported per call; the session keeps running.
    #[error("write failed: {message}")]
    Write { message: String },

    /// Resize was rejected by the OS. The previous size is retained.
    #[error("resize failed: {message}")]
    Resize { message: String },

    /// An operation that requires a live PTY was called before `start`
    /// succeeded or after teardown.
    #[error("PTY not initialized")]
    NotInitialized,

    /// A session may be started exactly once; restart requires a fresh
    /// `Session` instance.
    #[error("session already started")]
    AlreadyStarted,
}

impl PtyError {
    pub(crate) fn init(context: &'static str, err: impl Display) -> Self {
        PtyError::Initialization {
            context,
            message: err.to_string(),
        }
    }

    pub(crate) fn spawn(context: &'static str, err: impl Display) -> Self {
        PtyError::Spawn {
            context,
            message: err.to_string(),
        }
    }

    pub(crate) fn write(err: impl Display) -> Self {
        PtyError::Write {
            message: err.to_string(),
        }
    }

    pub(crate) fn resize(err: impl Display) -> Self {
        PtyError::Resize {
            message: err.to_string(),
        }
    }
}
