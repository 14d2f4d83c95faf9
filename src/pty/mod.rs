mod error;
mod monitor;
mod pair;
mod relay;
mod session;
mod sink;
mod spawn;

pub use error::PtyError;
pub use pair::{PtyHandle, PtyPair, TerminalSize};
pub use session::{default_shell, Session, SessionConfig, SessionState, EXIT_UNKNOWN};
pub use sink::{BufferSink, OutputSink, StdoutSink};
pub use spawn::{spawn_child, ChildProcess, ProcessGroup};
