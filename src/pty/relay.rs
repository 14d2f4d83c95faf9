//! Output relay thread: pumps pty output into the registered sink.

use std::io::{self, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::pty::pair::PtyHandle;
use crate::pty::session::SessionShared;

/// Fixed read buffer, matching the device's typical transfer size.
const OUTPUT_BUFFER_SIZE: usize = 4096;

/// Fixed delay before retrying a transient empty read. The retry count is
/// deliberately unbounded; teardown is what ends the loop.
const READ_RETRY_DELAY: Duration = Duration::from_millis(10);

pub(crate) fn spawn(
    reader: Box<dyn Read + Send>,
    pty: PtyHandle,
    shared: Arc<SessionShared>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        relay_loop(reader, pty, &shared);
        shared.set_running(false);
    })
}

fn relay_loop(mut reader: Box<dyn Read + Send>, pty: PtyHandle, shared: &SessionShared) {
    let mut buffer = [0u8; OUTPUT_BUFFER_SIZE];

    while !shared.stop_requested() {
        // A dead child writes nothing more: once the monitor has seen it
        // exit, drain only what the device already buffered, then leave
        // instead of blocking against a pty that may never be torn down.
        if shared.child_exited() && pty.pending_output() == Some(0) {
            break;
        }

        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(count) => {
                // Snapshot under the short lock, deliver outside it, so a
                // sink that re-enters the session cannot deadlock.
                if let Some(sink) = shared.sink_snapshot() {
                    sink.on_output(&buffer[..count]);
                }
            }
            Err(err) if is_pipe_closed(&err) => break,
            Err(_) => thread::sleep(READ_RETRY_DELAY),
        }
    }
}

/// The normal end-of-stream/shutdown signal, not an error. Anything else
/// is treated as transient and retried.
fn is_pipe_closed(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof | io::ErrorKind::NotConnected
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broken_pipe_is_terminal() {
        assert!(is_pipe_closed(&io::Error::from(io::ErrorKind::BrokenPipe)));
        assert!(is_pipe_closed(&io::Error::from(io::ErrorKind::UnexpectedEof)));
    }

    #[test]
    fn interrupted_read_is_transient() {
        assert!(!is_pipe_closed(&io::Error::from(io::ErrorKind::Interrupted)));
        assert!(!is_pipe_closed(&io::Error::from(io::ErrorKind::WouldBlock)));
    }
}
