//! Exit monitor thread: waits for the child to exit, publishes the exit
//! code, and force-tears-down the pty to unblock the relay's pending read.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::pty::pair::PtyHandle;
use crate::pty::session::SessionShared;
use crate::pty::spawn::ChildProcess;

pub(crate) fn spawn(
    mut child: ChildProcess,
    pty: PtyHandle,
    shared: Arc<SessionShared>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let code = match child.wait() {
            Ok(status) => {
                let code = status.exit_code() as i32;
                tracing::debug!(pid = ?child.pid(), code, "child exited");
                code
            }
            Err(err) => {
                tracing::warn!(pid = ?child.pid(), %err, "waiting on child failed");
                -1
            }
        };
        shared.publish_exit(code);

        // If the caller already requested a stop it owns the teardown;
        // otherwise break the relay's blocked read ourselves. The race
        // between the two triggers is harmless, teardown is idempotent.
        if !shared.stop_requested() {
            pty.teardown();
        }
    })
}
