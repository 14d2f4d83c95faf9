//! Child process creation and lifetime binding.
//!
//! The spawner points a `CommandBuilder` at the pty's child-facing
//! endpoint and drops that endpoint immediately after the child is bound.
//! The returned [`ProcessGroup`] carries kill-on-drop semantics so the
//! child and anything it spawned die with the session.

use std::path::Path;

use portable_pty::{Child, ChildKiller, CommandBuilder, ExitStatus};

use crate::pty::error::PtyError;
use crate::pty::pair::PtyPair;

/// Exclusively owned handle to the spawned child.
pub struct ChildProcess {
    child: Box<dyn Child + Send + Sync>,
    pid: Option<u32>,
}

impl ChildProcess {
    /// Block until the child exits.
    pub fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait()
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

/// Kill-on-drop group binding: one per session. Dropping it (or calling
/// [`ProcessGroup::kill`]) force-terminates the child and every process
/// it spawned, the defense against orphaned grandchildren.
pub struct ProcessGroup {
    killer: Box<dyn ChildKiller + Send + Sync>,
    pid: Option<u32>,
}

impl ProcessGroup {
    /// Force-terminate the member processes. Does not wait for
    /// cooperative exit. Errors against an already-dead child are ignored
    /// by callers.
    ///
    /// The child is the pty session leader, so on unix the signal goes to
    /// its whole process group; a detached grandchild that ignores SIGHUP
    /// still dies with the group.
    pub fn kill(&mut self) -> std::io::Result<()> {
        #[cfg(unix)]
        if let Some(pid) = self.pid {
            let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
            if rc == 0 {
                return Ok(());
            }
            let err = std::io::Error::last_os_error();
            // Already gone counts as terminated.
            if err.raw_os_error() == Some(libc::ESRCH) {
                return Ok(());
            }
            return Err(err);
        }
        self.killer.kill()
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        // Killing an already-reaped group is a harmless no-op.
        let _ = self.kill();
    }
}

/// Spawn `command` with `args` attached to the pty's far end.
///
/// An empty `working_dir` means the caller's current directory. The
/// child-facing endpoint is closed before this returns.
pub fn spawn_child(
    pair: &mut PtyPair,
    command: &str,
    args: &[String],
    working_dir: Option<&Path>,
) -> Result<(ChildProcess, ProcessGroup), PtyError> {
    let slave = pair
        .take_slave()
        .ok_or(PtyError::NotInitialized)?;

    let mut cmd = CommandBuilder::new(command);
    cmd.args(args);
    match working_dir {
        Some(dir) => cmd.cwd(dir),
        None => {
            let cwd = std::env::current_dir()
                .map_err(|err| PtyError::spawn("failed to resolve working directory", err))?;
            cmd.cwd(cwd);
        }
    }
    cmd.env("TERM", "xterm-256color");

    let child = slave
        .spawn_command(cmd)
        .map_err(|err| PtyError::spawn("failed to spawn child process", err))?;

    // Hand the child-facing endpoint back to the OS right away so the
    // host-read side sees a clean pipe-closed when the device goes down.
    drop(slave);

    let killer = child.clone_killer();
    let pid = child.process_id();
    tracing::debug!(command, ?pid, "spawned child on pty");

    Ok((
        ChildProcess { child, pid },
        ProcessGroup { killer, pid },
    ))
}
