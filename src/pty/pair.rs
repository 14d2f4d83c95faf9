//! Pseudo-terminal device ownership.
//!
//! `PtyPair` allocates the device and both host-facing endpoints. During
//! `Session::start` its parts are handed out: the reader moves into the
//! relay thread, the slave is consumed by the spawner, and the master and
//! writer live behind a cheaply clonable [`PtyHandle`] shared by the
//! facade and both background threads.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use portable_pty::{native_pty_system, MasterPty, PtySize, SlavePty};

use crate::pty::error::PtyError;

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self {
            cols: 120,
            rows: 40,
        }
    }
}

impl TerminalSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    fn to_pty_size(self) -> PtySize {
        PtySize {
            rows: self.rows.max(1),
            cols: self.cols.max(1),
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

type SharedMaster = Arc<Mutex<Option<Box<dyn MasterPty + Send>>>>;
type SharedWriter = Arc<Mutex<Option<Box<dyn Write + Send>>>>;

/// A freshly opened pseudo-terminal with all endpoints still attached.
pub struct PtyPair {
    master: SharedMaster,
    writer: SharedWriter,
    reader: Option<Box<dyn Read + Send>>,
    slave: Option<Box<dyn SlavePty + Send>>,
    torn_down: Arc<AtomicBool>,
}

impl PtyPair {
    /// Allocate the device and both host-side endpoints at the given size.
    ///
    /// On any step's failure everything already allocated in this call is
    /// released (dropped) before returning.
    pub fn open(size: TerminalSize) -> Result<Self, PtyError> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(size.to_pty_size())
            .map_err(|err| PtyError::init("failed to open pseudo-terminal", err))?;

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|err| PtyError::init("failed to clone pty reader", err))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|err| PtyError::init("failed to take pty writer", err))?;

        Ok(Self {
            master: Arc::new(Mutex::new(Some(pair.master))),
            writer: Arc::new(Mutex::new(Some(writer))),
            reader: Some(reader),
            slave: Some(pair.slave),
            torn_down: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Take the host-read endpoint. The relay thread owns it exclusively.
    pub(crate) fn take_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.reader.take()
    }

    /// Take the child-facing endpoint for spawning. It must be dropped as
    /// soon as the child is bound; retaining it would prevent clean
    /// detection of device teardown.
    pub(crate) fn take_slave(&mut self) -> Option<Box<dyn SlavePty + Send>> {
        self.slave.take()
    }

    /// Shared handle for the facade and background threads.
    pub fn handle(&self) -> PtyHandle {
        PtyHandle {
            master: Arc::clone(&self.master),
            writer: Arc::clone(&self.writer),
            torn_down: Arc::clone(&self.torn_down),
        }
    }
}

/// Shared view of the live device: write, resize, peek, and teardown.
#[derive(Clone)]
pub struct PtyHandle {
    master: SharedMaster,
    writer: SharedWriter,
    torn_down: Arc<AtomicBool>,
}

impl PtyHandle {
    /// Forward bytes to the host-write endpoint, synchronously.
    pub fn write(&self, bytes: &[u8]) -> Result<(), PtyError> {
        let mut writer = self.writer.lock();
        let Some(writer) = writer.as_mut() else {
            return Err(PtyError::write("write pipe not available"));
        };
        writer.write_all(bytes).map_err(PtyError::write)?;
        writer.flush().map_err(PtyError::write)?;
        Ok(())
    }

    /// Adjust the live device's dimensions. Bytes already in flight are
    /// unaffected; on failure the previous size is retained by the OS.
    pub fn resize(&self, size: TerminalSize) -> Result<(), PtyError> {
        let master = self.master.lock();
        let Some(master) = master.as_ref() else {
            return Err(PtyError::NotInitialized);
        };
        master.resize(size.to_pty_size()).map_err(PtyError::resize)
    }

    /// Bytes currently buffered on the host-read endpoint.
    ///
    /// `Some(0)` means a dead child has nothing left to drain. `None`
    /// means the platform cannot answer; the relay then keeps reading and
    /// relies on teardown to unblock it.
    pub(crate) fn pending_output(&self) -> Option<usize> {
        let master = self.master.lock();
        let Some(master) = master.as_ref() else {
            // Torn down: nothing will ever arrive again.
            return Some(0);
        };
        pending_on_master(master.as_ref())
    }

    /// Close the device, causing any blocked host-read to fail with a
    /// pipe-closed condition. Idempotent; safe to call from either
    /// background thread or the facade.
    pub fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!("tearing down pseudo-terminal");
        self.writer.lock().take();
        self.master.lock().take();
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

#[cfg(unix)]
fn pending_on_master(master: &(dyn MasterPty + Send)) -> Option<usize> {
    let fd = master.as_raw_fd()?;
    let mut count: libc::c_int = 0;
    let rc = unsafe { libc::ioctl(fd, libc::FIONREAD, &mut count) };
    if rc == 0 {
        Some(count as usize)
    } else {
        None
    }
}

#[cfg(not(unix))]
fn pending_on_master(_master: &(dyn MasterPty + Send)) -> Option<usize> {
    None
}
