//! headless-pty CLI: run a command on a real pseudo-terminal.
//!
//! The spawned process sees `isatty(stdin)` and `isatty(stdout)` as true
//! even without a visible terminal window. Output is relayed raw to
//! stdout; stdin is forwarded to the child; the child's exit code becomes
//! this process's own.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;

use headless_pty::{PtyHandle, Session, SessionConfig, StdoutSink, TerminalSize};

mod logging;

const STDIN_BUFFER_SIZE: usize = 1024;

#[derive(Parser)]
#[command(
    name = "headless-pty",
    version,
    about = "A headless terminal that keeps isatty() = true"
)]
struct Cli {
    /// Terminal width in character cells
    #[arg(long, default_value_t = 120)]
    width: u16,

    /// Terminal height in character cells
    #[arg(long, default_value_t = 40)]
    height: u16,

    /// Working directory for the child process (default: inherit)
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Command to run followed by its arguments (default: platform shell)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() {
    logging::init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut command = cli.command;
    let config = SessionConfig {
        size: TerminalSize::new(cli.width, cli.height),
        command: if command.is_empty() {
            headless_pty::pty::default_shell()
        } else {
            command.remove(0)
        },
        args: command,
        working_dir: cli.cwd,
    };

    let mut session = Session::new();
    session.set_output_sink(Arc::new(StdoutSink));

    if !session.start(&config) {
        bail!("failed to start headless pty: {}", session.last_error());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    register_signal_handlers(&shutdown);

    // Raw mode only when a human terminal is attached; in pipe mode the
    // bytes must pass through untouched anyway.
    let raw_guard = RawModeGuard::enable_if_tty();

    if let Some(handle) = session.handle() {
        spawn_stdin_forwarder(handle, Arc::clone(&shutdown));
    }

    while session.is_running() && !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }

    shutdown.store(true, Ordering::SeqCst);
    session.stop();
    drop(raw_guard);

    let exit_code = session.wait(Duration::ZERO);
    Ok(if exit_code >= 0 { exit_code } else { 0 })
}

/// Forward external input to the child. The thread is detached: it exits
/// when stdin closes or the pty goes away, and is otherwise reaped with
/// the process.
fn spawn_stdin_forwarder(handle: PtyHandle, shutdown: Arc<AtomicBool>) {
    thread::spawn(move || {
        let mut stdin = io::stdin();
        let mut buffer = [0u8; STDIN_BUFFER_SIZE];

        while !shutdown.load(Ordering::SeqCst) {
            let count = match stdin.read(&mut buffer) {
                Ok(0) => break,
                Ok(count) => count,
                Err(_) => break,
            };
            if handle.write(&buffer[..count]).is_err() {
                break;
            }
        }
    });
}

#[cfg(unix)]
fn register_signal_handlers(shutdown: &Arc<AtomicBool>) {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};

    for signal in [SIGINT, SIGTERM] {
        if let Err(err) = signal_hook::flag::register(signal, Arc::clone(shutdown)) {
            tracing::warn!(signal, %err, "failed to register signal handler");
        }
    }
}

#[cfg(not(unix))]
fn register_signal_handlers(_shutdown: &Arc<AtomicBool>) {}

struct RawModeGuard;

impl RawModeGuard {
    fn enable_if_tty() -> Option<Self> {
        if !io::stdin().is_terminal() {
            return None;
        }
        crossterm::terminal::enable_raw_mode().ok()?;
        Some(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}
