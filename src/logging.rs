use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with optional file output.
///
/// Logging is disabled by default: stdout carries the child's raw byte
/// stream, so diagnostics must never land there. Set `HEADLESS_PTY_LOG`
/// to a file path to enable logging.
///
/// Log files get a unique `.{pid}` suffix so concurrent instances do not
/// clobber each other.
pub fn init_tracing() {
    let Some(log_path) = std::env::var("HEADLESS_PTY_LOG").ok() else {
        return;
    };

    let unique_path = format!("{}.{}", log_path, std::process::id());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Ok(file) = std::fs::File::create(&unique_path) else {
        eprintln!("Warning: Failed to create log file: {}", unique_path);
        return;
    };

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();
}
