//! Logging initialization.
//!
//! One tracing subscriber for the whole process: human-readable lines
//! (timestamp, level, target, message, fields) written to stdout and
//! appended to a log file.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{
    fmt::format::Writer,
    fmt::time::FormatTime,
    fmt::writer::MakeWriterExt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Local wall-clock time, `YYYY-MM-DD HH:MM:SS`.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{} ", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Initializes the global tracing subscriber.
///
/// Creates the log file's parent directory if needed and appends to the
/// file; no ANSI codes, so the file stays plain text. Level comes from
/// `RUST_LOG` (default `info`); load `.env` before calling so a level set
/// there takes effect.
pub fn init_tracing(log_file_path: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(log_file_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout.and(Arc::new(file)))
        .with_timer(LocalTimer)
        .with_target(true)
        .with_ansi(false);

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;

    Ok(())
}
