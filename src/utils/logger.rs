use std::path::Path;
use std::sync::OnceLock;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber: console always, daily-rolling file when enabled.
pub fn init_logger(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_ansi(true)
        .with_writer(std::io::stdout);

    let file_layer = cfg.to_file.then(|| {
        let path = Path::new(&cfg.file_path);
        let dir = path.parent().unwrap_or_else(|| Path::new("./logs"));
        let name = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("walletscan.log"));
        let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, name));
        GUARD.set(guard).ok();

        fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .with_writer(writer)
    });

    // A second init (e.g. from tests) is not an error worth failing on
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
