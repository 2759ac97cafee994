use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "guardian.log";

// HTTP internals are chatty at info; our own crate is what matters.
const DEFAULT_DIRECTIVES: &str = "info,guardian_tui=debug,hyper=warn,reqwest=warn";

/// The terminal belongs to the TUI, so everything goes to `logs/guardian.log`.
/// `RUST_LOG` overrides the default directives.
pub fn initialize_logging() -> WorkerGuard {
    let _ = std::fs::create_dir_all(LOG_DIR);

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter_from(std::env::var("RUST_LOG").ok().as_deref()))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!(dir = LOG_DIR, file = LOG_FILE, "Logging initialized.");
    guard
}

/// Falls back to the defaults when the override is missing or unparsable.
fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}
