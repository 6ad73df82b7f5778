use tracing_subscriber::EnvFilter;

mod import;
mod query;
mod serve;

/// Logs to stderr, filtered by `RUST_LOG` (default `info`), so that command output on
/// stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
