use tracing_subscriber::EnvFilter;

/// Initializes structured logging for binaries embedding the orchestrators.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`. Safe to call once per
/// process; later calls are ignored.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().try_init();
}
