use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber. Defaults to `info`, `RUST_LOG` overrides it. Calling it
/// more than once is harmless.
pub fn init_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .try_init();
}
