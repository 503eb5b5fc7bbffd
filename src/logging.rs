use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
#[error("installing log subscriber: {0}")]
pub struct LoggingError(String);

/// Installs a global `tracing` subscriber.
///
/// `level` is an `EnvFilter` directive such as `"info"` or `"nl2tdl=debug"`; when absent
/// the filter comes from `RUST_LOG`. Fails instead of panicking if a subscriber is
/// already installed.
pub fn init_logging(level: Option<&str>) -> Result<(), LoggingError> {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| LoggingError(e.to_string()))
}
