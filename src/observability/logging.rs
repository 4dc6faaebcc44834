//! Log subscriber initialization

use crate::config::{LogFormat, LoggingSettings};
use crate::error::CanaryError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over `settings.level`. Logs go to stderr so the
/// run report on stdout stays machine readable.
///
/// # Errors
///
/// Returns `ConfigurationError` if the filter is invalid or a subscriber is
/// already installed.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), CanaryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| {
            CanaryError::ConfigurationError(format!("Invalid log filter: {}", e))
        })?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match settings.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| {
        CanaryError::ConfigurationError(format!("Failed to install log subscriber: {}", e))
    })
}
