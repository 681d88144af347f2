use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::TracingError;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_DIRECTIVE: &str = "info,bootconf=debug";

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Build the filter from `RUST_LOG`, falling back to `default_directive`.
pub fn env_filter(default_directive: &str) -> Result<EnvFilter, TracingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directive)
            .map_err(|e| TracingError::FilterError(e.to_string())),
    }
}

/// Install the global subscriber.
///
/// Fails when a subscriber is already installed; callers are free to
/// ignore that, logging never has to work for configuration to load.
pub fn init_tracing(default_directive: &str, format: LogFormat) -> Result<(), TracingError> {
    let filter = env_filter(default_directive)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_level(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .json(),
            )
            .try_init(),
    };

    result.map_err(|e| TracingError::InitError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_directive() {
        std::env::remove_var("RUST_LOG");
        assert!(matches!(
            env_filter("bootconf=verbose"),
            Err(TracingError::FilterError(_))
        ));
    }

    #[test]
    fn test_second_init_fails() {
        let first = init_tracing(DEFAULT_DIRECTIVE, LogFormat::Text);
        let second = init_tracing(DEFAULT_DIRECTIVE, LogFormat::Json);
        assert!(first.is_ok());
        assert!(matches!(second, Err(TracingError::InitError(_))));
    }
}
