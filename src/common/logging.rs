use tracing_subscriber::EnvFilter;

use crate::configs::LoggingConfig;

/// Install the global tracing subscriber from config.
///
/// `RUST_LOG` wins over the configured level/filters when set. Safe to call
/// from the embedding app's startup only; a second call is a no-op.
pub fn init(config: &LoggingConfig) {
    let log_level = config.level.as_deref().unwrap_or("info");
    let filters = config.filters.as_deref().unwrap_or("");

    let filter_str = if filters.is_empty() {
        log_level.to_string()
    } else {
        format!("{},{}", log_level, filters)
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    let result = match &config.file {
        Some(path) => match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => builder
                .with_writer(std::sync::Arc::new(file))
                .with_ansi(false)
                .try_init(),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", path, e);
                tracing_subscriber::fmt()
                    .with_env_filter(
                        EnvFilter::try_from_default_env()
                            .unwrap_or_else(|_| EnvFilter::new(log_level.to_string())),
                    )
                    .try_init()
            }
        },
        None => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed, keeping existing one");
    }
}
