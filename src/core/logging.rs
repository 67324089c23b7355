//! Diagnostic logging to stderr

use tracing_subscriber::EnvFilter;

use crate::core::Config;

/// Environment variable holding a tracing filter directive
pub const LOG_ENV: &str = "ELCA_LOG";

/// Install the global subscriber
///
/// `ELCA_LOG` wins over `--verbose`, which wins over the configured level.
pub fn init(verbose: bool, config: &Config) {
    let fallback = if verbose {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("warn")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV)
                .or_else(|_| EnvFilter::try_new(fallback))
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
