//! Logging initialization.
//!
//! All logs go to stderr; stdout is reserved for command output such as the
//! tag table. `RUST_LOG` takes precedence over both config and flags.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber.
///
/// `level` is an `EnvFilter` directive (`"info"`, `"latent_core=trace"`, ...)
/// used when `RUST_LOG` is unset.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section plus CLI flags.
pub fn init_from_config(
    config: &latent_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let (level, json_format) = resolve(config, verbose_override, json_logs_override);
    init(&level, json_format);
}

fn resolve(config: &latent_core::Config, verbose: bool, json_logs: bool) -> (String, bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let json_format = json_logs || config.logging.format == "json";
    (level, json_format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let config = latent_core::Config::default();
        assert_eq!(resolve(&config, false, false), ("info".to_string(), false));
        assert_eq!(resolve(&config, true, true), ("debug".to_string(), true));
    }

    #[test]
    fn test_json_format_from_config() {
        let mut config = latent_core::Config::default();
        config.logging.format = "json".to_string();
        config.logging.level = "warn".to_string();
        assert_eq!(resolve(&config, false, false), ("warn".to_string(), true));
    }
}
