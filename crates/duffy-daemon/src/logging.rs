//! Tracing subscriber set-up for the Duffy binaries

use tracing_subscriber::EnvFilter;

use duffy_core::config::LoggingConfig;

/// Installs the global subscriber
///
/// `RUST_LOG` wins over `level`. `format` is `text` or `json`; anything
/// else falls back to text. Events are written to stderr.
pub fn init(config: &LoggingConfig, level: &str, with_target: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(with_target);

    if config.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Level for a CLI `-v` count, starting from the configured level
pub fn level_for_verbosity(configured: &str, verbose: u8) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for_verbosity("warn", 0), "warn");
        assert_eq!(level_for_verbosity("warn", 1), "debug");
        assert_eq!(level_for_verbosity("info", 3), "trace");
    }
}
