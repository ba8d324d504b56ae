//! Tracing setup for the keepalived-check binary.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parse a format name as found in settings files. Unknown names fall back to text.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Initialize tracing with an explicit default level and format.
///
/// RUST_LOG still takes precedence over `default_level`. Records are written
/// to stderr so that reports printed on stdout stay clean.
pub fn init_with(default_level: &str, format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };

    // A subscriber may already be installed (tests, embedding applications).
    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_name() {
        assert_eq!(LogFormat::from_name("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("text"), LogFormat::Text);
        assert_eq!(LogFormat::from_name("pretty"), LogFormat::Text);
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_with("debug", LogFormat::Text);
        init_with("info", LogFormat::Json);
    }
}
