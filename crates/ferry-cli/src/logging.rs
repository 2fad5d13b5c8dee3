//! Tracing subscriber setup.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Shape of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// `RUST_LOG` when set, otherwise `level`.
fn filter(rust_log: Option<&str>, level: LogLevel) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean for
/// tables and pull request bodies.
pub fn init(level: LogLevel, format: LogFormat) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(rust_log.as_deref(), level))
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_used_without_rust_log() {
        assert_eq!(filter(None, LogLevel::Debug).to_string(), "debug");
    }

    #[test]
    fn test_rust_log_wins() {
        assert_eq!(
            filter(Some("ferry_core=trace"), LogLevel::Warn).to_string(),
            "ferry_core=trace"
        );
    }

    #[test]
    fn test_invalid_rust_log_falls_back() {
        assert_eq!(filter(Some("ferry=loud"), LogLevel::Error).to_string(), "error");
    }
}
