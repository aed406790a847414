//! Logging setup. Everything goes to stderr: stdout carries the protocol.

use std::env;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "SLACK_SAGE_LOG";
pub const LOG_FORMAT_ENV: &str = "SLACK_SAGE_LOG_FORMAT";
const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub format: LogFormat,
}

impl LogSettings {
    /// `SLACK_SAGE_LOG`, then `RUST_LOG`, then `info`.
    pub fn from_env() -> Self {
        Self::from_vars(
            env::var(LOG_FILTER_ENV).ok(),
            env::var(EnvFilter::DEFAULT_ENV).ok(),
            env::var(LOG_FORMAT_ENV).ok(),
        )
    }

    fn from_vars(own: Option<String>, rust_log: Option<String>, format: Option<String>) -> Self {
        let filter = own
            .filter(|v| !v.trim().is_empty())
            .or(rust_log.filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        Self {
            filter,
            format: format.as_deref().map(LogFormat::parse).unwrap_or(LogFormat::Text),
        }
    }
}

/// Installs the global subscriber. Calling it twice only warns.
pub fn init(settings: &LogSettings) {
    let filter = EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr);

    let installed = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if let Err(e) = installed {
        warn!("logging was already initialised: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_filter_wins_over_rust_log() {
        let settings = LogSettings::from_vars(
            Some("debug".to_string()),
            Some("warn".to_string()),
            None,
        );
        assert_eq!(settings.filter, "debug");
        assert_eq!(settings.format, LogFormat::Text);
    }

    #[test]
    fn falls_back_to_rust_log_then_info() {
        let settings = LogSettings::from_vars(None, Some("warn".to_string()), None);
        assert_eq!(settings.filter, "warn");

        let settings = LogSettings::from_vars(Some(" ".to_string()), None, None);
        assert_eq!(settings.filter, "info");
    }

    #[test]
    fn json_format_is_case_insensitive() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Text);
    }

    #[test]
    fn second_init_does_not_panic() {
        let settings = LogSettings::from_vars(None, None, None);
        init(&settings);
        init(&settings);
    }
}
