//! Structured logging and security-focused trace utilities.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats and providing utilities to prevent
//! sensitive data (like API keys) from leaking into logs.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber for the application.
///
/// Supports two output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `pretty` (default): Human-readable, colorized output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`. Logs go to stderr so command output on
/// stdout stays machine-readable.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

/// Credential prefixes and the placeholder each is replaced with.
const SECRET_PATTERNS: &[(&str, &str)] = &[
    ("AIza", "[REDACTED_API_KEY]"),
    ("ya29.", "[REDACTED_ACCESS_TOKEN]"),
    ("1//0", "[REDACTED_REFRESH_TOKEN]"),
];

/// Sanitizes sensitive information from log messages.
///
/// Scans for Google API keys (`AIza...`) and OAuth tokens and replaces every
/// occurrence with a placeholder so secrets echoed back in error bodies are
/// never persisted in log sinks.
pub fn sanitize(input: &str) -> String {
    let mut result = input.to_string();

    for (prefix, placeholder) in SECRET_PATTERNS {
        let mut search_from = 0;
        while let Some(offset) = result[search_from..].find(prefix) {
            let start = search_from + offset;
            let end = result[start..]
                .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == '&')
                .map(|i| start + i)
                .unwrap_or(result.len());
            result.replace_range(start..end, placeholder);
            search_from = start + placeholder.len();
        }
    }

    result
}
