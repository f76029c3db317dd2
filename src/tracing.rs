//! Tracing initialization.
//!
//! `SYMDEX_LOG` takes filter directives (falling back to `RUST_LOG`), and
//! `SYMDEX_LOG_FORMAT=json` switches stderr output to one JSON object per event.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, util::SubscriberInitExt};

/// Filter directives for symdex logging, e.g. `symdex::session=trace`.
pub const LOG_ENV: &str = "SYMDEX_LOG";
/// Output format: `compact` (default) or `json`.
pub const LOG_FORMAT_ENV: &str = "SYMDEX_LOG_FORMAT";

static INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Picks the directives to use: `SYMDEX_LOG` wins over `RUST_LOG`.
fn directives(symdex_log: Option<String>, rust_log: Option<String>) -> String {
    symdex_log
        .filter(|d| !d.trim().is_empty())
        .or(rust_log)
        .unwrap_or_default()
}

fn env_filter(default_level: LevelFilter) -> EnvFilter {
    let directives = directives(std::env::var(LOG_ENV).ok(), std::env::var("RUST_LOG").ok());
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .parse_lossy(directives)
}

/// Initialize tracing. Safe to call multiple times.
///
/// Logs go to stderr so stdout stays reserved for the MCP protocol.
pub fn init() {
    INIT.call_once(|| {
        let is_test =
            std::env::var("NEXTEST").is_ok() || std::env::var("CARGO_TARGET_TMPDIR").is_ok();

        if is_test {
            let builder = tracing_subscriber::fmt()
                .with_env_filter(env_filter(LevelFilter::DEBUG))
                .with_ansi(false)
                .compact();
            // Leak the guard so the default subscriber outlives this closure.
            std::mem::forget(builder.with_test_writer().finish().set_default());
            return;
        }

        let format = match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) => LogFormat::parse(&value).unwrap_or_else(|| {
                eprintln!("Unknown {LOG_FORMAT_ENV} '{value}', using compact");
                LogFormat::Compact
            }),
            Err(_) => LogFormat::default(),
        };

        let builder = tracing_subscriber::fmt()
            .with_env_filter(env_filter(LevelFilter::INFO))
            .with_ansi(false)
            .with_target(true)
            .with_writer(std::io::stderr);
        let result = match format {
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Json => builder.json().flatten_event(true).try_init(),
        };
        if let Err(e) = result {
            eprintln!("Failed to initialize tracing: {}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case("json", Some(LogFormat::Json))]
    #[case(" JSON ", Some(LogFormat::Json))]
    #[case("compact", Some(LogFormat::Compact))]
    #[case("", Some(LogFormat::Compact))]
    #[case("pretty", None)]
    fn test_log_format_parse(#[case] value: &str, #[case] expected: Option<LogFormat>) {
        check!(LogFormat::parse(value) == expected);
    }

    #[test]
    fn test_symdex_log_wins_over_rust_log() {
        let own = || Some("symdex=trace".to_string());
        let rust = || Some("warn".to_string());
        check!(directives(own(), rust()) == "symdex=trace");
        check!(directives(Some("  ".to_string()), rust()) == "warn");
        check!(directives(None, None).is_empty());
    }
}
