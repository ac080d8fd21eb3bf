//! Tracing subscriber setup.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Builds the filter. `RUST_LOG` wins over the configured level, and sqlx
/// statement logging is kept at warn unless asked for explicitly.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx::query=warn", level)))
}

/// Installs the global subscriber. `format = "json"` emits one JSON object
/// per line, anything else uses the pretty formatter.
pub fn init_logging(config: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(build_filter(&config.level));

    let result = if config.format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_target(true),
            )
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_includes_sqlx_directive() {
        let filter = build_filter("debug");
        let rendered = filter.to_string();
        if std::env::var("RUST_LOG").is_err() {
            assert!(rendered.contains("sqlx::query=warn"));
            assert!(rendered.contains("debug"));
        }
    }
}
