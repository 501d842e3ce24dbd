//! Logging setup.

use chrono::Local;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::{Error, Result};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "notifier=info,tower_http=info";

/// Timestamps in the server's local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Filter directive for a configured level, e.g. `debug`.
pub fn filter_for_level(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    if level.is_empty() || level == "info" {
        return DEFAULT_LOG_FILTER.to_string();
    }
    format!("notifier={level},tower_http={level}")
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_for_level(level)))
        .map_err(|e| Error::config(format!("invalid log level '{level}': {e}")))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_timer(LocalTimer),
            )
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
            .try_init()
    };

    result.map_err(|e| Error::Other(format!("Failed to set global default subscriber: {e}")))
}
