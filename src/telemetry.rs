//! Logging setup for the binary
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the embedding program. The CLI calls [`init_logging`] once at startup.

use crate::error::{Error, Result};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level used when `RUST_LOG` is not set
    pub default_level: Level,
    /// Log span close events with their timings
    pub span_events: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: Level::WARN,
            span_events: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// `--verbose` selects debug output with span timings
    pub fn verbose(verbose: bool) -> Self {
        if verbose {
            Self {
                default_level: Level::DEBUG,
                span_events: true,
                ..Self::default()
            }
        } else {
            Self::default()
        }
    }

    /// Filter from `RUST_LOG`, falling back to the default level
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_level.to_string()))
    }
}

/// Install a compact stderr subscriber; stdout stays free for reports
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let span_events = if config.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .with_target(false)
        .with_span_events(span_events)
        .compact();

    tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to initialise logging: {}", e)))
}
