//! Log destinations.
//!
//! The facade on [`Tracer`](crate::Tracer) builds a finished line and hands
//! it to a [`LogSink`]. The default sink turns each line into a `tracing`
//! event, so timestamps, filtering and output format are whatever subscriber
//! the binary installs:
//!
//! ```text
//! 2025-01-06T10:41:07.113Z  INFO tsu_trace: 3f1a0c9e… new request GET /users/42
//! ```
//!
//! Any `Fn(&str) + Send + Sync` closure is a sink too, which is handy for
//! capturing lines in tests.

use tracing::Level;

/// Destination for token-prefixed log lines.
pub trait LogSink: Send + Sync {
    fn write_line(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write_line(&self, line: &str) {
        self(line)
    }
}

/// Forwards lines to `tracing` under the `tsu_trace` target.
#[derive(Clone, Copy, Debug)]
pub struct TracingSink {
    level: Level,
}

impl TracingSink {
    /// Sink emitting at `INFO`.
    pub fn new() -> Self {
        Self { level: Level::INFO }
    }

    pub fn with_level(level: Level) -> Self {
        Self { level }
    }

    pub fn level(&self) -> Level { self.level }
}

impl Default for TracingSink {
    fn default() -> Self { Self::new() }
}

impl LogSink for TracingSink {
    fn write_line(&self, line: &str) {
        // `event!` needs a constant level, hence the dispatch.
        match self.level {
            Level::ERROR => tracing::error!(target: "tsu_trace", "{line}"),
            Level::WARN  => tracing::warn!(target: "tsu_trace", "{line}"),
            Level::INFO  => tracing::info!(target: "tsu_trace", "{line}"),
            Level::DEBUG => tracing::debug!(target: "tsu_trace", "{line}"),
            _            => tracing::trace!(target: "tsu_trace", "{line}"),
        }
    }
}
