//! Engine log sinks
//!
//! The engine never logs to a global logger; it emits through the narrow
//! [`LogSink`] interface and the host decides where lines go. Two sinks are
//! provided: a bounded channel sink that drops on overflow and counts the
//! drops, and an adapter onto the `tracing` facade.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Destination for engine diagnostics.
///
/// Implementations must never block the dispatch loop; a sink that cannot
/// keep up should drop and account for it rather than stall the simulation.
pub trait LogSink: Send {
    fn emit(&self, severity: Severity, message: &str);
}

/// One emitted log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub severity: Severity,
    pub message: String,
}

/// Severity-filtered sink backed by a bounded channel.
///
/// `emit` never blocks: when the queue is full the line is dropped and the
/// drop counter incremented. The host drains the [`Receiver`] at its own
/// pace and can inspect [`ChannelLogSink::dropped`] afterwards.
pub struct ChannelLogSink {
    min_severity: Severity,
    tx: Sender<LogLine>,
    dropped: AtomicU64,
}

impl ChannelLogSink {
    /// Create a sink with the given queue capacity and severity floor.
    ///
    /// Returns the sink and the receiving end of the queue.
    pub fn bounded(capacity: usize, min_severity: Severity) -> (Self, Receiver<LogLine>) {
        let (tx, rx) = bounded(capacity);
        (
            Self {
                min_severity,
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Lines dropped because the queue was full or disconnected.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl LogSink for ChannelLogSink {
    fn emit(&self, severity: Severity, message: &str) {
        if severity < self.min_severity {
            return;
        }
        let line = LogLine {
            severity,
            message: message.to_string(),
        };
        if let Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) = self.tx.try_send(line) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Sink forwarding onto the `tracing` facade.
#[derive(Debug, Clone)]
pub struct TracingLogSink {
    min_severity: Severity,
}

impl TracingLogSink {
    pub fn new(min_severity: Severity) -> Self {
        Self { min_severity }
    }
}

impl LogSink for TracingLogSink {
    fn emit(&self, severity: Severity, message: &str) {
        if severity < self.min_severity {
            return;
        }
        match severity {
            Severity::Trace => tracing::trace!("{}", message),
            Severity::Debug => tracing::debug!("{}", message),
            Severity::Info => tracing::info!("{}", message),
            Severity::Warn => tracing::warn!("{}", message),
            Severity::Error => tracing::error!("{}", message),
        }
    }
}
