//! # Observability Hooks
//!
//! Optional process-wide logger and metrics sinks. The library never owns a
//! sink: callers install `Arc`s and may replace or remove them at any time.
//! Sink failures (a `false` return) are swallowed; nothing a sink does may
//! perturb caller-visible state.
//!
//! ## Call Sites
//!
//! - `set` / `get`: latency and operation counts around every mutation and
//!   lookup.
//! - `json_parse` / `json_serialize`: same, around the JSON codec.
//! - `set_impl`: logs "Node is full, splitting" at Info when a B-tree node
//!   splits, and drives the node-split counter.
//! - Failed equal-hash key comparisons drive the hash-collision counter.
//!
//! ## Threshold Gate
//!
//! Log records below the installed threshold (default Info) are dropped
//! before the logger is consulted.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Severity, totally ordered: Debug < Info < Warn < Error.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    fn from_byte(b: u8) -> Self {
        match b {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

/// Caller-supplied log sink. Returning `false` signals a sink-side failure;
/// the library ignores it.
pub trait Logger: Send + Sync {
    fn log(
        &self,
        level: LogLevel,
        message: &str,
        operation: &str,
        duration: Duration,
        buffer_offset: usize,
        key: &str,
    ) -> bool;
}

/// Caller-supplied metrics sink.
pub trait Metrics: Send + Sync {
    fn record_latency(&self, operation: &str, seconds: f64) -> bool;
    fn increment_operation_count(&self, operation: &str, status: &str) -> bool;
    fn set_buffer_usage(&self, used_bytes: usize) -> bool;
    fn set_buffer_capacity(&self, capacity_bytes: usize) -> bool;
    fn increment_node_splits(&self) -> bool;
    fn increment_hash_collisions(&self) -> bool;
}

static LOGGER: RwLock<Option<Arc<dyn Logger>>> = RwLock::new(None);
static METRICS: RwLock<Option<Arc<dyn Metrics>>> = RwLock::new(None);
static LOG_LEVEL_THRESHOLD: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Installs (or with `None` removes) the process-wide logger.
pub fn set_logger(logger: Option<Arc<dyn Logger>>) {
    *LOGGER.write() = logger;
}

/// Installs (or with `None` removes) the process-wide metrics sink.
pub fn set_metrics(metrics: Option<Arc<dyn Metrics>>) {
    *METRICS.write() = metrics;
}

/// Sets the threshold below which log records are dropped.
pub fn set_log_level_threshold(level: LogLevel) {
    LOG_LEVEL_THRESHOLD.store(level as u8, Ordering::Release);
}

pub fn log_level_threshold() -> LogLevel {
    LogLevel::from_byte(LOG_LEVEL_THRESHOLD.load(Ordering::Acquire))
}

pub(crate) fn log_if_enabled(
    level: LogLevel,
    message: &str,
    operation: &str,
    duration: Duration,
    buffer_offset: usize,
    key: &str,
) {
    if level < log_level_threshold() {
        return;
    }
    if let Some(logger) = LOGGER.read().as_ref() {
        let _ = logger.log(level, message, operation, duration, buffer_offset, key);
    }
}

pub(crate) fn with_metrics(f: impl FnOnce(&dyn Metrics)) {
    if let Some(metrics) = METRICS.read().as_ref() {
        f(metrics.as_ref());
    }
}

/// Records latency and an "ok" operation count for a named call site when
/// dropped.
pub(crate) struct OpTimer {
    operation: &'static str,
    start: Instant,
}

impl OpTimer {
    pub(crate) fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for OpTimer {
    fn drop(&mut self) {
        with_metrics(|m| {
            let _ = m.record_latency(self.operation, self.start.elapsed().as_secs_f64());
            let _ = m.increment_operation_count(self.operation, "ok");
        });
    }
}
