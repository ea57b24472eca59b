//! Prometheus metrics collection for convergence.
//!
//! Tracks command throughput, handler latency, dispatch failures, scheduler
//! activity, and cross-chat forwarding. There is no HTTP endpoint; callers
//! that want to expose the numbers render them with [`gather_text`].
//!
//! - `bot_command_total{command}` - Commands dispatched by name
//! - `bot_command_duration_seconds{command}` - Handler latency histogram
//! - `bot_command_errors_total{command, error}` - Failures by name and kind
//! - `bot_scheduler_fired_total` / `bot_scheduler_missed_total`
//! - `bot_messages_forwarded_total{protocol}` - Copies sent to linked chats

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Commands
// ========================================================================

/// Commands dispatched, by name.
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Handler latency, by name.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Command errors by name and error kind.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Scheduler and routing
// ========================================================================

pub static SCHEDULER_FIRED: OnceLock<IntCounter> = OnceLock::new();

/// Scheduled commands dropped for being past the lateness window.
pub static SCHEDULER_MISSED: OnceLock<IntCounter> = OnceLock::new();

/// Messages forwarded to linked chats, by target protocol.
pub static MESSAGES_FORWARDED: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup before any metrics are recorded. Recording before
/// `init` is a no-op.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(error = %e, concat!("Failed to create metric ", stringify!($metric)));
                }
            }
        };
    }

    register!(COMMAND_COUNTER, IntCounterVec::new(Opts::new("bot_command_total", "Commands dispatched by name"), &["command"]));
    register!(COMMAND_LATENCY, HistogramVec::new(
        HistogramOpts::new("bot_command_duration_seconds", "Command handler latency by name")
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["command"]));
    register!(COMMAND_ERRORS, IntCounterVec::new(Opts::new("bot_command_errors_total", "Command errors by name and kind"), &["command", "error"]));
    register!(SCHEDULER_FIRED, IntCounter::new("bot_scheduler_fired_total", "Scheduled commands executed"));
    register!(SCHEDULER_MISSED, IntCounter::new("bot_scheduler_missed_total", "Scheduled commands dropped past the lateness window"));
    register!(MESSAGES_FORWARDED, IntCounterVec::new(Opts::new("bot_messages_forwarded_total", "Messages forwarded to linked chats"), &["protocol"]));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

/// Record a command execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    if let Some(c) = COMMAND_COUNTER.get() {
        c.with_label_values(&[command]).inc();
    }
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a command error.
#[inline]
pub fn record_command_error(command: &str, error: &str) {
    if let Some(c) = COMMAND_ERRORS.get() {
        c.with_label_values(&[command, error]).inc();
    }
}

#[inline]
pub fn record_scheduler_fired() {
    if let Some(c) = SCHEDULER_FIRED.get() {
        c.inc();
    }
}

#[inline]
pub fn record_scheduler_missed() {
    if let Some(c) = SCHEDULER_MISSED.get() {
        c.inc();
    }
}

#[inline]
pub fn record_forwarded(protocol: &str) {
    if let Some(c) = MESSAGES_FORWARDED.get() {
        c.with_label_values(&[protocol]).inc();
    }
}
