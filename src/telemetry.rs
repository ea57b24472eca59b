//! Telemetry utilities for command timing and tracing spans.

use std::time::Instant;

/// Guard for timing command execution and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(&self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use crate::chat::{Chat, Protocol, User};
    use tracing::{Span, debug_span, info_span};

    /// Span for one handler invocation.
    pub fn command(name: &str, chat: &Chat, sender: &User) -> Span {
        debug_span!("bot.command", command = %name, chat = %chat, sender = %sender.name)
    }

    /// Span for a backend's receive loop.
    pub fn backend(protocol: &Protocol) -> Span {
        info_span!("backend", protocol = %protocol)
    }

    /// Span for one scheduler tick.
    pub fn scheduler_tick() -> Span {
        debug_span!("scheduler.tick")
    }
}
