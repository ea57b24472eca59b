//! Handler context.

use crate::chat::{Chat, Server, User};
use crate::command::Command;
use crate::engine::Engine;
use std::sync::Arc;

/// Everything a handler can see about the invocation.
pub struct Context<'a> {
    /// The engine, for handlers that touch shared state.
    pub engine: &'a Arc<Engine>,
    /// Chat the command was issued in.
    pub chat: &'a Chat,
    /// User who issued it (the original sender, for scheduled commands).
    pub sender: &'a User,
    pub command: &'a Command,
    /// Final arguments, alias prefix included.
    pub args: &'a [String],
}

impl<'a> Context<'a> {
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).map(String::as_str)
    }

    /// Arguments from `start` on, joined by single spaces.
    pub fn joined(&self, start: usize) -> String {
        self.args.get(start..).unwrap_or_default().join(" ")
    }

    pub fn delimiter(&self) -> String {
        self.engine.delimiter(self.chat)
    }

    /// `Usage: ...` line for the running command.
    pub fn usage(&self) -> String {
        format!("Usage: {}", self.command.usage(&self.delimiter()))
    }

    pub fn server(&self) -> Option<Server> {
        self.engine.server_of(self.chat)
    }
}
