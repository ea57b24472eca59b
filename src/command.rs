//! Commands, aliases, and resolved invocations.

use crate::chat::{AliasScope, Protocol};
use crate::handlers::CommandHandler;
use std::fmt;
use std::sync::Arc;

/// How an argument is interpreted, for usage text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentType {
    Text,
    Integer,
    Time,
    /// Consumes every remaining argument.
    Rest,
}

/// One declared argument of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub name: String,
    pub kind: ArgumentType,
    pub optional: bool,
}

impl ArgumentSpec {
    pub fn required(name: impl Into<String>, kind: ArgumentType) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ArgumentType) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: true,
        }
    }
}

impl fmt::Display for ArgumentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dots = if self.kind == ArgumentType::Rest { "..." } else { "" };
        if self.optional {
            write!(f, "[{}{}]", self.name, dots)
        } else {
            write!(f, "<{}{}>", self.name, dots)
        }
    }
}

/// A registered command.
///
/// Built with [`Command::new`] and the `with_*` methods, then handed to
/// [`crate::Engine::register_command`]. Names are stored lowercased.
pub struct Command {
    protocol: Protocol,
    name: String,
    arg_specs: Vec<ArgumentSpec>,
    handler: Arc<dyn CommandHandler>,
    help: String,
    usage: Option<String>,
}

impl Command {
    /// A universal command.
    pub fn new(name: &str, handler: impl CommandHandler + 'static) -> Self {
        Self {
            protocol: Protocol::universal(),
            name: name.to_lowercase(),
            arg_specs: Vec::new(),
            handler: Arc::new(handler),
            help: String::new(),
            usage: None,
        }
    }

    /// Restrict the command to one protocol.
    pub fn on_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_arg(mut self, spec: ArgumentSpec) -> Self {
        self.arg_specs.push(spec);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Override the usage line derived from the argument specs.
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arg_specs(&self) -> &[ArgumentSpec] {
        &self.arg_specs
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    /// Usage line, e.g. `!schedule <time> <command...>`.
    pub fn usage(&self, delimiter: &str) -> String {
        if let Some(usage) = &self.usage {
            return format!("{}{} {}", delimiter, self.name, usage);
        }
        let mut line = format!("{}{}", delimiter, self.name);
        for spec in &self.arg_specs {
            line.push(' ');
            line.push_str(&spec.to_string());
        }
        line
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("protocol", &self.protocol)
            .field("name", &self.name)
            .field("arg_specs", &self.arg_specs)
            .finish_non_exhaustive()
    }
}

/// A name bound to a command plus a fixed argument prefix.
#[derive(Debug, Clone)]
pub struct Alias {
    pub scope: AliasScope,
    pub name: String,
    pub command: Arc<Command>,
    pub args: Vec<String>,
}

impl Alias {
    /// Bound arguments followed by the caller's.
    pub fn expand(&self, caller_args: Vec<String>) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + caller_args.len());
        args.extend(self.args.iter().cloned());
        args.extend(caller_args);
        args
    }

    /// The command text this alias stands for, e.g. `echo Hello %sender`.
    pub fn target(&self) -> String {
        let mut target = self.command.name().to_string();
        for arg in &self.args {
            target.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                target.push('"');
                target.push_str(arg);
                target.push('"');
            } else {
                target.push_str(arg);
            }
        }
        target
    }
}

/// A command ready to run, with its final argument list.
#[derive(Clone)]
pub struct CommandData {
    pub command: Arc<Command>,
    pub args: Vec<String>,
}

impl PartialEq for CommandData {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.command, &other.command) && self.args == other.args
    }
}

impl Eq for CommandData {}

impl fmt::Debug for CommandData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandData")
            .field("command", &self.command.name())
            .field("protocol", self.command.protocol())
            .field("args", &self.args)
            .finish()
    }
}
