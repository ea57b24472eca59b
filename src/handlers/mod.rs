//! Bot command handlers.
//!
//! This module contains the [`CommandHandler`] trait, the command/alias
//! [`Registry`], and the built-in commands every engine starts with.
//!
//! ## Built-ins
//!
//! All built-ins register on the universal protocol, so any protocol command
//! or alias with the same name shadows them. Handlers read their arguments
//! through [`Context::arg`] and answer by returning `Ok(Some(text))`.

mod alias;
pub mod core;
mod general;
mod link;
mod schedule;
mod timer;

pub use self::core::{
    CommandHandler, Context, FnHandler, HandlerResult, HelpEntry, HelpKey, Registry, Resolved,
    handler_fn,
};

pub use alias::{AliasHandler, UnaliasHandler};
pub use general::{
    AliasesHandler, ChatsHandler, CommandsHandler, EchoHandler, ExitHandler, HELP_PAGE_SIZE,
    HelpHandler, PingHandler,
};
pub use link::{LinkHandler, LinksHandler, SetDelimiterHandler, UnlinkHandler};
pub use schedule::{
    AllEventsHandler, EventsHandler, ScheduleHandler, UnscheduleHandler, parse_time,
};
pub use timer::{TimerHandler, format_duration};

use crate::command::{ArgumentSpec, ArgumentType, Command};
use crate::engine::Engine;
use tracing::info;

/// Register the built-in commands. Returns how many were added.
pub fn register_defaults(engine: &Engine) -> usize {
    use ArgumentType::{Integer, Rest, Text, Time};

    let commands = [
        Command::new("help", HelpHandler)
            .with_arg(ArgumentSpec::optional("page|command", Text))
            .with_help("Lists commands and aliases, or explains one."),
        Command::new("echo", EchoHandler)
            .with_arg(ArgumentSpec::required("text", Rest))
            .with_help("Repeats its arguments."),
        Command::new("ping", PingHandler).with_help("Replies with Pong!"),
        Command::new("commands", CommandsHandler).with_help("Lists the commands usable here."),
        Command::new("aliases", AliasesHandler).with_help("Lists the aliases defined here."),
        Command::new("chats", ChatsHandler).with_help("Lists known chats and their ids."),
        Command::new("exit", ExitHandler).with_help("Shuts the bot down."),
        Command::new("alias", AliasHandler)
            .with_usage("[-s] <name> <command...>")
            .with_help("Creates an alias in this chat, or on this server with -s."),
        Command::new("unalias", UnaliasHandler)
            .with_arg(ArgumentSpec::required("names", Rest))
            .with_help("Removes aliases from this chat or server."),
        Command::new("link", LinkHandler)
            .with_arg(ArgumentSpec::required("chat id", Integer))
            .with_help("Forwards messages between this chat and another."),
        Command::new("unlink", UnlinkHandler)
            .with_arg(ArgumentSpec::required("chat id", Integer))
            .with_help("Stops forwarding between this chat and another."),
        Command::new("links", LinksHandler).with_help("Lists the chats linked to this one."),
        Command::new("setdelimiter", SetDelimiterHandler)
            .with_arg(ArgumentSpec::required("delimiter", Text))
            .with_help("Changes the command prefix for this chat."),
        Command::new("schedule", ScheduleHandler)
            .with_arg(ArgumentSpec::required("time", Time))
            .with_arg(ArgumentSpec::required("command", Rest))
            .with_help("Runs a command later."),
        Command::new("unschedule", UnscheduleHandler)
            .with_arg(ArgumentSpec::required("id", Integer))
            .with_help("Cancels a scheduled command."),
        Command::new("events", EventsHandler).with_help("Lists your scheduled commands."),
        Command::new("allevents", AllEventsHandler).with_help("Lists every scheduled command."),
        Command::new("timer", TimerHandler)
            .with_usage("start|check|stop <name>")
            .with_help("Measures elapsed time."),
    ];

    let added = commands
        .into_iter()
        .map(|command| engine.register_command(command))
        .filter(|added| *added)
        .count();
    info!(count = added, "Built-in commands registered");
    added
}
