//! General handlers: HELP, ECHO, PING, COMMANDS, ALIASES, CHATS, EXIT

use super::{CommandHandler, Context, HandlerResult, HelpEntry, Resolved};
use crate::chat::AliasScope;
use async_trait::async_trait;
use tracing::info;

/// Entries per `help` page.
pub const HELP_PAGE_SIZE: usize = 10;

/// Handler for the HELP command.
///
/// `help [page|command]`
///
/// Without an argument or with a page number, lists commands `(C)` and
/// aliases `(A)` usable in the chat. With a name, shows its usage.
pub struct HelpHandler;

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let delimiter = ctx.delimiter();
        let server = ctx.server();

        let page = match ctx.arg(0) {
            None => 1,
            Some(arg) => match arg.parse::<usize>() {
                Ok(page) => page,
                Err(_) => return Ok(Some(describe(ctx, arg, &delimiter))),
            },
        };

        let entries = ctx.engine.registry().help_entries(ctx.chat, server.as_ref());
        let pages = entries.len().div_ceil(HELP_PAGE_SIZE).max(1);
        if page == 0 || page > pages {
            return Ok(Some(format!(
                "Page {} does not exist. There {} {} page{}.",
                page,
                if pages == 1 { "is" } else { "are" },
                pages,
                if pages == 1 { "" } else { "s" }
            )));
        }

        let mut lines = vec![format!("Help (page {}/{}):", page, pages)];
        lines.extend(
            entries
                .iter()
                .skip((page - 1) * HELP_PAGE_SIZE)
                .take(HELP_PAGE_SIZE)
                .map(|entry| help_line(entry, &delimiter)),
        );
        Ok(Some(lines.join("\n")))
    }
}

fn help_line(entry: &HelpEntry, delimiter: &str) -> String {
    let summary = entry.summary();
    if summary.is_empty() {
        format!("{}{} {}", delimiter, entry.name(), entry.marker())
    } else {
        format!("{}{} {} - {}", delimiter, entry.name(), entry.marker(), summary)
    }
}

/// Detailed help for one name.
fn describe(ctx: &Context<'_>, name: &str, delimiter: &str) -> String {
    let server = ctx.server();
    let resolved = ctx.engine.registry().resolve(name, ctx.chat, server.as_ref());
    match resolved {
        Ok(Resolved::Alias(alias)) => format!(
            "{}{} (A) - alias for \"{}\"",
            delimiter,
            alias.name,
            alias.target()
        ),
        Ok(Resolved::Command(command)) => {
            let usage = format!("Usage: {}", command.usage(delimiter));
            if command.help().is_empty() {
                usage
            } else {
                format!("{}\n{}", usage, command.help())
            }
        }
        Err(e) => e.user_reply(),
    }
}

/// Handler for the ECHO command.
///
/// `echo <text...>`
pub struct EchoHandler;

#[async_trait]
impl CommandHandler for EchoHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if ctx.args.is_empty() {
            return Ok(None);
        }
        Ok(Some(ctx.joined(0)))
    }
}

/// Handler for the PING command.
pub struct PingHandler;

#[async_trait]
impl CommandHandler for PingHandler {
    async fn handle(&self, _ctx: &Context<'_>) -> HandlerResult {
        Ok(Some("Pong!".to_string()))
    }
}

/// Handler for the COMMANDS command.
///
/// Lists command names usable in the chat, aliases excluded.
pub struct CommandsHandler;

#[async_trait]
impl CommandHandler for CommandsHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let mut names: Vec<String> = ctx
            .engine
            .registry()
            .commands()
            .iter()
            .filter(|c| c.protocol().is_universal() || *c.protocol() == ctx.chat.protocol)
            .map(|c| c.name().to_string())
            .collect();
        names.sort();
        names.dedup();
        Ok(Some(format!("Commands: {}", names.join(", "))))
    }
}

/// Handler for the ALIASES command.
///
/// Lists aliases defined on the chat and on its server.
pub struct AliasesHandler;

#[async_trait]
impl CommandHandler for AliasesHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let mut scopes = vec![AliasScope::Chat(ctx.chat.clone())];
        if let Some(server) = ctx.server() {
            scopes.push(AliasScope::Server(server));
        }

        let lines: Vec<String> = {
            let registry = ctx.engine.registry();
            scopes
                .iter()
                .flat_map(|scope| registry.aliases(scope))
                .map(|alias| {
                    let place = match alias.scope {
                        AliasScope::Chat(_) => "chat",
                        AliasScope::Server(_) => "server",
                    };
                    format!("{} -> \"{}\" ({})", alias.name, alias.target(), place)
                })
                .collect()
        };

        if lines.is_empty() {
            return Ok(Some("No aliases are defined here.".to_string()));
        }
        Ok(Some(format!("Aliases:\n{}", lines.join("\n"))))
    }
}

/// Handler for the CHATS command.
///
/// Lists every chat the bot can see with the id used by `link`.
pub struct ChatsHandler;

#[async_trait]
impl CommandHandler for ChatsHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        ctx.engine.refresh_chats();
        let current = ctx.engine.chat_id(ctx.chat);
        let lines: Vec<String> = ctx
            .engine
            .chats()
            .into_iter()
            .map(|(id, chat)| {
                let marker = if id == current { " (this chat)" } else { "" };
                format!("{}: {} [{}]{}", id, ctx.engine.chat_name(&chat), chat.protocol, marker)
            })
            .collect();
        Ok(Some(lines.join("\n")))
    }
}

/// Handler for the EXIT command.
pub struct ExitHandler;

#[async_trait]
impl CommandHandler for ExitHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        info!(sender = %ctx.sender, chat = %ctx.chat, "Exit requested");
        ctx.engine.shutdown();
        Ok(Some("Shutting down.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::{HELP_PAGE_SIZE, handler_fn, register_defaults};
    use crate::command::Command;
    use crate::testing::{RecordingBackend, test_engine};
    use std::sync::Arc;

    async fn run(text: &str) -> (Vec<String>, Arc<crate::engine::Engine>) {
        let engine = test_engine();
        register_defaults(&engine);
        let backend = Arc::new(RecordingBackend::new("Console").with_chat("main"));
        engine.register_backend(backend.clone());
        let chat = backend.chat("main");
        engine.received_message(&chat, text, &backend.user("alice")).await;
        (backend.sent_to(&chat), engine)
    }

    #[tokio::test]
    async fn test_ping_and_echo() {
        assert_eq!(run("!ping").await.0, vec!["Pong!"]);
        assert_eq!(run("!echo  spaced   out").await.0, vec!["spaced out"]);
        assert!(run("!echo").await.0.is_empty());
    }

    #[tokio::test]
    async fn test_help_pages() {
        let (sent, _) = run("!help").await;
        let lines: Vec<&str> = sent[0].lines().collect();
        assert_eq!(lines[0], "Help (page 1/2):");
        assert_eq!(lines.len(), HELP_PAGE_SIZE + 1);
        assert!(lines[1].starts_with("!alias (C) - "));

        let (sent, _) = run("!help 2").await;
        assert_eq!(sent[0].lines().count(), 18 - HELP_PAGE_SIZE + 1);

        let (sent, _) = run("!help 3").await;
        assert_eq!(sent, vec!["Page 3 does not exist. There are 2 pages."]);
    }

    #[tokio::test]
    async fn test_help_for_one_command() {
        let (sent, _) = run("!help schedule").await;
        assert_eq!(sent, vec!["Usage: !schedule <time> <command...>\nRuns a command later."]);

        let (sent, _) = run("!help nope").await;
        assert_eq!(sent, vec!["No command exists with name \"nope\"."]);
    }

    #[tokio::test]
    async fn test_help_lists_protocol_commands() {
        let engine = test_engine();
        let backend = Arc::new(RecordingBackend::new("Console"));
        engine.register_backend(backend.clone());
        engine.register_command(
            Command::new("local", handler_fn(|_| Ok(None)))
                .on_protocol(backend.chat("x").protocol.clone())
                .with_help("Console only."),
        );
        engine.register_command(Command::new("help", crate::handlers::HelpHandler));
        let chat = backend.chat("main");
        engine.received_message(&chat, "!help", &backend.user("alice")).await;
        assert_eq!(
            backend.sent_to(&chat),
            vec!["Help (page 1/1):\n!local (C) - Console only.\n!help (C)"]
        );
    }

    #[tokio::test]
    async fn test_exit_shuts_down() {
        let (sent, engine) = run("!exit").await;
        assert_eq!(sent, vec!["Shutting down."]);
        assert!(engine.is_shutting_down());
    }

    #[tokio::test]
    async fn test_chats_lists_ids() {
        let (sent, _) = run("!chats").await;
        assert_eq!(sent, vec!["1: main [Console] (this chat)"]);
    }
}
