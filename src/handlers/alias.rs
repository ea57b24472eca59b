//! Alias handlers: ALIAS, UNALIAS

use super::{CommandHandler, Context, HandlerResult};
use crate::chat::AliasScope;
use async_trait::async_trait;

/// Flag selecting the server scope.
const SERVER_FLAG: &str = "-s";

/// Handler for the ALIAS command.
///
/// `alias [-s] <name> <command...>`
///
/// The target is usually quoted (`alias hi "echo Hello %sender"`); several
/// unquoted words are joined with spaces. With `-s` the alias applies to
/// every chat on the server.
pub struct AliasHandler;

#[async_trait]
impl CommandHandler for AliasHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let (scope, rest) = if ctx.arg(0) == Some(SERVER_FLAG) {
            let Some(server) = ctx.server() else {
                return Ok(Some("This chat is not part of a server.".to_string()));
            };
            (AliasScope::Server(server), 1)
        } else {
            (AliasScope::Chat(ctx.chat.clone()), 0)
        };

        let (Some(name), true) = (ctx.arg(rest), ctx.args.len() > rest + 1) else {
            return Ok(Some(ctx.usage()));
        };
        let target = ctx.joined(rest + 1);

        let reply = match ctx.engine.create_alias(scope, name, &target, ctx.chat) {
            Ok(alias) => format!(
                "Alias \"{}\" created for \"{}\".",
                alias.name,
                alias.target()
            ),
            Err(e) => format!("Could not create alias: {}.", e),
        };
        Ok(Some(reply))
    }
}

/// Handler for the UNALIAS command.
///
/// `unalias <names...>`
///
/// Each name is removed from the chat scope if defined there, otherwise
/// from the server scope.
pub struct UnaliasHandler;

#[async_trait]
impl CommandHandler for UnaliasHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if ctx.args.is_empty() {
            return Ok(Some(ctx.usage()));
        }
        let chat_scope = AliasScope::Chat(ctx.chat.clone());
        let server_scope = ctx.server().map(AliasScope::Server);

        let mut removed = Vec::new();
        let mut missing = Vec::new();
        for name in ctx.args {
            let gone = ctx.engine.remove_alias(&chat_scope, name)
                || server_scope
                    .as_ref()
                    .is_some_and(|scope| ctx.engine.remove_alias(scope, name));
            if gone {
                removed.push(name.to_lowercase());
            } else {
                missing.push(name.clone());
            }
        }

        let mut parts = Vec::new();
        if !removed.is_empty() {
            parts.push(format!("Removed: {}.", removed.join(", ")));
        }
        if !missing.is_empty() {
            parts.push(format!("No such alias: {}.", missing.join(", ")));
        }
        Ok(Some(parts.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::register_defaults;
    use crate::testing::{RecordingBackend, test_engine};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_alias_lifecycle() {
        let engine = test_engine();
        register_defaults(&engine);
        let backend = Arc::new(RecordingBackend::new("Console"));
        engine.register_backend(backend.clone());
        let chat = backend.chat("main");
        let alice = backend.user("alice");

        engine.received_message(&chat, "!alias hi \"echo Hello %sender\"", &alice).await;
        engine.received_message(&chat, "!hi and welcome", &alice).await;
        engine.received_message(&chat, "!unalias hi bye", &alice).await;
        engine.received_message(&chat, "!hi", &alice).await;

        assert_eq!(
            backend.sent_to(&chat),
            vec![
                "Alias \"hi\" created for \"echo Hello alice\".",
                "Hello alice and welcome",
                "Removed: hi. No such alias: bye.",
                "No command exists with name \"hi\".",
            ]
        );
    }

    #[tokio::test]
    async fn test_server_alias_needs_server() {
        let engine = test_engine();
        register_defaults(&engine);
        let plain = Arc::new(RecordingBackend::new("Console"));
        let guild = Arc::new(RecordingBackend::new("Discord").with_server("guild"));
        engine.register_backend(plain.clone());
        engine.register_backend(guild.clone());

        let console = plain.chat("main");
        engine.received_message(&console, "!alias -s p ping", &plain.user("a")).await;
        assert_eq!(plain.sent_to(&console), vec!["This chat is not part of a server."]);

        let general = guild.chat("general");
        let other = guild.chat("random");
        engine.received_message(&general, "!alias -s p ping", &guild.user("a")).await;
        engine.received_message(&other, "!p", &guild.user("b")).await;
        assert_eq!(guild.sent_to(&other), vec!["Pong!"]);
    }

    #[tokio::test]
    async fn test_alias_usage_and_errors() {
        let engine = test_engine();
        register_defaults(&engine);
        let backend = Arc::new(RecordingBackend::new("Console"));
        engine.register_backend(backend.clone());
        let chat = backend.chat("main");
        let alice = backend.user("alice");

        engine.received_message(&chat, "!alias lonely", &alice).await;
        engine.received_message(&chat, "!alias x nothing", &alice).await;
        assert_eq!(
            backend.sent_to(&chat),
            vec![
                "Usage: !alias [-s] <name> <command...>",
                "Could not create alias: no command exists with name \"nothing\".",
            ]
        );
    }
}
