//! Message routing: forward to linked chats, then parse, resolve and run.
//!
//! Nothing that goes wrong in here reaches the backend. Parse and lookup
//! failures become replies, and handler errors and panics are caught per
//! invocation and reported back to the chat.

use super::Engine;
use crate::backend::{Format, Image};
use crate::chat::{Chat, User};
use crate::command::CommandData;
use crate::error::DispatchError;
use crate::handlers::Context;
use crate::metrics;
use crate::telemetry::{CommandTimer, spans};
use convergence_proto::parse_command;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{Instrument, debug, info, warn};

impl Engine {
    /// Entry point for backends: `sender` said `text` in `chat`.
    pub async fn received_message(self: &Arc<Self>, chat: &Chat, text: &str, sender: &User) {
        self.received_message_with_images(chat, text, sender, &[]).await
    }

    /// Like [`Engine::received_message`], for messages carrying images.
    pub async fn received_message_with_images(
        self: &Arc<Self>,
        chat: &Chat,
        text: &str,
        sender: &User,
        images: &[Image],
    ) {
        info!(chat = %chat, "[{}]: {}", self.user_name(chat, sender), text);

        if !self.is_bot(chat, sender) {
            self.forward(chat, sender, text, images).await;
        }

        match self.command_data(chat, text) {
            Ok(Some(data)) => self.run_command(chat, sender, data).await,
            Ok(None) => {}
            Err(e) => {
                debug!(chat = %chat, error = %e, "Dispatch failed");
                metrics::record_command_error("unknown", e.error_code());
                self.reply(chat, sender, &e.user_reply()).await;
            }
        }
    }

    /// Parse `text` with `chat`'s delimiter and resolve it from `chat`.
    ///
    /// `Ok(None)` means the text is not a command.
    pub fn command_data(&self, chat: &Chat, text: &str) -> Result<Option<CommandData>, DispatchError> {
        let delimiter = self.delimiter(chat);
        let Some(parsed) = parse_command(text, &delimiter)? else {
            return Ok(None);
        };
        let server = self.server_of(chat);
        let resolved = self.registry.read().resolve(&parsed.name, chat, server.as_ref())?;
        Ok(Some(resolved.into_command_data(parsed.args)))
    }

    /// Run a resolved command and reply with its output.
    pub async fn run_command(self: &Arc<Self>, chat: &Chat, sender: &User, data: CommandData) {
        let name = data.command.name().to_string();
        let span = spans::command(&name, chat, sender);
        let ctx = Context {
            engine: self,
            chat,
            sender,
            command: &data.command,
            args: &data.args,
        };

        let outcome = {
            let _timer = CommandTimer::new(&name);
            AssertUnwindSafe(data.command.handler().handle(&ctx))
                .catch_unwind()
                .instrument(span)
                .await
        };

        let reply = match outcome {
            Ok(Ok(Some(output))) => self.vars.substitute(self, chat, sender, &output),
            Ok(Ok(None)) => return,
            Ok(Err(e)) => {
                warn!(command = %name, chat = %chat, error = %e, "Command failed");
                metrics::record_command_error(&name, "handler_error");
                format!("Error while running command! Stack trace:\n{:?}", e)
            }
            Err(panic) => {
                let message = panic_message(&*panic);
                warn!(command = %name, chat = %chat, panic = %message, "Command panicked");
                metrics::record_command_error(&name, "handler_panic");
                format!("Error while running command! Stack trace:\n{}", message)
            }
        };
        self.reply(chat, sender, &reply).await;
    }

    /// Answer `sender` in `chat` and copy the answer to linked chats.
    ///
    /// Nothing is sent when `sender` is the bot itself, so the bot never
    /// answers its own output.
    pub async fn reply(&self, chat: &Chat, sender: &User, text: &str) {
        let Some(bot) = self.bot(chat) else {
            warn!(chat = %chat, "No backend to reply through");
            return;
        };
        if bot == *sender {
            return;
        }
        self.send_message(chat, text).await;
        self.forward(chat, &bot, text, &[]).await;
    }

    /// Send `text` to `chat` through its backend.
    pub async fn send_message(&self, chat: &Chat, text: &str) -> bool {
        let Some(backend) = self.backend(&chat.protocol) else {
            warn!(chat = %chat, "No backend for protocol");
            return false;
        };
        let sent = backend.send_message(chat, text).await;
        if !sent {
            warn!(chat = %chat, "Backend failed to send message");
        }
        sent
    }

    /// Copy a message to every chat linked to `from`, labelled with the
    /// sender's display name in bold where the target supports it.
    async fn forward(&self, from: &Chat, sender: &User, text: &str, images: &[Image]) {
        let targets = self.linked_chats(from);
        if targets.is_empty() {
            return;
        }
        let label = format!("{}:", self.display_name(from, sender));

        for target in targets {
            let Some(backend) = self.backend(&target.protocol) else {
                debug!(chat = %target, "Linked chat has no backend");
                continue;
            };
            let label = match backend.formatting() {
                Some(formatting) => formatting.apply(Format::Bold, &label),
                None => label.clone(),
            };
            if backend.send_message(&target, &format!("{} {}", label, text)).await {
                metrics::record_forwarded(target.protocol.name());
            }
            if !images.is_empty() {
                if let Some(image_backend) = backend.images() {
                    image_backend.send_images(&target, images).await;
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::handlers::handler_fn;
    use crate::testing::{RecordingBackend, test_engine};

    fn console() -> (Arc<Engine>, Arc<RecordingBackend>) {
        let engine = test_engine();
        let backend = Arc::new(RecordingBackend::new("Console"));
        engine.register_backend(backend.clone());
        engine.register_command(Command::new(
            "echo",
            handler_fn(|ctx| Ok((!ctx.args.is_empty()).then(|| ctx.joined(0)))),
        ));
        (engine, backend)
    }

    #[tokio::test]
    async fn test_echo_replies() {
        let (engine, backend) = console();
        let chat = backend.chat("main");
        engine.received_message(&chat, "!echo a b c", &backend.user("alice")).await;
        assert_eq!(backend.sent_to(&chat), vec!["a b c"]);
    }

    #[tokio::test]
    async fn test_plain_text_is_ignored() {
        let (engine, backend) = console();
        let chat = backend.chat("main");
        engine.received_message(&chat, "hello there", &backend.user("alice")).await;
        engine.received_message(&chat, "!!echo hi", &backend.user("alice")).await;
        assert!(backend.sent().is_empty());
    }

    #[tokio::test]
    async fn test_output_gets_variables() {
        let (engine, backend) = console();
        let chat = backend.chat("main");
        engine.received_message(&chat, "!echo hi %sender", &backend.user("alice")).await;
        assert_eq!(backend.sent_to(&chat), vec!["hi alice"]);
    }

    #[tokio::test]
    async fn test_bot_does_not_answer_itself() {
        let (engine, backend) = console();
        let chat = backend.chat("main");
        engine.received_message(&chat, "!echo loop", &backend.bot_user()).await;
        assert!(backend.sent().is_empty());
    }

    #[tokio::test]
    async fn test_panics_are_reported() {
        let (engine, backend) = console();
        engine.register_command(Command::new("boom", handler_fn(|_| panic!("kaboom"))));
        let chat = backend.chat("main");
        engine.received_message(&chat, "!boom", &backend.user("alice")).await;
        let sent = backend.sent_to(&chat);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("Error while running command!"));
        assert!(sent[0].contains("kaboom"));
    }

    #[test]
    fn test_command_data_is_deterministic() {
        let (engine, backend) = console();
        let chat = backend.chat("main");
        let first = engine.command_data(&chat, "!echo \"x y\" z").unwrap();
        let second = engine.command_data(&chat, "!echo \"x y\" z").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.map(|d| d.args), Some(vec!["x y".to_string(), "z".to_string()]));
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42), "handler panicked");
    }
}
