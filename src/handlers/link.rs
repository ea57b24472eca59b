//! Chat handlers: LINK, UNLINK, LINKS, SETDELIMITER

use super::{CommandHandler, Context, HandlerResult};
use crate::chat::Chat;
use async_trait::async_trait;

/// Look up the chat named by the first argument, as listed by `chats`.
fn target_chat(ctx: &Context<'_>) -> Result<Chat, String> {
    let Some(id) = ctx.arg(0).and_then(|arg| arg.parse::<u32>().ok()) else {
        return Err(ctx.usage());
    };
    if let Some(chat) = ctx.engine.chat_by_id(id) {
        return Ok(chat);
    }
    ctx.engine.refresh_chats();
    ctx.engine
        .chat_by_id(id)
        .ok_or_else(|| format!("No chat has id {}. Use {}chats to list them.", id, ctx.delimiter()))
}

/// Handler for the LINK command.
///
/// `link <chat id>`
///
/// Messages in either chat are copied to the other from then on.
pub struct LinkHandler;

#[async_trait]
impl CommandHandler for LinkHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let target = match target_chat(ctx) {
            Ok(chat) => chat,
            Err(reply) => return Ok(Some(reply)),
        };
        let name = ctx.engine.chat_name(&target);
        let reply = if target == *ctx.chat {
            "A chat cannot be linked with itself.".to_string()
        } else if ctx.engine.link(ctx.chat, &target) {
            format!("Linked with {}.", name)
        } else {
            format!("Already linked with {}.", name)
        };
        Ok(Some(reply))
    }
}

/// Handler for the UNLINK command.
///
/// `unlink <chat id>`
pub struct UnlinkHandler;

#[async_trait]
impl CommandHandler for UnlinkHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let target = match target_chat(ctx) {
            Ok(chat) => chat,
            Err(reply) => return Ok(Some(reply)),
        };
        let name = ctx.engine.chat_name(&target);
        let reply = if ctx.engine.unlink(ctx.chat, &target) {
            format!("Unlinked from {}.", name)
        } else {
            format!("Not linked with {}.", name)
        };
        Ok(Some(reply))
    }
}

/// Handler for the LINKS command.
pub struct LinksHandler;

#[async_trait]
impl CommandHandler for LinksHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let linked = ctx.engine.linked_chats(ctx.chat);
        if linked.is_empty() {
            return Ok(Some("This chat is not linked to any others.".to_string()));
        }
        let names: Vec<String> = linked
            .iter()
            .map(|chat| {
                format!(
                    "{}: {} [{}]",
                    ctx.engine.chat_id(chat),
                    ctx.engine.chat_name(chat),
                    chat.protocol
                )
            })
            .collect();
        Ok(Some(format!("Linked chats:\n{}", names.join("\n"))))
    }
}

/// Handler for the SETDELIMITER command.
///
/// `setdelimiter <delimiter>`
pub struct SetDelimiterHandler;

#[async_trait]
impl CommandHandler for SetDelimiterHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let Some(delimiter) = ctx.arg(0) else {
            return Ok(Some(ctx.usage()));
        };
        let reply = match ctx.engine.set_delimiter(ctx.chat, delimiter) {
            Ok(()) => format!("Commands in this chat now start with \"{}\".", delimiter),
            Err(e) => format!("Could not change the delimiter: {}.", e),
        };
        Ok(Some(reply))
    }
}
