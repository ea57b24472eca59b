//! Command handler trait.

use super::context::Context;
use async_trait::async_trait;

/// Result type for command handlers.
///
/// `Ok(Some(text))` is sent back to the chat after alias-variable
/// substitution; `Ok(None)` sends nothing. `Err` is reported to the chat
/// with its full error chain.
pub type HandlerResult = anyhow::Result<Option<String>>;

/// Trait implemented by all command handlers.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult;
}

/// Adapter turning a synchronous closure into a [`CommandHandler`].
pub struct FnHandler<F>(F);

/// Wrap a closure as a handler.
///
/// ```ignore
/// engine.register_command(Command::new("hello", handler_fn(|ctx| {
///     Ok(Some(format!("Hello, {}!", ctx.sender.name)))
/// })));
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Context<'_>) -> HandlerResult + Send + Sync,
{
    FnHandler(f)
}

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&Context<'_>) -> HandlerResult + Send + Sync,
{
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        (self.0)(ctx)
    }
}
