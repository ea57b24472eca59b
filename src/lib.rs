//! Convergence - multi-platform chat bot command engine.
//!
//! Chat backends (console, Discord, bridges) hand incoming messages to an
//! [`Engine`], which forwards them to linked chats, parses commands with
//! [`convergence_proto`], resolves aliases and scoped commands, runs the
//! matching handler, and drives a scheduler for deferred commands.
//!
//! ## Resolution order
//!
//! A command name typed in a chat is looked up in, from most to least
//! specific: aliases on the chat, aliases on the chat's server (for
//! protocols with servers), commands on the chat's protocol, and universal
//! commands.

pub mod backend;
pub mod chat;
pub mod command;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod scheduler;
pub mod store;
pub mod telemetry;
pub mod testing;
pub mod vars;

pub use backend::Backend;
pub use chat::{AliasScope, Chat, Protocol, Server, User};
pub use command::{Alias, Command, CommandData};
pub use config::Config;
pub use engine::Engine;
pub use error::{AliasError, DispatchError};
pub use handlers::{CommandHandler, Context, HandlerResult};
