//! Core handler infrastructure: the handler trait, its context, and the
//! command/alias registry.

pub mod context;
pub mod registry;
pub mod traits;

pub use context::Context;
pub use registry::{HelpEntry, HelpKey, Registry, Resolved};
pub use traits::{CommandHandler, FnHandler, HandlerResult, handler_fn};
