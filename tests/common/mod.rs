//! Integration test common infrastructure.
//!
//! Provides a [`TestBot`]: an engine with the built-in commands and a
//! recording console backend, backed by an in-memory store.

pub mod bot;

#[allow(unused_imports)]
pub use bot::TestBot;
