//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions and loading
//! - [`defaults`]: Serde default values
//! - [`validation`]: Startup checks

mod defaults;
mod types;
mod validation;

pub use types::{BotConfig, Config, ConfigError, SchedulerConfig, StateConfig};
pub use validation::{ValidationError, validate};
