//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use crate::error::validate_delimiter;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("bot.default_delimiter is unusable: {0}")]
    Delimiter(#[from] crate::error::DelimiterError),
    #[error("scheduler.tick_interval_ms must be positive")]
    ZeroTickInterval,
    #[error("state.path is required")]
    MissingStatePath,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = validate_delimiter(&config.bot.default_delimiter) {
        errors.push(e.into());
    }
    if config.scheduler.tick_interval_ms == 0 {
        errors.push(ValidationError::ZeroTickInterval);
    }
    if config.state.path.trim().is_empty() {
        errors.push(ValidationError::MissingStatePath);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = Config::default();
        config.bot.default_delimiter = "a b".to_string();
        config.scheduler.tick_interval_ms = 0;
        config.state.path = " ".to_string();
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ValidationError::Delimiter(_)));
    }
}
