//! Unified error handling for the engine.
//!
//! Parse errors come from `convergence_proto`; everything here wraps them
//! with the engine-level failures, user-facing replies, and metric labels.

use convergence_proto::ParseError;
use thiserror::Error;

// ============================================================================
// Dispatch Errors (parse -> resolve)
// ============================================================================

/// Errors raised before a handler runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no command exists with name \"{0}\"")]
    CommandNotFound(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl DispatchError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CommandNotFound(_) => "command_not_found",
            Self::Parse(e) if e.is_invalid_escape() => "invalid_escape",
            Self::Parse(_) => "parse_error",
        }
    }

    /// Text to send back to the chat.
    pub fn user_reply(&self) -> String {
        match self {
            Self::CommandNotFound(name) => format!("No command exists with name \"{}\".", name),
            Self::Parse(e) if e.is_invalid_escape() => format!(
                "Invalid escape sequence: {}. Are your backslashes correct?",
                e.offending_text()
            ),
            Self::Parse(e) => format!("Could not parse command: {}", e),
        }
    }
}

// ============================================================================
// Alias Errors
// ============================================================================

/// Errors raised while creating an alias.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AliasError {
    #[error("invalid alias name \"{0}\"; names must be alphanumeric")]
    InvalidName(String),

    #[error("\"{0}\" is not a command")]
    NotACommand(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("no command exists with name \"{0}\"")]
    CommandNotFound(String),

    #[error("an alias named \"{0}\" already exists here")]
    AlreadyExists(String),

    #[error("alias \"{0}\" would refer to itself")]
    Cycle(String),
}

impl From<DispatchError> for AliasError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::CommandNotFound(name) => Self::CommandNotFound(name),
            DispatchError::Parse(e) => Self::Parse(e),
        }
    }
}

// ============================================================================
// Delimiter Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelimiterError {
    #[error("the delimiter cannot be empty")]
    Empty,

    #[error("the delimiter cannot contain whitespace or quotes: \"{0}\"")]
    Invalid(String),
}

/// Check that `delimiter` can prefix a command.
pub fn validate_delimiter(delimiter: &str) -> Result<(), DelimiterError> {
    if delimiter.is_empty() {
        return Err(DelimiterError::Empty);
    }
    if delimiter.chars().any(|c| c.is_whitespace() || c == '"') {
        return Err(DelimiterError::Invalid(delimiter.to_string()));
    }
    Ok(())
}
