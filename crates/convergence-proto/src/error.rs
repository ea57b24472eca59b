//! Error types for the command grammar.

use thiserror::Error;

/// Convenience type alias for Results using [`ParseError`].
pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Errors raised while tokenizing or parsing a command.
///
/// "Not a command" is not an error: [`crate::parse_command`] returns
/// `Ok(None)` for messages that don't follow the delimiter conventions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// One or more malformed escape sequences.
    ///
    /// Every offending sequence in the input is listed, in order of
    /// appearance.
    #[error(
        "command \"{command}\" contains the following invalid escape sequences: {}",
        quote_list(.sequences)
    )]
    InvalidEscapeSequence {
        /// The command text that failed to tokenize.
        command: String,
        /// Raw text of every invalid escape (e.g. `\q`, `\u12`, `\400`).
        sequences: Vec<String>,
    },

    /// The delimiter is followed by whitespace instead of a command name.
    #[error("missing command name in \"{input}\"")]
    MissingCommandName {
        /// The full message.
        input: String,
    },

    /// The command name contains quotes, escapes, or non-alphanumeric text.
    #[error("invalid command name \"{name}\"")]
    InvalidCommandName {
        /// Raw text of the rejected name.
        name: String,
    },

    /// A quote was opened and never closed.
    #[error("unterminated quote: \"{fragment}\"")]
    UnterminatedQuote {
        /// Raw text from the opening quote to the end of the input.
        fragment: String,
    },

    /// The lexer could not make progress.
    #[error("unexpected input at byte {position} of \"{input}\"")]
    Lex {
        /// The input being tokenized.
        input: String,
        /// Byte offset where lexing stopped.
        position: usize,
    },
}

impl ParseError {
    /// Returns true for malformed escape sequences.
    pub fn is_invalid_escape(&self) -> bool {
        matches!(self, Self::InvalidEscapeSequence { .. })
    }

    /// The text the error is about, suitable for echoing back to a user.
    pub fn offending_text(&self) -> String {
        match self {
            Self::InvalidEscapeSequence { sequences, .. } => sequences.join(", "),
            Self::MissingCommandName { input } => input.clone(),
            Self::InvalidCommandName { name } => name.clone(),
            Self::UnterminatedQuote { fragment } => fragment.clone(),
            Self::Lex { input, position } => input.get(*position..).unwrap_or_default().to_string(),
        }
    }

    /// Replace the command text carried by an escape error.
    ///
    /// The lexer only sees the text after the delimiter; callers that know
    /// the full message use this to report it verbatim.
    pub(crate) fn with_command(self, full: &str) -> Self {
        match self {
            Self::InvalidEscapeSequence { sequences, .. } => Self::InvalidEscapeSequence {
                command: full.to_string(),
                sequences,
            },
            other => other,
        }
    }
}

fn quote_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("\"{}\"", s))
        .collect::<Vec<_>>()
        .join(", ")
}
