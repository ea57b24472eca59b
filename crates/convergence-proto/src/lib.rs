//! # convergence-proto
//!
//! Tokenizer and parser for the chat bot command grammar.
//!
//! A command is a chat message that starts with the chat's delimiter
//! (`!` by default), followed by an alphanumeric command name and any
//! number of whitespace-separated arguments:
//!
//! ```text
//! !name arg1 "quoted arg" escAped "mixed"arg
//! ```
//!
//! - Quotes are structural: they group whitespace into a single argument and
//!   decode to nothing.
//! - Escapes are decoded in place: regular (`\n \r \t \b \f \' \" \\`),
//!   octal (`\0` to `\377`), and unicode (`\uXXXX`). Anything else after a
//!   backslash is an invalid escape, and every invalid escape in a message is
//!   reported at once.
//!
//! ## Quick Start
//!
//! ```rust
//! use convergence_proto::parse_command;
//!
//! let parsed = parse_command("!echo \"Hi mailman!\" \\u0041", "!")
//!     .expect("valid command")
//!     .expect("is a command");
//! assert_eq!(parsed.name, "echo");
//! assert_eq!(parsed.args, vec!["Hi mailman!", "A"]);
//!
//! // Ordinary chat and escaped delimiters are not commands.
//! assert_eq!(parse_command("hello there", "!"), Ok(None));
//! assert_eq!(parse_command("!!not a command", "!"), Ok(None));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod lexer;
pub mod parse;
pub mod token;

pub use self::error::{ParseError, Result};
pub use self::lexer::tokenize;
pub use self::parse::{parse_command, strip_delimiter, ParsedCommand, DEFAULT_DELIMITER};
pub use self::token::{Token, TokenKind};
