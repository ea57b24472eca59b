//! Command parsing: delimiter handling and argument grouping.

use crate::error::{ParseError, Result};
use crate::lexer::tokenize;
use crate::token::{Token, TokenKind};

/// Delimiter used by chats that have not configured their own.
pub const DEFAULT_DELIMITER: &str = "!";

/// A parsed command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedCommand {
    /// Lowercased command name.
    pub name: String,
    /// Decoded arguments, in order.
    pub args: Vec<String>,
}

/// Return the command text after `delimiter`, or `None` if `message` is not
/// a command.
///
/// A doubled delimiter (`!!text`) marks literal text and is not a command.
///
/// ```
/// use convergence_proto::strip_delimiter;
///
/// assert_eq!(strip_delimiter("!ping", "!"), Some("ping"));
/// assert_eq!(strip_delimiter("ping", "!"), None);
/// assert_eq!(strip_delimiter("!", "!"), None);
/// assert_eq!(strip_delimiter("!!ping", "!"), None);
/// ```
pub fn strip_delimiter<'a>(message: &'a str, delimiter: &str) -> Option<&'a str> {
    if delimiter.is_empty() {
        return None;
    }
    let body = message.strip_prefix(delimiter)?;
    if body.is_empty() || body.starts_with(delimiter) {
        return None;
    }
    Some(body)
}

/// Parse a chat message into a command.
///
/// Returns `Ok(None)` for ordinary chat, `Ok(Some(_))` for a well-formed
/// command, and an error for a delimited message that doesn't follow the
/// grammar.
pub fn parse_command(message: &str, delimiter: &str) -> Result<Option<ParsedCommand>> {
    let Some(body) = strip_delimiter(message, delimiter) else {
        return Ok(None);
    };

    let tokens = tokenize(body).map_err(|e| e.with_command(message))?;
    let mut groups = group_arguments(message, body, &tokens)?.into_iter();

    let Some(head) = groups.next() else {
        return Err(ParseError::MissingCommandName {
            input: message.to_string(),
        });
    };
    if !head.plain || !head.value.chars().all(char::is_alphanumeric) {
        return Err(ParseError::InvalidCommandName {
            name: body[head.start..head.end].to_string(),
        });
    }

    Ok(Some(ParsedCommand {
        name: head.value.to_lowercase(),
        args: groups.map(|g| g.value).collect(),
    }))
}

/// One whitespace-separated argument.
struct Group {
    value: String,
    /// Byte range of the group in the command body.
    start: usize,
    end: usize,
    /// Only plain text, no quotes or escapes.
    plain: bool,
}

impl Group {
    fn new(start: usize) -> Self {
        Self {
            value: String::new(),
            start,
            end: start,
            plain: true,
        }
    }
}

fn group_arguments(message: &str, body: &str, tokens: &[Token<'_>]) -> Result<Vec<Group>> {
    let mut groups = Vec::new();
    let mut current: Option<Group> = None;
    let mut quote_start: Option<usize> = None;
    let mut pos = 0;

    for token in tokens {
        let start = pos;
        pos += token.raw.len();

        if token.kind == TokenKind::Whitespace && quote_start.is_none() {
            match current.take() {
                Some(group) => groups.push(group),
                None if groups.is_empty() => {
                    return Err(ParseError::MissingCommandName {
                        input: message.to_string(),
                    })
                }
                None => {}
            }
            continue;
        }

        let group = current.get_or_insert_with(|| Group::new(start));
        group.end = pos;
        match token.kind {
            TokenKind::Quote => {
                group.plain = false;
                quote_start = match quote_start {
                    Some(_) => None,
                    None => Some(start),
                };
            }
            TokenKind::Text | TokenKind::Whitespace => group.value.push_str(token.text()),
            _ => {
                group.plain = false;
                group.value.push_str(token.text());
            }
        }
    }

    if let Some(start) = quote_start {
        return Err(ParseError::UnterminatedQuote {
            fragment: body[start..].to_string(),
        });
    }
    groups.extend(current);
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(message: &str) -> ParsedCommand {
        parse_command(message, DEFAULT_DELIMITER)
            .expect("parse")
            .expect("command")
    }

    #[test]
    fn test_name_is_lowercased() {
        assert_eq!(parse("!PiNg").name, "ping");
    }

    #[test]
    fn test_mixed_quoted_and_plain_segments_join() {
        let cmd = parse("!echo ab\"c d\"e");
        assert_eq!(cmd.args, vec!["abc de"]);
    }

    #[test]
    fn test_empty_quotes_are_an_argument() {
        let cmd = parse("!echo \"\" x");
        assert_eq!(cmd.args, vec!["", "x"]);
    }

    #[test]
    fn test_escaped_whitespace_does_not_split() {
        let cmd = parse("!echo a\\tb");
        assert_eq!(cmd.args, vec!["a\tb"]);
    }

    #[test]
    fn test_leading_whitespace_is_missing_name() {
        assert!(matches!(
            parse_command("! echo", "!"),
            Err(ParseError::MissingCommandName { .. })
        ));
    }

    #[test]
    fn test_quoted_name_is_rejected() {
        assert_eq!(
            parse_command("!\"echo\" hi", "!"),
            Err(ParseError::InvalidCommandName {
                name: "\"echo\"".to_string()
            })
        );
    }

    #[test]
    fn test_unterminated_quote_reports_fragment() {
        assert_eq!(
            parse_command("!echo a \"b c", "!"),
            Err(ParseError::UnterminatedQuote {
                fragment: "\"b c".to_string()
            })
        );
    }

    #[test]
    fn test_escape_error_carries_full_message() {
        match parse_command("!echo \\q", "!") {
            Err(ParseError::InvalidEscapeSequence { command, sequences }) => {
                assert_eq!(command, "!echo \\q");
                assert_eq!(sequences, vec!["\\q"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_multi_character_delimiter() {
        let cmd = parse_command("bot:ping now", "bot:").unwrap().unwrap();
        assert_eq!(cmd.name, "ping");
        assert_eq!(cmd.args, vec!["now"]);
        assert_eq!(parse_command("bot:bot:ping", "bot:"), Ok(None));
    }

    #[test]
    fn test_empty_delimiter_never_matches() {
        assert_eq!(parse_command("ping", ""), Ok(None));
    }
}
