//! Nom-based command lexer.
//!
//! Turns the text after the delimiter into a flat stream of [`Token`]s. The
//! lexer is context-free: quotes and whitespace are emitted as tokens and
//! grouped into arguments by [`crate::parse`].

use crate::error::{ParseError, Result};
use crate::token::{Token, TokenKind};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1, take_while_m_n},
    character::complete::{anychar, char, one_of},
    combinator::{opt, recognize},
    sequence::{pair, preceded},
    IResult,
};

/// Largest value an octal escape may encode.
const MAX_OCTAL_ESCAPE: u32 = 0o377;

fn is_hex(c: char) -> bool {
    c.is_ascii_hexdigit()
}

fn is_octal(c: char) -> bool {
    matches!(c, '0'..='7')
}

/// The prefix of `input` consumed to reach `rest`.
fn consumed<'a>(input: &'a str, rest: &str) -> &'a str {
    &input[..input.len() - rest.len()]
}

/// `\uXXXX` with exactly four hex digits.
fn unicode_escape(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, digits) = preceded(tag("\\u"), take_while_m_n(4, 4, is_hex))(input)?;
    let raw = consumed(input, rest);
    // Surrogate halves are not characters.
    let token = match u32::from_str_radix(digits, 16).ok().and_then(char::from_u32) {
        Some(c) => Token::decoded(TokenKind::UnicodeEscape, raw, c),
        None => Token::invalid(raw),
    };
    Ok((rest, token))
}

/// `\u` followed by fewer than four hex digits.
fn truncated_unicode_escape(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, raw) = recognize(pair(tag("\\u"), take_while_m_n(0, 3, is_hex)))(input)?;
    Ok((rest, Token::invalid(raw)))
}

/// `\` followed by up to three octal digits.
fn octal_escape(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, digits) = preceded(char('\\'), take_while_m_n(1, 3, is_octal))(input)?;
    let raw = consumed(input, rest);
    let token = match u32::from_str_radix(digits, 8)
        .ok()
        .filter(|value| *value <= MAX_OCTAL_ESCAPE)
        .and_then(char::from_u32)
    {
        Some(c) => Token::decoded(TokenKind::OctalEscape, raw, c),
        None => Token::invalid(raw),
    };
    Ok((rest, token))
}

fn regular_escape(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, c) = preceded(char('\\'), one_of("nrtbf'\"\\"))(input)?;
    let decoded = match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'b' => '\u{8}',
        'f' => '\u{c}',
        other => other,
    };
    Ok((
        rest,
        Token::decoded(TokenKind::RegularEscape, consumed(input, rest), decoded),
    ))
}

/// A backslash followed by anything else, or by nothing at all.
fn invalid_escape(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, raw) = recognize(pair(char('\\'), opt(anychar)))(input)?;
    Ok((rest, Token::invalid(raw)))
}

fn quote(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, _) = char('"')(input)?;
    Ok((rest, Token::quote(consumed(input, rest))))
}

fn whitespace(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, raw) = take_while1(char::is_whitespace)(input)?;
    Ok((rest, Token::verbatim(TokenKind::Whitespace, raw)))
}

fn text(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, raw) =
        take_while1(|c: char| !c.is_whitespace() && c != '"' && c != '\\')(input)?;
    Ok((rest, Token::verbatim(TokenKind::Text, raw)))
}

fn token(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        unicode_escape,
        truncated_unicode_escape,
        octal_escape,
        regular_escape,
        invalid_escape,
        quote,
        whitespace,
        text,
    ))(input)
}

/// Tokenize command text (the part after the delimiter).
///
/// Fails with [`ParseError::InvalidEscapeSequence`] naming every malformed
/// escape if there is at least one.
///
/// # Example
///
/// ```
/// use convergence_proto::{tokenize, TokenKind};
///
/// let tokens = tokenize("say \"hi\\n\"").unwrap();
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![
///         TokenKind::Text,
///         TokenKind::Whitespace,
///         TokenKind::Quote,
///         TokenKind::Text,
///         TokenKind::RegularEscape,
///         TokenKind::Quote,
///     ]
/// );
/// assert_eq!(tokens[4].text(), "\n");
/// ```
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        match token(rest) {
            Ok((next, tok)) => {
                tokens.push(tok);
                rest = next;
            }
            Err(_) => {
                return Err(ParseError::Lex {
                    input: input.to_string(),
                    position: input.len() - rest.len(),
                })
            }
        }
    }

    let invalid: Vec<String> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::InvalidEscape)
        .map(|t| t.raw.to_string())
        .collect();
    if !invalid.is_empty() {
        return Err(ParseError::InvalidEscapeSequence {
            command: input.to_string(),
            sequences: invalid,
        });
    }

    Ok(tokens)
}
