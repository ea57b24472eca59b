//! Token types produced by the lexer.

use std::borrow::Cow;

/// The lexical class of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A run of characters that are not whitespace, quotes, or backslashes.
    Text,
    /// A run of whitespace.
    Whitespace,
    /// A structural `"`.
    Quote,
    /// `\n \r \t \b \f \' \" \\`.
    RegularEscape,
    /// `\` followed by 1-3 octal digits, at most `\377`.
    OctalEscape,
    /// `\u` followed by exactly 4 hex digits.
    UnicodeEscape,
    /// Anything else following a backslash.
    InvalidEscape,
}

/// A single lexical token.
///
/// `raw` borrows the source text; `value` is what the token contributes to
/// an argument once decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// Lexical class.
    pub kind: TokenKind,
    /// Source text exactly as written.
    pub raw: &'a str,
    /// Decoded text.
    pub value: Cow<'a, str>,
}

impl<'a> Token<'a> {
    /// A token whose decoded value is its source text.
    pub fn verbatim(kind: TokenKind, raw: &'a str) -> Self {
        Self {
            kind,
            raw,
            value: Cow::Borrowed(raw),
        }
    }

    /// An escape token decoding to a single character.
    pub fn decoded(kind: TokenKind, raw: &'a str, value: char) -> Self {
        Self {
            kind,
            raw,
            value: Cow::Owned(value.to_string()),
        }
    }

    /// A structural quote; decodes to nothing.
    pub fn quote(raw: &'a str) -> Self {
        Self {
            kind: TokenKind::Quote,
            raw,
            value: Cow::Borrowed(""),
        }
    }

    /// A malformed escape.
    pub fn invalid(raw: &'a str) -> Self {
        Self::verbatim(TokenKind::InvalidEscape, raw)
    }

    /// Returns true for any escape token, valid or not.
    pub fn is_escape(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::RegularEscape
                | TokenKind::OctalEscape
                | TokenKind::UnicodeEscape
                | TokenKind::InvalidEscape
        )
    }

    /// The decoded text of this token.
    pub fn text(&self) -> &str {
        &self.value
    }
}
