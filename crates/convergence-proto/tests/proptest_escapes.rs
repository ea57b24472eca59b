//! Property-based tests for escape decoding.
//!
//! 1. Every well-formed escape decodes to exactly the character it encodes.
//! 2. Every malformed escape is reported, no matter how many appear.
//! 3. Unescaped text survives parsing unchanged.

use convergence_proto::{parse_command, tokenize, ParseError};
use proptest::prelude::*;

// =============================================================================
// STRATEGIES
// =============================================================================

/// Characters in the Basic Multilingual Plane, excluding surrogates.
fn bmp_char_strategy() -> impl Strategy<Value = char> {
    (0u32..=0xFFFF).prop_filter_map("surrogate", char::from_u32)
}

fn regular_escape_strategy() -> impl Strategy<Value = (&'static str, char)> {
    prop_oneof![
        Just(("\\n", '\n')),
        Just(("\\r", '\r')),
        Just(("\\t", '\t')),
        Just(("\\b", '\u{8}')),
        Just(("\\f", '\u{c}')),
        Just(("\\'", '\'')),
        Just(("\\\"", '"')),
        Just(("\\\\", '\\')),
    ]
}

/// Letters that never start a valid escape after a backslash.
fn invalid_escape_letter_strategy() -> impl Strategy<Value = char> {
    prop::sample::select(vec!['a', 'c', 'd', 'q', 'x', 'z', '8', '9', '!', '%'])
}

fn plain_word_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9.,!?%:]{1,12}").expect("valid regex")
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn unicode_escape_decodes(c in bmp_char_strategy()) {
        let message = format!("!echo \\u{:04x}", c as u32);
        let cmd = parse_command(&message, "!").unwrap().unwrap();
        prop_assert_eq!(cmd.args, vec![c.to_string()]);
    }

    #[test]
    fn octal_escape_decodes(value in 0u32..=0o377) {
        let message = format!("!echo \\{:o}", value);
        let cmd = parse_command(&message, "!").unwrap().unwrap();
        let expected = char::from_u32(value).unwrap().to_string();
        prop_assert_eq!(cmd.args, vec![expected]);
    }

    #[test]
    fn regular_escape_decodes((raw, decoded) in regular_escape_strategy()) {
        let message = format!("!echo x{}y", raw);
        let cmd = parse_command(&message, "!").unwrap().unwrap();
        prop_assert_eq!(cmd.args, vec![format!("x{}y", decoded)]);
    }

    #[test]
    fn every_invalid_escape_is_reported(
        letters in prop::collection::vec(invalid_escape_letter_strategy(), 1..6)
    ) {
        let body: Vec<String> = letters.iter().map(|c| format!("\\{}", c)).collect();
        let message = format!("!echo {}", body.join(" "));
        match parse_command(&message, "!") {
            Err(ParseError::InvalidEscapeSequence { sequences, command }) => {
                prop_assert_eq!(sequences, body);
                prop_assert_eq!(command, message);
            }
            other => prop_assert!(false, "unexpected result {:?}", other),
        }
    }

    #[test]
    fn plain_words_round_trip(words in prop::collection::vec(plain_word_strategy(), 0..8)) {
        let message = format!("!echo {}", words.join(" "));
        let cmd = parse_command(&message, "!").unwrap().unwrap();
        prop_assert_eq!(cmd.args, words);
    }

    #[test]
    fn tokenizer_never_panics(input in "\\PC{0,64}") {
        let _ = tokenize(&input);
    }
}
