//! Alias variables: `%name` placeholders in command output.
//!
//! Before a handler's reply is sent, every `%name` whose name matches a
//! registered variable is replaced with that variable's value for the
//! current chat and sender. When several variable names share a prefix the
//! longest one that matches wins (`%sendername` beats `%sender`).
//! Replacement text is never scanned again, and variables that resolve to
//! nothing are left as typed.

use crate::chat::{Chat, User};
use crate::engine::Engine;
use parking_lot::RwLock;
use std::sync::Arc;

/// Marker that starts a variable.
pub const VAR_PREFIX: char = '%';

/// Computes a variable's value.
pub type VarResolver = Arc<dyn Fn(&Engine, &Chat, &User) -> Option<String> + Send + Sync>;

#[derive(Clone)]
struct AliasVar {
    name: Vec<char>,
    resolver: VarResolver,
}

/// The set of registered variables.
#[derive(Default)]
pub struct AliasVars {
    vars: RwLock<Vec<AliasVar>>,
}

impl AliasVars {
    /// No variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// `%sender`, `%nick`, `%botname` and `%chatname`.
    pub fn with_defaults() -> Self {
        let vars = Self::new();
        vars.register("sender", |engine, chat, sender| {
            Some(engine.user_name(chat, sender))
        });
        vars.register("nick", |engine, chat, sender| {
            Some(engine.display_name(chat, sender))
        });
        vars.register("botname", |engine, chat, _| {
            let bot = engine.bot(chat)?;
            Some(engine.display_name(chat, &bot))
        });
        vars.register("chatname", |engine, chat, _| Some(engine.chat_name(chat)));
        vars
    }

    /// Register a variable (name without the `%`). Returns false if the
    /// name is empty or already taken.
    pub fn register<F>(&self, name: &str, resolver: F) -> bool
    where
        F: Fn(&Engine, &Chat, &User) -> Option<String> + Send + Sync + 'static,
    {
        let name: Vec<char> = name.chars().collect();
        let mut vars = self.vars.write();
        if name.is_empty() || vars.iter().any(|v| v.name == name) {
            return false;
        }
        vars.push(AliasVar {
            name,
            resolver: Arc::new(resolver),
        });
        true
    }

    /// Registered names, without the `%`.
    pub fn names(&self) -> Vec<String> {
        self.vars
            .read()
            .iter()
            .map(|v| v.name.iter().collect())
            .collect()
    }

    /// Replace variables in `text`.
    pub fn substitute(&self, engine: &Engine, chat: &Chat, sender: &User, text: &str) -> String {
        if !text.contains(VAR_PREFIX) {
            return text.to_string();
        }
        // Resolvers run without the lock held.
        let vars = self.vars.read().clone();
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;

        while i < chars.len() {
            if chars[i] != VAR_PREFIX {
                out.push(chars[i]);
                i += 1;
                continue;
            }
            let replacement = longest_match(&vars, &chars[i + 1..]).and_then(|(var, len)| {
                (var.resolver)(engine, chat, sender).map(|value| (value, len))
            });
            match replacement {
                Some((value, len)) => {
                    out.push_str(&value);
                    i += 1 + len;
                }
                None => {
                    out.push(VAR_PREFIX);
                    i += 1;
                }
            }
        }
        out
    }
}

/// The longest variable name that prefixes `rest`, with its length.
///
/// Keeps one "still a candidate" flag per variable and narrows them one
/// character at a time.
fn longest_match<'v>(vars: &'v [AliasVar], rest: &[char]) -> Option<(&'v AliasVar, usize)> {
    let mut candidates = vec![true; vars.len()];
    let mut best = None;

    for (offset, c) in rest.iter().enumerate() {
        let mut any = false;
        for (var, candidate) in vars.iter().zip(candidates.iter_mut()) {
            if !*candidate {
                continue;
            }
            if var.name.get(offset) != Some(c) {
                *candidate = false;
                continue;
            }
            if var.name.len() == offset + 1 {
                best = Some((var, offset + 1));
                *candidate = false;
            } else {
                any = true;
            }
        }
        if !any {
            break;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_engine;
    use crate::chat::Protocol;

    fn fixtures() -> (Arc<Engine>, Chat, User) {
        let engine = test_engine();
        let console = Protocol::new("Console");
        (
            engine,
            Chat::new(console.clone(), "main"),
            User::new(console, "alice"),
        )
    }

    fn vars(pairs: &[(&str, &'static str)]) -> AliasVars {
        let vars = AliasVars::new();
        for (name, value) in pairs {
            let value = *value;
            vars.register(name, move |_, _, _| Some(value.to_string()));
        }
        vars
    }

    #[test]
    fn test_longest_name_wins() {
        let (engine, chat, user) = fixtures();
        let vars = vars(&[("sender", "S"), ("sendername", "SN")]);
        assert_eq!(vars.substitute(&engine, &chat, &user, "%sendername"), "SN");
        assert_eq!(vars.substitute(&engine, &chat, &user, "%sender"), "S");
        assert_eq!(vars.substitute(&engine, &chat, &user, "%senderx"), "Sx");
        assert_eq!(vars.substitute(&engine, &chat, &user, "%sendernam"), "Snam");
    }

    #[test]
    fn test_registration_order_does_not_matter() {
        let (engine, chat, user) = fixtures();
        let vars = vars(&[("sendername", "SN"), ("sender", "S")]);
        assert_eq!(vars.substitute(&engine, &chat, &user, "%sendername %sender"), "SN S");
    }

    #[test]
    fn test_replacements_are_not_rescanned() {
        let (engine, chat, user) = fixtures();
        let vars = vars(&[("a", "%b"), ("b", "B")]);
        assert_eq!(vars.substitute(&engine, &chat, &user, "%a %b"), "%b B");
    }

    #[test]
    fn test_unknown_and_bare_markers_stay() {
        let (engine, chat, user) = fixtures();
        let vars = vars(&[("sender", "S")]);
        assert_eq!(vars.substitute(&engine, &chat, &user, "100% %unknown %"), "100% %unknown %");
        assert_eq!(vars.substitute(&engine, &chat, &user, "%%sender"), "%S");
    }

    #[test]
    fn test_unresolved_variable_is_verbatim() {
        let (engine, chat, user) = fixtures();
        let vars = AliasVars::new();
        vars.register("botname", |_, _, _| None);
        assert_eq!(vars.substitute(&engine, &chat, &user, "I am %botname"), "I am %botname");
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let vars = AliasVars::with_defaults();
        assert!(!vars.register("sender", |_, _, _| None));
        assert!(!vars.register("", |_, _, _| None));
        assert_eq!(vars.names(), vec!["sender", "nick", "botname", "chatname"]);
    }

    #[test]
    fn test_defaults_use_backend_names() {
        let (engine, chat, user) = fixtures();
        let vars = AliasVars::with_defaults();
        assert_eq!(
            vars.substitute(&engine, &chat, &user, "%sender in %chatname"),
            "alice in main"
        );
    }
}
