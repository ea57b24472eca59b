//! Per-chat state: delimiters, links and named timers, plus saving and
//! loading all persisted state through the engine's [`Store`].
//!
//! [`Store`]: crate::store::Store

use super::{DashMapExt, Engine};
use crate::chat::Chat;
use crate::command::Alias;
use crate::error::{DelimiterError, validate_delimiter};
use crate::store::{AliasRecord, DelimiterRecord, LinkRecord, Snapshot, StoreError, TimerRecord};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl Engine {
    // ========================================================================
    // Delimiters
    // ========================================================================

    /// Delimiter in effect for `chat`.
    pub fn delimiter(&self, chat: &Chat) -> String {
        self.delimiters
            .get_cloned(chat)
            .unwrap_or_else(|| self.config.bot.default_delimiter.clone())
    }

    pub fn set_delimiter(&self, chat: &Chat, delimiter: &str) -> Result<(), DelimiterError> {
        validate_delimiter(delimiter)?;
        if delimiter == self.config.bot.default_delimiter {
            self.delimiters.remove(chat);
        } else {
            self.delimiters.insert(chat.clone(), delimiter.to_string());
        }
        info!(chat = %chat, delimiter = %delimiter, "Delimiter changed");
        self.persist();
        Ok(())
    }

    // ========================================================================
    // Linked chats
    // ========================================================================

    /// Link two chats both ways. Returns false if they are the same chat or
    /// already linked.
    pub fn link(&self, a: &Chat, b: &Chat) -> bool {
        if a == b {
            return false;
        }
        let added = self.linked_chats.entry(a.clone()).or_default().insert(b.clone());
        self.linked_chats.entry(b.clone()).or_default().insert(a.clone());
        if added {
            info!(chat = %a, linked = %b, "Chats linked");
            self.persist();
        }
        added
    }

    /// Remove a link in both directions. Returns whether one existed.
    pub fn unlink(&self, a: &Chat, b: &Chat) -> bool {
        let removed = self.unlink_one_way(a, b);
        self.unlink_one_way(b, a);
        if removed {
            info!(chat = %a, linked = %b, "Chats unlinked");
            self.persist();
        }
        removed
    }

    fn unlink_one_way(&self, from: &Chat, to: &Chat) -> bool {
        let Some(mut linked) = self.linked_chats.get_mut(from) else {
            return false;
        };
        let removed = linked.remove(to);
        let empty = linked.is_empty();
        drop(linked);
        if empty {
            self.linked_chats.remove(from);
        }
        removed
    }

    /// Chats that receive copies of `chat`'s messages, sorted.
    pub fn linked_chats(&self, chat: &Chat) -> Vec<Chat> {
        self.linked_chats
            .get_cloned(chat)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Start the timer `name`. Returns false if it is already running.
    pub fn start_timer(&self, name: &str, now: DateTime<Utc>) -> bool {
        if self.timers.contains_key(name) {
            return false;
        }
        self.timers.insert(name.to_string(), now);
        self.persist();
        true
    }

    /// Time since `name` was started.
    pub fn check_timer(&self, name: &str, now: DateTime<Utc>) -> Option<Duration> {
        self.timers.get_cloned(name).map(|started| now - started)
    }

    /// Stop `name`, returning how long it ran.
    pub fn stop_timer(&self, name: &str, now: DateTime<Utc>) -> Option<Duration> {
        let (_, started) = self.timers.remove(name)?;
        self.persist();
        Some(now - started)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Everything that survives a restart.
    pub fn snapshot(&self) -> Snapshot {
        let delimiters = self
            .delimiters
            .sorted_entries()
            .into_iter()
            .map(|(chat, delimiter)| DelimiterRecord { chat, delimiter })
            .collect();
        let aliases = self
            .registry
            .read()
            .all_aliases()
            .iter()
            .map(|alias| AliasRecord {
                scope: alias.scope.clone(),
                name: alias.name.clone(),
                protocol: alias.command.protocol().clone(),
                command: alias.command.name().to_string(),
                args: alias.args.clone(),
            })
            .collect();
        let scheduled = self.scheduler.lock().commands(None);
        let links = self
            .linked_chats
            .sorted_entries()
            .into_iter()
            .map(|(chat, linked)| LinkRecord {
                chat,
                linked: linked.into_iter().collect(),
            })
            .collect();
        let timers = self
            .timers
            .sorted_entries()
            .into_iter()
            .map(|(name, started)| TimerRecord { name, started })
            .collect();

        Snapshot {
            delimiters,
            aliases,
            scheduled,
            links,
            timers,
        }
    }

    /// Save a snapshot. Failures are logged and otherwise ignored.
    ///
    /// Concurrent callers are serialized, so an older snapshot never
    /// overwrites a newer one. Must not be called with `registry` or
    /// `scheduler` locked.
    pub fn persist(&self) {
        let _guard = self.persist_lock.lock();
        let snapshot = self.snapshot();
        if let Err(e) = self.store.save(&snapshot) {
            warn!(error = %e, "Failed to persist bot state");
        }
    }

    /// Load persisted state. Call after every command is registered, since
    /// aliases are rebound to commands by name.
    pub fn restore(&self) -> Result<(), StoreError> {
        let snapshot = self.store.load()?;

        for record in snapshot.delimiters {
            if let Err(e) = validate_delimiter(&record.delimiter) {
                warn!(chat = %record.chat, error = %e, "Skipping unusable stored delimiter");
                continue;
            }
            self.delimiters.insert(record.chat, record.delimiter);
        }

        let mut alias_count = 0;
        {
            let mut registry = self.registry.write();
            for record in snapshot.aliases {
                let Some(command) = registry.command(&record.protocol, &record.command) else {
                    warn!(
                        alias = %record.name,
                        scope = %record.scope,
                        command = %record.command,
                        "Skipping alias whose command is no longer registered"
                    );
                    continue;
                };
                let alias = Alias {
                    scope: record.scope,
                    name: record.name,
                    command,
                    args: record.args,
                };
                if registry.register_alias(Arc::new(alias)) {
                    alias_count += 1;
                }
            }
        }

        let mut scheduled_count = 0;
        {
            let mut scheduler = self.scheduler.lock();
            for entry in snapshot.scheduled {
                let id = entry.id;
                if scheduler.restore(entry) {
                    scheduled_count += 1;
                } else {
                    debug!(id, "Scheduled command already present");
                }
            }
        }

        for record in snapshot.links {
            for linked in record.linked {
                if linked != record.chat {
                    self.linked_chats.entry(record.chat.clone()).or_default().insert(linked.clone());
                    self.linked_chats.entry(linked).or_default().insert(record.chat.clone());
                }
            }
        }

        for record in snapshot.timers {
            self.timers.insert(record.name, record.started);
        }

        info!(
            aliases = alias_count,
            scheduled = scheduled_count,
            links = self.linked_chats.len(),
            timers = self.timers.len(),
            "Bot state restored"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::chat::{AliasScope, Chat, Protocol, User};
    use crate::command::Command;
    use crate::config::Config;
    use crate::engine::Engine;
    use crate::error::DelimiterError;
    use crate::handlers::handler_fn;
    use crate::store::{AliasRecord, MemoryStore, Snapshot, Store};
    use crate::testing::test_engine;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn chat(name: &str) -> Chat {
        Chat::new(Protocol::new("Console"), name)
    }

    #[test]
    fn test_delimiter_defaults_and_overrides() {
        let engine = test_engine();
        let main = chat("main");
        assert_eq!(engine.delimiter(&main), "!");

        engine.set_delimiter(&main, "?").unwrap();
        assert_eq!(engine.delimiter(&main), "?");
        assert_eq!(engine.delimiter(&chat("other")), "!");

        assert_eq!(engine.set_delimiter(&main, ""), Err(DelimiterError::Empty));
        assert!(engine.set_delimiter(&main, "a b").is_err());
        assert_eq!(engine.delimiter(&main), "?");

        engine.set_delimiter(&main, "!").unwrap();
        assert!(engine.snapshot().delimiters.is_empty());
    }

    #[test]
    fn test_links_are_symmetric() {
        let engine = test_engine();
        let (a, b, c) = (chat("a"), chat("b"), chat("c"));

        assert!(!engine.link(&a, &a));
        assert!(engine.link(&a, &b));
        assert!(!engine.link(&b, &a));
        assert!(engine.link(&a, &c));
        assert_eq!(engine.linked_chats(&a), vec![b.clone(), c.clone()]);
        assert_eq!(engine.linked_chats(&b), vec![a.clone()]);

        assert!(engine.unlink(&b, &a));
        assert!(!engine.unlink(&a, &b));
        assert_eq!(engine.linked_chats(&a), vec![c.clone()]);
        assert!(engine.linked_chats(&b).is_empty());
    }

    #[test]
    fn test_timers() {
        let engine = test_engine();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        assert!(engine.start_timer("tea", t0));
        assert!(!engine.start_timer("tea", t0 + Duration::seconds(5)));
        assert_eq!(engine.check_timer("tea", t0 + Duration::seconds(90)), Some(Duration::seconds(90)));
        assert_eq!(engine.stop_timer("tea", t0 + Duration::seconds(120)), Some(Duration::seconds(120)));
        assert_eq!(engine.check_timer("tea", t0), None);
        assert_eq!(engine.stop_timer("tea", t0), None);
    }

    #[test]
    fn test_restore_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let (a, b) = (chat("a"), chat("b"));
        let user = User::new(Protocol::new("Console"), "alice");

        let first = Engine::new(Config::default(), store.clone());
        first.register_command(Command::new("echo", handler_fn(|_| Ok(None))));
        first.set_delimiter(&a, "?").unwrap();
        first.link(&a, &b);
        first.start_timer("tea", t0);
        first.create_alias(AliasScope::Chat(a.clone()), "hi", "echo hello", &a).unwrap();
        first.schedule(&a, &user, "echo", vec!["later".into()], t0);
        let saved = store.snapshot();

        let second = Engine::new(Config::default(), store.clone());
        second.register_command(Command::new("echo", handler_fn(|_| Ok(None))));
        second.restore().unwrap();

        assert_eq!(second.snapshot(), saved);
        assert_eq!(second.delimiter(&a), "?");
        assert_eq!(second.linked_chats(&b), vec![a.clone()]);
        assert!(second.registry().alias(&AliasScope::Chat(a), "hi").is_some());
        assert_eq!(second.scheduled_commands(None).len(), 1);
    }

    #[test]
    fn test_restore_skips_orphan_aliases() {
        let a = chat("a");
        let snapshot = Snapshot {
            aliases: vec![AliasRecord {
                scope: AliasScope::Chat(a.clone()),
                name: "gone".into(),
                protocol: Protocol::universal(),
                command: "removed".into(),
                args: vec![],
            }],
            ..Snapshot::default()
        };
        let store = Arc::new(MemoryStore::with_snapshot(snapshot));
        let engine = Engine::new(Config::default(), store.clone());
        engine.restore().unwrap();
        assert!(engine.registry().all_aliases().is_empty());
        assert_eq!(store.load().unwrap().aliases.len(), 1);
    }
}
