//! Command and alias registry.
//!
//! Commands are keyed by protocol (the universal pseudo-protocol included),
//! aliases by the chat or server that defines them. A single help index,
//! sorted by protocol then name, covers both.

use crate::chat::{AliasScope, Chat, Protocol, Server};
use crate::command::{Alias, Command, CommandData};
use crate::error::DispatchError;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Sort key of the help index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct HelpKey {
    pub protocol: Protocol,
    pub name: String,
    /// `None` for commands.
    pub scope: Option<AliasScope>,
}

/// One line of help.
#[derive(Debug, Clone)]
pub enum HelpEntry {
    Command(Arc<Command>),
    Alias(Arc<Alias>),
}

impl HelpEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Command(command) => command.name(),
            Self::Alias(alias) => &alias.name,
        }
    }

    /// `(C)` for commands, `(A)` for aliases.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Command(_) => "(C)",
            Self::Alias(_) => "(A)",
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Command(command) => command.help().to_string(),
            Self::Alias(alias) => format!("alias for \"{}\"", alias.target()),
        }
    }

    fn is(&self, resolved: &Resolved) -> bool {
        match (self, resolved) {
            (Self::Command(a), Resolved::Command(b)) => Arc::ptr_eq(a, b),
            (Self::Alias(a), Resolved::Alias(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Result of name resolution.
#[derive(Debug, Clone)]
pub enum Resolved {
    Alias(Arc<Alias>),
    Command(Arc<Command>),
}

impl Resolved {
    /// The command that will run.
    pub fn command(&self) -> &Arc<Command> {
        match self {
            Self::Alias(alias) => &alias.command,
            Self::Command(command) => command,
        }
    }

    /// Attach caller arguments, expanding alias prefixes.
    pub fn into_command_data(self, args: Vec<String>) -> CommandData {
        match self {
            Self::Alias(alias) => CommandData {
                command: Arc::clone(&alias.command),
                args: alias.expand(args),
            },
            Self::Command(command) => CommandData { command, args },
        }
    }
}

/// Registry of commands and aliases.
#[derive(Default)]
pub struct Registry {
    commands: HashMap<Protocol, HashMap<String, Arc<Command>>>,
    aliases: HashMap<AliasScope, HashMap<String, Arc<Alias>>>,
    help_index: BTreeMap<HelpKey, HelpEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. Returns false, changing nothing, if its protocol
    /// already has a command with that name.
    pub fn register_command(&mut self, command: Arc<Command>) -> bool {
        let by_name = self.commands.entry(command.protocol().clone()).or_default();
        if by_name.contains_key(command.name()) {
            return false;
        }
        by_name.insert(command.name().to_string(), Arc::clone(&command));
        self.help_index.insert(
            HelpKey {
                protocol: command.protocol().clone(),
                name: command.name().to_string(),
                scope: None,
            },
            HelpEntry::Command(command),
        );
        true
    }

    pub fn command(&self, protocol: &Protocol, name: &str) -> Option<Arc<Command>> {
        self.commands
            .get(protocol)
            .and_then(|by_name| by_name.get(&name.to_lowercase()))
            .cloned()
    }

    /// Every registered command, in help order.
    pub fn commands(&self) -> Vec<Arc<Command>> {
        self.help_index
            .values()
            .filter_map(|entry| match entry {
                HelpEntry::Command(command) => Some(Arc::clone(command)),
                HelpEntry::Alias(_) => None,
            })
            .collect()
    }

    /// Register an alias. Returns false, changing nothing, if its scope
    /// already has an alias with that name.
    ///
    /// Names are stored lowercased, like command names.
    pub fn register_alias(&mut self, alias: Arc<Alias>) -> bool {
        let alias = if alias.name.chars().any(char::is_uppercase) {
            Arc::new(Alias {
                name: alias.name.to_lowercase(),
                ..Alias::clone(&alias)
            })
        } else {
            alias
        };
        let by_name = self.aliases.entry(alias.scope.clone()).or_default();
        if by_name.contains_key(&alias.name) {
            return false;
        }
        by_name.insert(alias.name.clone(), Arc::clone(&alias));
        self.help_index.insert(
            HelpKey {
                protocol: alias.scope.protocol().clone(),
                name: alias.name.clone(),
                scope: Some(alias.scope.clone()),
            },
            HelpEntry::Alias(alias),
        );
        true
    }

    pub fn alias(&self, scope: &AliasScope, name: &str) -> Option<Arc<Alias>> {
        self.aliases
            .get(scope)
            .and_then(|by_name| by_name.get(&name.to_lowercase()))
            .cloned()
    }

    pub fn remove_alias(&mut self, scope: &AliasScope, name: &str) -> Option<Arc<Alias>> {
        let name = name.to_lowercase();
        let by_name = self.aliases.get_mut(scope)?;
        let removed = by_name.remove(&name)?;
        if by_name.is_empty() {
            self.aliases.remove(scope);
        }
        self.help_index.remove(&HelpKey {
            protocol: scope.protocol().clone(),
            name,
            scope: Some(scope.clone()),
        });
        Some(removed)
    }

    /// Aliases defined directly on `scope`, sorted by name.
    pub fn aliases(&self, scope: &AliasScope) -> Vec<Arc<Alias>> {
        let mut aliases: Vec<_> = self
            .aliases
            .get(scope)
            .map(|by_name| by_name.values().cloned().collect())
            .unwrap_or_default();
        aliases.sort_by(|a, b| a.name.cmp(&b.name));
        aliases
    }

    /// Every alias in every scope, in help order.
    pub fn all_aliases(&self) -> Vec<Arc<Alias>> {
        self.help_index
            .values()
            .filter_map(|entry| match entry {
                HelpEntry::Alias(alias) => Some(Arc::clone(alias)),
                HelpEntry::Command(_) => None,
            })
            .collect()
    }

    /// Resolve `name` as typed in `chat`.
    ///
    /// Chat aliases shadow server aliases, which shadow protocol commands,
    /// which shadow universal commands.
    pub fn resolve(
        &self,
        name: &str,
        chat: &Chat,
        server: Option<&Server>,
    ) -> Result<Resolved, DispatchError> {
        let name = name.to_lowercase();
        let chat_scope = AliasScope::Chat(chat.clone());
        if let Some(alias) = self.alias(&chat_scope, &name) {
            return Ok(Resolved::Alias(alias));
        }
        if let Some(server) = server {
            let server_scope = AliasScope::Server(server.clone());
            if let Some(alias) = self.alias(&server_scope, &name) {
                return Ok(Resolved::Alias(alias));
            }
        }
        if let Some(command) = self.command(&chat.protocol, &name) {
            return Ok(Resolved::Command(command));
        }
        if let Some(command) = self.command(&Protocol::universal(), &name) {
            return Ok(Resolved::Command(command));
        }
        Err(DispatchError::CommandNotFound(name))
    }

    /// Help entries usable from `chat`, in index order.
    ///
    /// Shadowed entries are left out, so every listed name runs the entry
    /// shown for it.
    pub fn help_entries(&self, chat: &Chat, server: Option<&Server>) -> Vec<HelpEntry> {
        self.help_index
            .values()
            .filter(|entry| {
                self.resolve(entry.name(), chat, server)
                    .map(|resolved| entry.is(&resolved))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}
