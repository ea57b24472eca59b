//! Alias creation and removal.

use super::Engine;
use crate::chat::{AliasScope, Chat};
use crate::command::Alias;
use crate::error::AliasError;
use crate::handlers::Resolved;
use convergence_proto::parse_command;
use std::sync::Arc;
use tracing::info;

impl Engine {
    /// Create an alias `name` in `scope` for the command text `target`.
    ///
    /// `target` is parsed with `chat`'s delimiter (added if missing) and
    /// resolved from `chat`. An alias of an alias stores the final command
    /// with both argument prefixes, so resolution never chains.
    pub fn create_alias(
        &self,
        scope: AliasScope,
        name: &str,
        target: &str,
        chat: &Chat,
    ) -> Result<Arc<Alias>, AliasError> {
        if name.is_empty() || !name.chars().all(char::is_alphanumeric) {
            return Err(AliasError::InvalidName(name.to_string()));
        }
        let name = name.to_lowercase();

        let delimiter = self.delimiter(chat);
        let text = if target.starts_with(&delimiter) {
            target.to_string()
        } else {
            format!("{}{}", delimiter, target)
        };
        let parsed = parse_command(&text, &delimiter)?
            .ok_or_else(|| AliasError::NotACommand(target.to_string()))?;

        let server = self.server_of(chat);
        let mut registry = self.registry.write();
        let resolved = registry.resolve(&parsed.name, chat, server.as_ref())?;
        if let Resolved::Alias(existing) = &resolved {
            // Same name in another scope is shadowing; flattening keeps it finite.
            if existing.name == name && existing.scope == scope {
                return Err(AliasError::Cycle(name));
            }
        }
        let data = resolved.into_command_data(parsed.args);

        let alias = Arc::new(Alias {
            scope,
            name,
            command: data.command,
            args: data.args,
        });
        if !registry.register_alias(Arc::clone(&alias)) {
            return Err(AliasError::AlreadyExists(alias.name.clone()));
        }
        drop(registry);

        info!(
            alias = %alias.name,
            scope = %alias.scope,
            target = %alias.target(),
            "Alias created"
        );
        self.persist();
        Ok(alias)
    }

    /// Remove an alias. Returns whether it existed.
    pub fn remove_alias(&self, scope: &AliasScope, name: &str) -> bool {
        let removed = self.registry.write().remove_alias(scope, name);
        match removed {
            Some(alias) => {
                info!(alias = %alias.name, scope = %alias.scope, "Alias removed");
                self.persist();
                true
            }
            None => false,
        }
    }
}
