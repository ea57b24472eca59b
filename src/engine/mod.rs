//! The Engine - shared state for one running bot.
//!
//! Every backend, handler and test holds an `Arc<Engine>`. Nothing here is
//! global, so several engines can live side by side in one process.
//!
//! # Locking
//!
//! - `registry` and `scheduler` sit behind `parking_lot` locks that are never
//!   held across an `.await`. Callers clone what they need out first.
//! - Per-chat maps (`delimiters`, `linked_chats`, `timers`, `backends`) are
//!   `DashMap`s read through [`DashMapExt`] so no shard guard survives an
//!   await either.

mod aliases;
mod dashmap_ext;
mod directory;
mod dispatch;
mod scheduling;
mod state;

pub use dashmap_ext::DashMapExt;
pub use directory::ChatDirectory;
pub(crate) use scheduling::format_time;

use crate::backend::{Backend, Capabilities};
use crate::chat::{Chat, Protocol, Server, User};
use crate::command::Command;
use crate::config::Config;
use crate::handlers::Registry;
use crate::scheduler::Scheduler;
use crate::store::Store;
use crate::vars::AliasVars;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct Engine {
    config: Config,
    registry: RwLock<Registry>,
    scheduler: Mutex<Scheduler>,
    backends: DashMap<Protocol, Arc<dyn Backend>>,
    /// Per-chat overrides of the configured default delimiter.
    delimiters: DashMap<Chat, String>,
    /// Symmetric: `b` is in `linked_chats[a]` iff `a` is in `linked_chats[b]`.
    linked_chats: DashMap<Chat, BTreeSet<Chat>>,
    timers: DashMap<String, DateTime<Utc>>,
    vars: AliasVars,
    directory: Mutex<ChatDirectory>,
    store: Arc<dyn Store>,
    /// Held from snapshot to save so saves land in mutation order.
    persist_lock: Mutex<()>,
    shutdown: CancellationToken,
}

impl Engine {
    /// Create an engine. Nothing is loaded from `store` until
    /// [`Engine::restore`] is called.
    pub fn new(config: Config, store: Arc<dyn Store>) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry: RwLock::new(Registry::new()),
            scheduler: Mutex::new(Scheduler::new()),
            backends: DashMap::new(),
            delimiters: DashMap::new(),
            linked_chats: DashMap::new(),
            timers: DashMap::new(),
            vars: AliasVars::with_defaults(),
            directory: Mutex::new(ChatDirectory::new()),
            store,
            persist_lock: Mutex::new(()),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Alias variables substituted into command output.
    pub fn vars(&self) -> &AliasVars {
        &self.vars
    }

    /// Read access to commands and aliases. Do not hold across an await.
    pub fn registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read()
    }

    // ========================================================================
    // Backends
    // ========================================================================

    /// Attach a backend. Returns false if its protocol already has one.
    pub fn register_backend(&self, backend: Arc<dyn Backend>) -> bool {
        let protocol = backend.protocol();
        if self.backends.contains_key(&protocol) {
            warn!(protocol = %protocol, "Backend already registered");
            return false;
        }
        let capabilities = Capabilities::of(backend.as_ref());
        info!(protocol = %protocol, capabilities = %capabilities, "Backend registered");
        self.backends.insert(protocol, backend);
        self.refresh_chats();
        true
    }

    pub fn backend(&self, protocol: &Protocol) -> Option<Arc<dyn Backend>> {
        self.backends.get_cloned(protocol)
    }

    /// Protocols with a backend attached, sorted.
    pub fn protocols(&self) -> Vec<Protocol> {
        let mut protocols: Vec<_> = self.backends.iter().map(|e| e.key().clone()).collect();
        protocols.sort();
        protocols
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Register a command. Returns false, changing nothing, on a name clash.
    pub fn register_command(&self, command: Command) -> bool {
        let protocol = command.protocol().clone();
        let name = command.name().to_string();
        let added = self.registry.write().register_command(Arc::new(command));
        if added {
            debug!(protocol = %protocol, command = %name, "Command registered");
        } else {
            warn!(protocol = %protocol, command = %name, "Duplicate command ignored");
        }
        added
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// The bot's own user in `chat`, if a backend serves that chat.
    pub fn bot(&self, chat: &Chat) -> Option<User> {
        self.backend(&chat.protocol).map(|b| b.get_bot(chat))
    }

    pub fn is_bot(&self, chat: &Chat, user: &User) -> bool {
        self.bot(chat).is_some_and(|bot| bot == *user)
    }

    pub fn user_name(&self, chat: &Chat, user: &User) -> String {
        match self.backend(&chat.protocol) {
            Some(backend) => backend.get_user_name(chat, user),
            None => user.name.clone(),
        }
    }

    /// Nickname when the backend has one set, user name otherwise.
    pub fn display_name(&self, chat: &Chat, user: &User) -> String {
        let Some(backend) = self.backend(&chat.protocol) else {
            return user.name.clone();
        };
        backend
            .nicknames()
            .and_then(|n| n.nickname(chat, user))
            .unwrap_or_else(|| backend.get_user_name(chat, user))
    }

    pub fn chat_name(&self, chat: &Chat) -> String {
        match self.backend(&chat.protocol) {
            Some(backend) => backend.get_chat_name(chat),
            None => chat.name.clone(),
        }
    }

    /// Server `chat` belongs to, for protocols that have servers.
    pub fn server_of(&self, chat: &Chat) -> Option<Server> {
        let backend = self.backend(&chat.protocol)?;
        backend.servers().and_then(|s| s.server_of(chat))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Ask every loop tied to this engine to stop.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Shutdown requested");
            self.shutdown.cancel();
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub async fn wait_for_shutdown(&self) {
        self.shutdown.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::handler_fn;
    use crate::testing::{RecordingBackend, test_engine};

    #[test]
    fn test_register_backend_once_per_protocol() {
        let engine = test_engine();
        assert!(engine.register_backend(Arc::new(RecordingBackend::new("Console"))));
        assert!(!engine.register_backend(Arc::new(RecordingBackend::new("Console"))));
        assert_eq!(engine.protocols(), vec![Protocol::new("Console")]);
    }

    #[test]
    fn test_register_command_rejects_duplicates() {
        let engine = test_engine();
        assert!(engine.register_command(Command::new("Ping", handler_fn(|_| Ok(None)))));
        assert!(!engine.register_command(Command::new("ping", handler_fn(|_| Ok(None)))));
        assert!(engine.registry().command(&Protocol::universal(), "PING").is_some());
    }

    #[test]
    fn test_names_prefer_nicknames() {
        let engine = test_engine();
        let backend = RecordingBackend::new("Discord").with_nickname("alice", "Al");
        let chat = backend.chat("general");
        let alice = backend.user("alice");
        let bob = backend.user("bob");
        engine.register_backend(Arc::new(backend));

        assert_eq!(engine.display_name(&chat, &alice), "Al");
        assert_eq!(engine.display_name(&chat, &bob), "bob");
        assert_eq!(engine.user_name(&chat, &alice), "alice");
        assert!(engine.is_bot(&chat, &User::new(Protocol::new("Discord"), "convergence")));
    }

    #[test]
    fn test_names_without_backend() {
        let engine = test_engine();
        let chat = Chat::new(Protocol::new("Nowhere"), "room");
        let user = User::new(Protocol::new("Nowhere"), "zed");
        assert_eq!(engine.display_name(&chat, &user), "zed");
        assert_eq!(engine.chat_name(&chat), "room");
        assert!(engine.bot(&chat).is_none());
        assert!(engine.server_of(&chat).is_none());
    }

    #[tokio::test]
    async fn test_shutdown_wakes_waiters() {
        let engine = test_engine();
        let waiter = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.wait_for_shutdown().await })
        };
        engine.shutdown();
        engine.shutdown();
        assert!(engine.is_shutting_down());
        assert!(waiter.await.is_ok());
    }
}
