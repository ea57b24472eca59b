//! Test bot harness.

use convergence::chat::Chat;
use convergence::config::Config;
use convergence::engine::Engine;
use convergence::handlers::register_defaults;
use convergence::store::MemoryStore;
use convergence::testing::RecordingBackend;
use std::sync::Arc;

/// Name of the console chat every `TestBot` starts with.
pub const MAIN_CHAT: &str = "main";

pub struct TestBot {
    pub engine: Arc<Engine>,
    pub store: Arc<MemoryStore>,
    pub console: Arc<RecordingBackend>,
}

#[allow(dead_code)]
impl TestBot {
    /// A bot with empty state.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// A bot that restores whatever `store` holds.
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Self::build(Config::default(), store)
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, Arc::new(MemoryStore::new()))
    }

    fn build(config: Config, store: Arc<MemoryStore>) -> Self {
        let engine = Engine::new(config, store.clone());
        register_defaults(&engine);
        let console = Arc::new(RecordingBackend::new("Console").with_chat(MAIN_CHAT));
        engine.register_backend(console.clone());
        engine.restore().expect("restore from memory store");
        Self {
            engine,
            store,
            console,
        }
    }

    /// Attach another backend and return it.
    pub fn add_backend(&self, backend: RecordingBackend) -> Arc<RecordingBackend> {
        let backend = Arc::new(backend);
        assert!(self.engine.register_backend(backend.clone()));
        backend
    }

    pub fn main(&self) -> Chat {
        self.console.chat(MAIN_CHAT)
    }

    /// `user` says `text` in the main chat. Returns everything the bot sent
    /// there since the last call.
    pub async fn say(&self, user: &str, text: &str) -> Vec<String> {
        let chat = self.main();
        self.engine
            .received_message(&chat, text, &self.console.user(user))
            .await;
        self.console
            .take_sent()
            .into_iter()
            .filter(|m| m.chat == chat)
            .map(|m| m.text)
            .collect()
    }

    /// The one reply to `text`.
    pub async fn reply(&self, user: &str, text: &str) -> String {
        let mut sent = self.say(user, text).await;
        assert_eq!(sent.len(), 1, "expected one reply to {text:?}, got {sent:?}");
        sent.remove(0)
    }
}
