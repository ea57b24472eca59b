//! Test doubles.
//!
//! [`RecordingBackend`] is an in-memory backend that records everything the
//! engine sends. Optional capabilities are switched on with the `with_*`
//! builders so tests can exercise both the plain and the rich paths.

use crate::backend::{Backend, CanFormatMessages, Format, HasImages, HasNicknames, HasServers, Image};
use crate::chat::{Chat, Protocol, Server, User};
use crate::config::Config;
use crate::engine::Engine;
use crate::store::MemoryStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Name of the bot user on every [`RecordingBackend`].
pub const BOT_NAME: &str = "convergence";

/// An engine with default config, an in-memory store, and no backends.
pub fn test_engine() -> Arc<Engine> {
    Engine::new(Config::default(), Arc::new(MemoryStore::new()))
}

/// A message the engine asked a backend to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat: Chat,
    pub text: String,
}

/// Backend that records sent messages instead of delivering them.
pub struct RecordingBackend {
    protocol: Protocol,
    chats: Vec<Chat>,
    bold: Option<(String, String)>,
    images: bool,
    server: Option<Server>,
    nicknames: HashMap<String, String>,
    sent: Mutex<Vec<SentMessage>>,
    sent_images: Mutex<Vec<(Chat, Vec<Image>)>>,
}

impl RecordingBackend {
    pub fn new(protocol: &str) -> Self {
        Self {
            protocol: Protocol::new(protocol),
            chats: Vec::new(),
            bold: None,
            images: false,
            server: None,
            nicknames: HashMap::new(),
            sent: Mutex::new(Vec::new()),
            sent_images: Mutex::new(Vec::new()),
        }
    }

    /// Advertise a chat through `get_chats`.
    pub fn with_chat(mut self, name: &str) -> Self {
        self.chats.push(self.chat(name));
        self
    }

    /// Support bold formatting with the given markers.
    pub fn with_bold(mut self, open: &str, close: &str) -> Self {
        self.bold = Some((open.to_string(), close.to_string()));
        self
    }

    pub fn with_images(mut self) -> Self {
        self.images = true;
        self
    }

    /// Put every chat on one server.
    pub fn with_server(mut self, name: &str) -> Self {
        self.server = Some(Server::new(self.protocol.clone(), name));
        self
    }

    pub fn with_nickname(mut self, user: &str, nickname: &str) -> Self {
        self.nicknames.insert(user.to_string(), nickname.to_string());
        self
    }

    pub fn chat(&self, name: &str) -> Chat {
        Chat::new(self.protocol.clone(), name)
    }

    pub fn user(&self, name: &str) -> User {
        User::new(self.protocol.clone(), name)
    }

    pub fn bot_user(&self) -> User {
        self.user(BOT_NAME)
    }

    pub fn server(&self) -> Option<Server> {
        self.server.clone()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Texts sent to `chat`, in order.
    pub fn sent_to(&self, chat: &Chat) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.chat == *chat)
            .map(|m| m.text.clone())
            .collect()
    }

    /// Drain the record.
    pub fn take_sent(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn sent_images(&self) -> Vec<(Chat, Vec<Image>)> {
        self.sent_images.lock().clone()
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    fn protocol(&self) -> Protocol {
        self.protocol.clone()
    }

    async fn send_message(&self, chat: &Chat, text: &str) -> bool {
        self.sent.lock().push(SentMessage {
            chat: chat.clone(),
            text: text.to_string(),
        });
        true
    }

    fn get_bot(&self, _chat: &Chat) -> User {
        self.bot_user()
    }

    fn get_user_name(&self, _chat: &Chat, user: &User) -> String {
        user.name.clone()
    }

    fn get_chat_name(&self, chat: &Chat) -> String {
        chat.name.clone()
    }

    fn get_chats(&self) -> Vec<Chat> {
        self.chats.clone()
    }

    fn get_users(&self, _chat: &Chat) -> Vec<User> {
        let mut users = vec![self.bot_user()];
        users.extend(self.nicknames.keys().map(|name| self.user(name)));
        users
    }

    fn formatting(&self) -> Option<&dyn CanFormatMessages> {
        self.bold.as_ref().map(|_| self as &dyn CanFormatMessages)
    }

    fn nicknames(&self) -> Option<&dyn HasNicknames> {
        (!self.nicknames.is_empty()).then_some(self as &dyn HasNicknames)
    }

    fn images(&self) -> Option<&dyn HasImages> {
        self.images.then_some(self as &dyn HasImages)
    }

    fn servers(&self) -> Option<&dyn HasServers> {
        self.server.as_ref().map(|_| self as &dyn HasServers)
    }
}

impl CanFormatMessages for RecordingBackend {
    fn supported_formats(&self) -> Vec<Format> {
        match self.bold {
            Some(_) => vec![Format::Bold],
            None => vec![],
        }
    }

    fn delimiters(&self, format: Format) -> Option<(String, String)> {
        match format {
            Format::Bold => self.bold.clone(),
            _ => None,
        }
    }
}

impl HasNicknames for RecordingBackend {
    fn nickname(&self, _chat: &Chat, user: &User) -> Option<String> {
        self.nicknames.get(&user.name).cloned()
    }
}

#[async_trait]
impl HasImages for RecordingBackend {
    async fn send_images(&self, chat: &Chat, images: &[Image]) -> bool {
        self.sent_images.lock().push((chat.clone(), images.to_vec()));
        true
    }
}

impl HasServers for RecordingBackend {
    fn server_of(&self, _chat: &Chat) -> Option<Server> {
        self.server.clone()
    }
}
