//! Backend contract and optional capabilities.
//!
//! A backend owns the connection to one chat protocol. It delivers incoming
//! messages to [`crate::Engine::received_message`] and implements
//! [`Backend`] so the engine can talk back.
//!
//! Protocol features that not every platform has are modelled as separate
//! capability traits. The engine probes for them through the accessor
//! methods on [`Backend`] (`formatting()`, `images()`, ...), which return
//! `None` unless the backend overrides them. A missing capability always
//! means "skip the feature", never an error.

use crate::chat::{Chat, Protocol, Server, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

/// Core backend operations.
#[async_trait]
pub trait Backend: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Send a message. Returns false if the backend could not deliver it.
    async fn send_message(&self, chat: &Chat, text: &str) -> bool;

    /// The bot's own identity in `chat`.
    fn get_bot(&self, chat: &Chat) -> User;

    fn get_user_name(&self, chat: &Chat, user: &User) -> String;

    fn get_chat_name(&self, chat: &Chat) -> String;

    fn get_chats(&self) -> Vec<Chat>;

    fn get_users(&self, chat: &Chat) -> Vec<User>;

    fn formatting(&self) -> Option<&dyn CanFormatMessages> {
        None
    }

    fn nicknames(&self) -> Option<&dyn HasNicknames> {
        None
    }

    fn images(&self) -> Option<&dyn HasImages> {
        None
    }

    fn mentions(&self) -> Option<&dyn CanMentionUsers> {
        None
    }

    fn history(&self) -> Option<&dyn HasMessageHistory> {
        None
    }

    fn read_status(&self) -> Option<&dyn HasReadStatus> {
        None
    }

    fn availability(&self) -> Option<&dyn HasUserAvailability> {
        None
    }

    fn custom_emoji(&self) -> Option<&dyn HasCustomEmoji> {
        None
    }

    fn stickers(&self) -> Option<&dyn HasStickers> {
        None
    }

    fn servers(&self) -> Option<&dyn HasServers> {
        None
    }
}

/// Text formats a backend may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
}

/// Backends that can render inline formatting.
pub trait CanFormatMessages: Send + Sync {
    fn supported_formats(&self) -> Vec<Format>;

    /// Opening and closing markers for `format`, if supported.
    fn delimiters(&self, format: Format) -> Option<(String, String)>;

    /// Wrap `text` in the markers for `format`, or return it unchanged.
    fn apply(&self, format: Format, text: &str) -> String {
        match self.delimiters(format) {
            Some((open, close)) => format!("{}{}{}", open, text, close),
            None => text.to_string(),
        }
    }
}

/// Backends where users have per-chat nicknames.
pub trait HasNicknames: Send + Sync {
    /// The user's nickname in `chat`, if one is set.
    fn nickname(&self, chat: &Chat, user: &User) -> Option<String>;
}

/// An image attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub url: String,
}

/// Backends that can send images.
#[async_trait]
pub trait HasImages: Send + Sync {
    async fn send_images(&self, chat: &Chat, images: &[Image]) -> bool;
}

/// Backends with a mention syntax.
pub trait CanMentionUsers: Send + Sync {
    fn mention(&self, chat: &Chat, user: &User) -> String;
}

/// A previously sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMessage {
    pub sender: User,
    pub text: String,
    pub time: DateTime<Utc>,
}

/// Backends that can fetch earlier messages.
#[async_trait]
pub trait HasMessageHistory: Send + Sync {
    async fn recent_messages(&self, chat: &Chat, limit: usize) -> Vec<HistoryMessage>;
}

/// Backends with read receipts.
#[async_trait]
pub trait HasReadStatus: Send + Sync {
    async fn mark_read(&self, chat: &Chat) -> bool;
}

/// Presence of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Online,
    Idle,
    Offline,
    Unknown,
}

/// Backends that report user presence.
pub trait HasUserAvailability: Send + Sync {
    fn user_availability(&self, chat: &Chat, user: &User) -> Availability;
}

/// Backends with chat-specific emoji.
pub trait HasCustomEmoji: Send + Sync {
    fn emoji_names(&self, chat: &Chat) -> Vec<String>;
}

/// Backends that can send stickers.
#[async_trait]
pub trait HasStickers: Send + Sync {
    async fn send_sticker(&self, chat: &Chat, sticker: &str) -> bool;
}

/// Backends whose chats belong to servers.
pub trait HasServers: Send + Sync {
    fn server_of(&self, chat: &Chat) -> Option<Server>;
}

/// Which optional capabilities a backend advertises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub formatting: bool,
    pub nicknames: bool,
    pub images: bool,
    pub mentions: bool,
    pub history: bool,
    pub read_status: bool,
    pub availability: bool,
    pub custom_emoji: bool,
    pub stickers: bool,
    pub servers: bool,
}

impl Capabilities {
    pub fn of(backend: &dyn Backend) -> Self {
        Self {
            formatting: backend.formatting().is_some(),
            nicknames: backend.nicknames().is_some(),
            images: backend.images().is_some(),
            mentions: backend.mentions().is_some(),
            history: backend.history().is_some(),
            read_status: backend.read_status().is_some(),
            availability: backend.availability().is_some(),
            custom_emoji: backend.custom_emoji().is_some(),
            stickers: backend.stickers().is_some(),
            servers: backend.servers().is_some(),
        }
    }

    fn names(&self) -> Vec<&'static str> {
        [
            (self.formatting, "formatting"),
            (self.nicknames, "nicknames"),
            (self.images, "images"),
            (self.mentions, "mentions"),
            (self.history, "history"),
            (self.read_status, "read_status"),
            (self.availability, "availability"),
            (self.custom_emoji, "custom_emoji"),
            (self.stickers, "stickers"),
            (self.servers, "servers"),
        ]
        .into_iter()
        .filter_map(|(present, name)| present.then_some(name))
        .collect()
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(","))
        }
    }
}
