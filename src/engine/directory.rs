//! Small numeric ids for chats, so users can name a chat on another
//! protocol (`link 3`) without typing its full identity.

use super::Engine;
use crate::chat::Chat;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Ids are handed out from 1 and never reused while the process runs.
#[derive(Debug, Default)]
pub struct ChatDirectory {
    by_id: BTreeMap<u32, Chat>,
    ids: HashMap<Chat, u32>,
}

impl ChatDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `chat`, assigning the next free one on first sight.
    pub fn id_for(&mut self, chat: &Chat) -> u32 {
        if let Some(id) = self.ids.get(chat) {
            return *id;
        }
        let id = self.by_id.keys().next_back().map_or(1, |last| last + 1);
        self.by_id.insert(id, chat.clone());
        self.ids.insert(chat.clone(), id);
        id
    }

    pub fn get(&self, id: u32) -> Option<&Chat> {
        self.by_id.get(&id)
    }

    /// All known chats in id order.
    pub fn entries(&self) -> Vec<(u32, Chat)> {
        self.by_id.iter().map(|(id, chat)| (*id, chat.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Engine {
    /// Ask every backend for its chats and give new ones ids.
    ///
    /// Returns how many chats are known afterwards.
    pub fn refresh_chats(&self) -> usize {
        let backends: Vec<_> = self.backends.iter().map(|e| e.value().clone()).collect();
        let mut found: Vec<Chat> = backends.iter().flat_map(|b| b.get_chats()).collect();
        found.sort();

        let mut directory = self.directory.lock();
        for chat in &found {
            directory.id_for(chat);
        }
        debug!(known = directory.len(), "Chat directory refreshed");
        directory.len()
    }

    /// Id of `chat`, assigning one if it is new.
    pub fn chat_id(&self, chat: &Chat) -> u32 {
        self.directory.lock().id_for(chat)
    }

    pub fn chat_by_id(&self, id: u32) -> Option<Chat> {
        self.directory.lock().get(id).cloned()
    }

    pub fn chats(&self) -> Vec<(u32, Chat)> {
        self.directory.lock().entries()
    }
}
