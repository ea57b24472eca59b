//! Console backend: one chat on stdin/stdout.
//!
//! Used by the `convergence` binary so the engine can be driven by hand.
//! Every line read from stdin is a message from the local user; everything
//! the bot sends is printed.

use crate::backend::Backend;
use crate::chat::{Chat, Protocol, User};
use crate::engine::Engine;
use crate::telemetry::spans;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{Instrument, debug, info, warn};

pub const CONSOLE_PROTOCOL: &str = "Console";
const CHAT_NAME: &str = "console";
const BOT_NAME: &str = "convergence";

/// Longest accepted input line, in bytes.
const MAX_LINE_LENGTH: usize = 4096;

pub struct ConsoleBackend {
    user_name: String,
    stdout: Mutex<Stdout>,
}

impl ConsoleBackend {
    /// A console whose local user is called `user_name`.
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            stdout: Mutex::new(tokio::io::stdout()),
        }
    }

    pub fn chat(&self) -> Chat {
        Chat::new(Protocol::new(CONSOLE_PROTOCOL), CHAT_NAME)
    }

    pub fn user(&self) -> User {
        User::new(Protocol::new(CONSOLE_PROTOCOL), self.user_name.clone())
    }
}

#[async_trait]
impl Backend for ConsoleBackend {
    fn protocol(&self) -> Protocol {
        Protocol::new(CONSOLE_PROTOCOL)
    }

    async fn send_message(&self, _chat: &Chat, text: &str) -> bool {
        let mut stdout = self.stdout.lock().await;
        let line = format!("{}\n", text);
        match stdout.write_all(line.as_bytes()).await {
            Ok(()) => stdout.flush().await.is_ok(),
            Err(e) => {
                warn!(error = %e, "Failed to write to stdout");
                false
            }
        }
    }

    fn get_bot(&self, _chat: &Chat) -> User {
        User::new(Protocol::new(CONSOLE_PROTOCOL), BOT_NAME)
    }

    fn get_user_name(&self, _chat: &Chat, user: &User) -> String {
        user.name.clone()
    }

    fn get_chat_name(&self, chat: &Chat) -> String {
        chat.name.clone()
    }

    fn get_chats(&self) -> Vec<Chat> {
        vec![self.chat()]
    }

    fn get_users(&self, chat: &Chat) -> Vec<User> {
        vec![self.get_bot(chat), self.user()]
    }
}

/// Feed stdin lines to `engine` until stdin closes or the engine shuts down.
pub async fn run(engine: Arc<Engine>, console: Arc<ConsoleBackend>) {
    let chat = console.chat();
    let user = console.user();
    let mut lines = FramedRead::new(
        tokio::io::stdin(),
        LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
    );
    info!(chat = %chat, user = %user.name, "Console ready");

    async {
        loop {
            tokio::select! {
                line = lines.next() => match line {
                    Some(Ok(line)) => {
                        let line = line.trim_end();
                        if !line.is_empty() {
                            engine.received_message(&chat, line, &user).await;
                        }
                    }
                    Some(Err(e)) => warn!(error = %e, "Discarding unreadable console input"),
                    None => {
                        debug!("Console input closed");
                        break;
                    }
                },
                _ = engine.wait_for_shutdown() => break,
            }
        }
    }
    .instrument(spans::backend(&console.protocol()))
    .await
}
