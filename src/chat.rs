//! Chat identity types.
//!
//! Chats, users and servers are opaque names scoped to a [`Protocol`]. The
//! engine never interprets the names; it only compares and hashes them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the pseudo-protocol holding commands available everywhere.
pub const UNIVERSAL_PROTOCOL: &str = "Universal";

/// A chat protocol (e.g. "Console", "Discord").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Protocol(String);

impl Protocol {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The universal scope.
    pub fn universal() -> Self {
        Self(UNIVERSAL_PROTOCOL.to_string())
    }

    pub fn is_universal(&self) -> bool {
        self.0 == UNIVERSAL_PROTOCOL
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! scoped_identity {
    ($(#[$meta:meta])* $ty:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $ty {
            pub protocol: Protocol,
            pub name: String,
        }

        impl $ty {
            pub fn new(protocol: Protocol, name: impl Into<String>) -> Self {
                Self {
                    protocol,
                    name: name.into(),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}/{}", self.protocol, self.name)
            }
        }
    };
}

scoped_identity!(
    /// A conversation on some backend. Ordered by protocol, then name.
    Chat
);
scoped_identity!(
    /// A participant in a chat.
    User
);
scoped_identity!(
    /// A group of chats on protocols that have them (e.g. a Discord guild).
    Server
);

/// Where an alias is defined.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AliasScope {
    Chat(Chat),
    Server(Server),
}

impl AliasScope {
    pub fn protocol(&self) -> &Protocol {
        match self {
            Self::Chat(chat) => &chat.protocol,
            Self::Server(server) => &server.protocol,
        }
    }
}

impl fmt::Display for AliasScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat(chat) => write!(f, "chat {}", chat),
            Self::Server(server) => write!(f, "server {}", server),
        }
    }
}
