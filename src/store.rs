//! Persisted bot state.
//!
//! The engine saves a full [`Snapshot`] after every change to delimiters,
//! aliases, scheduled commands, links or timers. [`JsonFileStore`] keeps it
//! in a single JSON file; [`MemoryStore`] keeps it in memory for tests.

use crate::chat::{AliasScope, Chat, Protocol};
use crate::scheduler::ScheduledCommand;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimiterRecord {
    pub chat: Chat,
    pub delimiter: String,
}

/// An alias, stored by target command name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRecord {
    pub scope: AliasScope,
    pub name: String,
    /// Protocol the target command is registered on.
    pub protocol: Protocol,
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub chat: Chat,
    pub linked: Vec<Chat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    pub name: String,
    pub started: DateTime<Utc>,
}

/// Everything the engine persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub delimiters: Vec<DelimiterRecord>,
    #[serde(default)]
    pub aliases: Vec<AliasRecord>,
    #[serde(default)]
    pub scheduled: Vec<ScheduledCommand>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
    #[serde(default)]
    pub timers: Vec<TimerRecord>,
}

/// Storage for [`Snapshot`]s.
pub trait Store: Send + Sync {
    /// Load the last saved snapshot, or an empty one if nothing was saved.
    fn load(&self) -> Result<Snapshot, StoreError>;

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// Snapshot kept in a JSON file.
///
/// Saves share one temp file, so they are serialized by `write_lock`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> Result<Snapshot, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Snapshot::default()),
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_reader(BufReader::new(file))?;
        debug!(path = %self.path.display(), "State loaded");
        Ok(snapshot)
    }

    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let temp_path = self.path.with_extension("json.tmp");
        let writer = BufWriter::new(File::create(&temp_path)?);
        serde_json::to_writer_pretty(writer, snapshot)?;
        fs::rename(&temp_path, &self.path)?;
        debug!(path = %self.path.display(), "State saved");
        Ok(())
    }
}

/// Snapshot kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Snapshot>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts out holding `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            saves: AtomicUsize::new(0),
        }
    }

    /// The last saved snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().clone()
    }

    /// Number of saves so far.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<Snapshot, StoreError> {
        Ok(self.snapshot.lock().clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        *self.snapshot.lock() = snapshot.clone();
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
