//! Scheduler state: deferred commands and one-shot tasks.
//!
//! This module only keeps the books. The engine drives it from a background
//! loop (see `engine::scheduling`), calling [`Scheduler::take_due`] on every
//! tick and running what comes back.
//!
//! Commands are indexed twice: by fire time, for scanning, and by id, for
//! `unschedule`. Both indices always hold the same entries.

use crate::chat::{Chat, User};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A command scheduled to run later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledCommand {
    pub id: u64,
    pub time: DateTime<Utc>,
    pub chat: Chat,
    pub sender: User,
    /// Name as typed; resolved again when it fires.
    pub command: String,
    pub args: Vec<String>,
}

impl ScheduledCommand {
    /// `name arg1 arg2`, for listings.
    pub fn invocation(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

/// An arbitrary action to run once its time has come.
pub struct ScheduledTask {
    pub time: DateTime<Utc>,
    action: Box<dyn FnOnce() + Send>,
}

impl ScheduledTask {
    pub fn new(time: DateTime<Utc>, action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            time,
            action: Box::new(action),
        }
    }

    pub fn run(self) {
        (self.action)()
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

/// Work handed back by [`Scheduler::take_due`].
#[derive(Debug, Default)]
pub struct DueWork {
    /// Due and within the lateness window, in fire-time order.
    pub fire: Vec<ScheduledCommand>,
    /// Due but too late to run.
    pub missed: Vec<ScheduledCommand>,
    pub tasks: Vec<ScheduledTask>,
}

impl DueWork {
    /// Whether any scheduled command left the indices.
    pub fn changed_commands(&self) -> bool {
        !self.fire.is_empty() || !self.missed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    by_time: BTreeMap<DateTime<Utc>, Vec<u64>>,
    by_id: BTreeMap<u64, ScheduledCommand>,
    tasks: Vec<ScheduledTask>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest free id, probing upward from zero.
    fn allocate_id(&self) -> u64 {
        let mut id = 0;
        while self.by_id.contains_key(&id) {
            id += 1;
        }
        id
    }

    /// Schedule a command, returning the stored entry.
    pub fn insert(
        &mut self,
        chat: Chat,
        sender: User,
        command: String,
        args: Vec<String>,
        time: DateTime<Utc>,
    ) -> ScheduledCommand {
        let entry = ScheduledCommand {
            id: self.allocate_id(),
            time,
            chat,
            sender,
            command,
            args,
        };
        self.index(entry.clone());
        entry
    }

    /// Re-insert a persisted entry under its original id.
    ///
    /// Returns false if the id is already taken.
    pub fn restore(&mut self, entry: ScheduledCommand) -> bool {
        if self.by_id.contains_key(&entry.id) {
            return false;
        }
        self.index(entry);
        true
    }

    fn index(&mut self, entry: ScheduledCommand) {
        self.by_time.entry(entry.time).or_default().push(entry.id);
        self.by_id.insert(entry.id, entry);
    }

    /// Remove a command from both indices.
    pub fn remove(&mut self, id: u64) -> Option<ScheduledCommand> {
        let entry = self.by_id.remove(&id)?;
        if let Some(bucket) = self.by_time.get_mut(&entry.time) {
            bucket.retain(|other| *other != id);
            if bucket.is_empty() {
                self.by_time.remove(&entry.time);
            }
        }
        Some(entry)
    }

    pub fn get(&self, id: u64) -> Option<&ScheduledCommand> {
        self.by_id.get(&id)
    }

    /// Scheduled commands in fire-time order, optionally only `sender`'s.
    pub fn commands(&self, sender: Option<&User>) -> Vec<ScheduledCommand> {
        self.by_time
            .values()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
            .filter(|entry| sender.is_none_or(|s| entry.sender == *s))
            .cloned()
            .collect()
    }

    pub fn push_task(&mut self, task: ScheduledTask) {
        self.tasks.push(task);
    }

    /// Remove and return everything due at `now`.
    ///
    /// Commands later than `lateness` are returned as missed instead of
    /// fired. Tasks have no lateness window.
    pub fn take_due(&mut self, now: DateTime<Utc>, lateness: Duration) -> DueWork {
        let mut due = DueWork::default();

        while let Some(bucket) = self.by_time.first_entry() {
            if *bucket.key() > now {
                break;
            }
            for id in bucket.remove() {
                let Some(entry) = self.by_id.remove(&id) else {
                    continue;
                };
                if now - entry.time <= lateness {
                    due.fire.push(entry);
                } else {
                    due.missed.push(entry);
                }
            }
        }

        let (ready, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|task| task.time <= now);
        self.tasks = pending;
        due.tasks = ready;

        due
    }

    /// Earliest pending command fire time.
    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        self.by_time.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    #[cfg(test)]
    fn indices_agree(&self) -> bool {
        let timed: usize = self.by_time.values().map(Vec::len).sum();
        timed == self.by_id.len()
            && self
                .by_time
                .iter()
                .all(|(time, ids)| ids.iter().all(|id| self.by_id.get(id).is_some_and(|e| e.time == *time)))
    }
}
