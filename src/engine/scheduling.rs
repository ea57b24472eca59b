//! Scheduled commands, one-shot tasks, and the loop that fires them.

use super::Engine;
use crate::chat::{Chat, User};
use crate::handlers::Resolved;
use crate::metrics;
use crate::scheduler::{ScheduledCommand, ScheduledTask};
use crate::telemetry::spans;
use chrono::{DateTime, Utc};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, info, warn};

/// Human-readable fire time.
pub(crate) fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

impl Engine {
    /// Schedule `command` to run in `chat` as `sender` at `time`.
    ///
    /// The command is looked up again when it fires. Returns a confirmation
    /// for the chat.
    pub fn schedule(
        &self,
        chat: &Chat,
        sender: &User,
        command: &str,
        args: Vec<String>,
        time: DateTime<Utc>,
    ) -> String {
        let entry = self.scheduler.lock().insert(
            chat.clone(),
            sender.clone(),
            command.to_lowercase(),
            args,
            time,
        );
        info!(id = entry.id, chat = %chat, command = %entry.command, time = %time, "Command scheduled");
        self.persist();
        format!(
            "Scheduled \"{}\" (id {}) for {}.",
            entry.invocation(),
            entry.id,
            format_time(&entry.time)
        )
    }

    /// Cancel a scheduled command. Returns whether it existed.
    pub fn unschedule(&self, id: u64) -> bool {
        let removed = self.scheduler.lock().remove(id);
        match removed {
            Some(entry) => {
                info!(id, command = %entry.command, "Command unscheduled");
                self.persist();
                true
            }
            None => false,
        }
    }

    /// Pending commands in fire-time order, optionally only `sender`'s.
    pub fn scheduled_commands(&self, sender: Option<&User>) -> Vec<ScheduledCommand> {
        self.scheduler.lock().commands(sender)
    }

    /// Run `action` on the scheduler loop once `time` has passed.
    /// Tasks are not persisted.
    pub fn schedule_task(&self, time: DateTime<Utc>, action: impl FnOnce() + Send + 'static) {
        self.scheduler.lock().push_task(ScheduledTask::new(time, action));
    }

    /// Fire everything due at `now`.
    ///
    /// Commands past the lateness window are dropped without running.
    pub async fn tick(self: &Arc<Self>, now: DateTime<Utc>) {
        let lateness = self.config.scheduler.allowed_lateness();
        let due = self.scheduler.lock().take_due(now, lateness);
        if due.changed_commands() {
            self.persist();
        }

        for entry in &due.missed {
            warn!(
                id = entry.id,
                command = %entry.command,
                chat = %entry.chat,
                late_by = %(now - entry.time),
                "Dropping scheduled command past its lateness window"
            );
            metrics::record_scheduler_missed();
        }

        for entry in due.fire {
            self.fire(entry).in_current_span().await;
        }

        for task in due.tasks {
            if catch_unwind(AssertUnwindSafe(|| task.run())).is_err() {
                warn!("Scheduled task panicked");
            }
        }
    }

    async fn fire(self: &Arc<Self>, entry: ScheduledCommand) {
        let server = self.server_of(&entry.chat);
        let resolved = self
            .registry
            .read()
            .resolve(&entry.command, &entry.chat, server.as_ref());
        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(id = entry.id, command = %entry.command, error = %e, "Scheduled command no longer resolves");
                metrics::record_command_error(&entry.command, e.error_code());
                return;
            }
        };
        if let Resolved::Alias(alias) = &resolved {
            debug!(id = entry.id, alias = %alias.name, "Scheduled alias expanded");
        }

        info!(id = entry.id, command = %entry.command, chat = %entry.chat, "Running scheduled command");
        metrics::record_scheduler_fired();
        let data = resolved.into_command_data(entry.args);
        self.run_command(&entry.chat, &entry.sender, data).await;
    }

    /// Drive [`Engine::tick`] on the configured interval until shutdown.
    pub fn spawn_scheduler(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(engine.config.scheduler.tick_interval());
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period = ?engine.config.scheduler.tick_interval(), "Scheduler started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        engine.tick(Utc::now()).instrument(spans::scheduler_tick()).await;
                    }
                    _ = engine.wait_for_shutdown() => {
                        info!("Scheduler stopping");
                        break;
                    }
                }
            }
        })
    }
}
