//! TIMER handler: named stopwatches shared by everyone talking to the bot.

use super::{CommandHandler, Context, HandlerResult};
use async_trait::async_trait;
use chrono::{Duration, Utc};

/// `1d 2h 3m 4s`, leaving out zero parts.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let parts = [
        (total / 86_400, "d"),
        (total % 86_400 / 3600, "h"),
        (total % 3600 / 60, "m"),
        (total % 60, "s"),
    ];
    let text: Vec<String> = parts
        .iter()
        .filter(|(amount, _)| *amount > 0)
        .map(|(amount, unit)| format!("{}{}", amount, unit))
        .collect();
    if text.is_empty() {
        "0s".to_string()
    } else {
        text.join(" ")
    }
}

/// Handler for the TIMER command.
///
/// `timer start|check|stop <name>`
pub struct TimerHandler;

#[async_trait]
impl CommandHandler for TimerHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let (Some(action), Some(name)) = (ctx.arg(0), ctx.arg(1)) else {
            return Ok(Some(ctx.usage()));
        };
        let now = Utc::now();
        let engine = ctx.engine;

        let reply = match action.to_lowercase().as_str() {
            "start" if engine.start_timer(name, now) => format!("Timer \"{}\" started.", name),
            "start" => format!("Timer \"{}\" is already running.", name),
            "check" => match engine.check_timer(name, now) {
                Some(elapsed) => format!("Timer \"{}\": {}", name, format_duration(elapsed)),
                None => format!("No timer named \"{}\".", name),
            },
            "stop" => match engine.stop_timer(name, now) {
                Some(elapsed) => format!(
                    "Timer \"{}\" stopped after {}.",
                    name,
                    format_duration(elapsed)
                ),
                None => format!("No timer named \"{}\".", name),
            },
            _ => ctx.usage(),
        };
        Ok(Some(reply))
    }
}
