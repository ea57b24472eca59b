//! Scheduling handlers: SCHEDULE, UNSCHEDULE, EVENTS, ALLEVENTS

use super::{CommandHandler, Context, HandlerResult};
use crate::engine::Engine;
use crate::error::DispatchError;
use crate::scheduler::ScheduledCommand;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use convergence_proto::parse_command;
use regex::Regex;
use std::sync::OnceLock;

/// `<amount><unit>` pairs such as `5 seconds` or `2h`.
fn duration_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*([a-z]+)").ok()).as_ref()
}

fn unit_seconds(unit: &str) -> Option<i64> {
    Some(match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => 60,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600,
        "d" | "day" | "days" => 86_400,
        "w" | "week" | "weeks" => 604_800,
        _ => return None,
    })
}

/// Text allowed between duration parts.
fn is_separator(gap: &str) -> bool {
    matches!(
        gap.trim_matches(|c: char| c.is_whitespace() || c == ','),
        "" | "and"
    )
}

fn relative_duration(text: &str) -> Option<Duration> {
    let re = duration_regex()?;
    let mut total = Duration::zero();
    let mut last = 0;
    let mut found = false;

    for caps in re.captures_iter(text) {
        let whole = caps.get(0)?;
        if !is_separator(&text[last..whole.start()]) {
            return None;
        }
        let amount: i64 = caps[1].parse().ok()?;
        let seconds = amount.checked_mul(unit_seconds(&caps[2])?)?;
        total = total.checked_add(&Duration::try_seconds(seconds)?)?;
        last = whole.end();
        found = true;
    }

    (found && is_separator(&text[last..])).then_some(total)
}

/// Parse a time expression relative to `now`.
///
/// Accepts RFC 3339 timestamps and durations like `5 seconds`,
/// `in 2h 30m` or `1 day and 3 hours`.
///
/// ```
/// use chrono::{Duration, Utc};
/// use convergence::handlers::parse_time;
///
/// let now = Utc::now();
/// assert_eq!(parse_time("in 2h 30m", now), Some(now + Duration::minutes(150)));
/// assert_eq!(parse_time("whenever", now), None);
/// ```
pub fn parse_time(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Some(time.with_timezone(&Utc));
    }
    let lower = text.to_lowercase();
    let relative = lower.strip_prefix("in ").unwrap_or(&lower);
    now.checked_add_signed(relative_duration(relative)?)
}

/// Quote `arg` so it parses back as one argument with the same text.
fn quote_arg(arg: &str) -> String {
    let needs_quotes = arg.is_empty()
        || arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\');
    if !needs_quotes {
        return arg.to_string();
    }
    let escaped = arg.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Parse the words after the time as a command for `ctx`'s chat and check
/// it resolves.
///
/// A single word is parsed as command text, so `"echo a b"` works quoted.
/// Several words keep their boundaries.
fn parse_target(ctx: &Context<'_>, words: &[String]) -> Result<Option<(String, Vec<String>)>, DispatchError> {
    let text = match words {
        [text] => text.clone(),
        _ => words.iter().map(|w| quote_arg(w)).collect::<Vec<_>>().join(" "),
    };
    let delimiter = ctx.delimiter();
    let text = if text.starts_with(&delimiter) {
        text
    } else {
        format!("{}{}", delimiter, text)
    };
    let Some(parsed) = parse_command(&text, &delimiter)? else {
        return Ok(None);
    };
    let server = ctx.server();
    ctx.engine
        .registry()
        .resolve(&parsed.name, ctx.chat, server.as_ref())?;
    Ok(Some((parsed.name, parsed.args)))
}

/// Handler for the SCHEDULE command.
///
/// `schedule <time> <command...>`
///
/// The command runs in this chat, as the sender, once the time comes.
pub struct ScheduleHandler;

#[async_trait]
impl CommandHandler for ScheduleHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let (Some(when), true) = (ctx.arg(0), ctx.args.len() > 1) else {
            return Ok(Some(ctx.usage()));
        };
        let now = Utc::now();
        let Some(time) = parse_time(when, now) else {
            return Ok(Some(format!("Could not understand the time \"{}\".", when)));
        };
        if time < now {
            return Ok(Some("That time has already passed.".to_string()));
        }

        let (name, args) = match parse_target(ctx, &ctx.args[1..]) {
            Ok(Some(target)) => target,
            Ok(None) => return Ok(Some(format!("\"{}\" is not a command.", ctx.joined(1)))),
            Err(e) => return Ok(Some(e.user_reply())),
        };
        Ok(Some(ctx.engine.schedule(ctx.chat, ctx.sender, &name, args, time)))
    }
}

/// Handler for the UNSCHEDULE command.
///
/// `unschedule <id>`
pub struct UnscheduleHandler;

#[async_trait]
impl CommandHandler for UnscheduleHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let Some(id) = ctx.arg(0).and_then(|arg| arg.parse::<u64>().ok()) else {
            return Ok(Some(ctx.usage()));
        };
        let reply = if ctx.engine.unschedule(id) {
            format!("Unscheduled command {}.", id)
        } else {
            format!("No scheduled command has id {}.", id)
        };
        Ok(Some(reply))
    }
}

fn event_line(engine: &Engine, entry: &ScheduledCommand) -> String {
    format!(
        "{}: \"{}\" at {} in {}",
        entry.id,
        entry.invocation(),
        crate::engine::format_time(&entry.time),
        engine.chat_name(&entry.chat)
    )
}

fn event_list(engine: &Engine, entries: &[ScheduledCommand], empty: &str) -> String {
    if entries.is_empty() {
        return empty.to_string();
    }
    entries
        .iter()
        .map(|entry| event_line(engine, entry))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Handler for the EVENTS command.
///
/// Lists the sender's own scheduled commands.
pub struct EventsHandler;

#[async_trait]
impl CommandHandler for EventsHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let entries = ctx.engine.scheduled_commands(Some(ctx.sender));
        Ok(Some(event_list(
            ctx.engine,
            &entries,
            "You have no scheduled commands.",
        )))
    }
}

/// Handler for the ALLEVENTS command.
pub struct AllEventsHandler;

#[async_trait]
impl CommandHandler for AllEventsHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let entries = ctx.engine.scheduled_commands(None);
        Ok(Some(event_list(
            ctx.engine,
            &entries,
            "There are no scheduled commands.",
        )))
    }
}
