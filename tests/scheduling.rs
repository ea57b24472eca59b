//! Scheduled commands driven through the chat interface.

mod common;

use chrono::{Duration, Utc};
use common::TestBot;

#[tokio::test]
async fn test_scheduled_command_fires_once() {
    let bot = TestBot::new();
    let reply = bot.reply("alice", "!schedule 5s echo hi %sender").await;
    // The confirmation is substituted like any other reply; the stored
    // arguments are not.
    assert!(reply.starts_with("Scheduled \"echo hi alice\" (id 0) for "), "{reply}");

    let entry = bot.engine.scheduled_commands(None).remove(0);
    assert_eq!(entry.command, "echo");
    assert_eq!(entry.args, vec!["hi", "%sender"]);
    assert_eq!(entry.sender.name, "alice");

    // Not yet due.
    bot.engine.tick(entry.time - Duration::seconds(1)).await;
    assert!(bot.console.take_sent().is_empty());

    bot.engine.tick(entry.time).await;
    let sent: Vec<_> = bot.console.take_sent().into_iter().map(|m| m.text).collect();
    assert_eq!(sent, vec!["hi alice"]);

    bot.engine.tick(entry.time + Duration::seconds(1)).await;
    assert!(bot.console.take_sent().is_empty());
    assert!(bot.engine.scheduled_commands(None).is_empty());
}

#[tokio::test]
async fn test_late_command_is_dropped() {
    let bot = TestBot::new();
    let time = Utc::now() + Duration::seconds(5);
    bot.engine
        .schedule(&bot.main(), &bot.console.user("alice"), "echo", vec!["late".to_string()], time);

    bot.engine.tick(time + Duration::seconds(60)).await;
    assert!(bot.console.take_sent().is_empty());
    assert!(bot.engine.scheduled_commands(None).is_empty());
}

#[tokio::test]
async fn test_scheduled_alias_is_expanded_when_fired() {
    let bot = TestBot::new();
    bot.reply("alice", "!alias greet echo Hello").await;
    bot.reply("alice", "!schedule 1m greet Bob").await;

    let entry = bot.engine.scheduled_commands(None).remove(0);
    assert_eq!(entry.command, "greet");
    bot.engine.tick(entry.time).await;
    let sent: Vec<_> = bot.console.take_sent().into_iter().map(|m| m.text).collect();
    assert_eq!(sent, vec!["Hello Bob"]);
}

#[tokio::test]
async fn test_unschedule_and_events() {
    let bot = TestBot::new();
    bot.reply("alice", "!schedule 1h echo one").await;
    bot.reply("bob", "!schedule 2h echo two").await;

    let mine = bot.reply("alice", "!events").await;
    assert!(mine.contains("\"echo one\""));
    assert!(!mine.contains("\"echo two\""));

    let all = bot.reply("alice", "!allevents").await;
    assert!(all.contains("\"echo one\"") && all.contains("\"echo two\""));

    assert_eq!(bot.reply("alice", "!unschedule 0").await, "Unscheduled command 0.");
    assert_eq!(
        bot.reply("alice", "!unschedule 0").await,
        "No scheduled command has id 0."
    );
    assert_eq!(bot.engine.scheduled_commands(None).len(), 1);
}

#[tokio::test]
async fn test_schedule_rejects_bad_input() {
    let bot = TestBot::new();
    assert_eq!(
        bot.reply("alice", "!schedule soon echo hi").await,
        "Could not understand the time \"soon\"."
    );
    assert_eq!(
        bot.reply("alice", "!schedule 5s nope").await,
        "No command exists with name \"nope\"."
    );
    assert!(bot.engine.scheduled_commands(None).is_empty());
}
