//! Dispatch, scheduling and the scheduler tick running on several threads
//! at once against one engine.

use chrono::{Duration, Utc};
use convergence::config::Config;
use convergence::engine::Engine;
use convergence::handlers::register_defaults;
use convergence::store::{JsonFileStore, Store};
use convergence::testing::RecordingBackend;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;

const WORKERS: u32 = 8;
const ROUNDS: u32 = 25;
const ROOMS: u32 = 4;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_dispatch_and_ticks_stay_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
    let engine = Engine::new(Config::default(), store.clone());
    register_defaults(&engine);
    let console = Arc::new(RecordingBackend::new("Console"));
    engine.register_backend(console.clone());
    let start = Utc::now();

    let mut tasks = JoinSet::new();
    for worker in 0..WORKERS {
        let engine = Arc::clone(&engine);
        let console = Arc::clone(&console);
        tasks.spawn(async move {
            let chat = console.chat(&format!("room{}", worker % ROOMS));
            let user = console.user(&format!("user{worker}"));
            let timer = format!("t{worker}");

            for round in 0..ROUNDS {
                let alias = format!("a{worker}x{round}");
                engine
                    .received_message(&chat, &format!("!alias {alias} echo {round}"), &user)
                    .await;
                engine.received_message(&chat, &format!("!{alias} go"), &user).await;
                if round % 3 == 0 {
                    engine.received_message(&chat, &format!("!unalias {alias}"), &user).await;
                }

                let when = start + Duration::seconds(i64::from(round % 5));
                engine.schedule(&chat, &user, "echo", vec![format!("w{worker}r{round}")], when);
                if round % 4 == 0 {
                    engine.unschedule(u64::from(worker * ROUNDS + round) / 2);
                }

                let other = console.chat(&format!("room{}", (worker + round) % ROOMS));
                if round % 2 == 0 {
                    engine.link(&chat, &other);
                } else {
                    engine.unlink(&chat, &other);
                }

                if !engine.start_timer(&timer, Utc::now()) {
                    engine.stop_timer(&timer, Utc::now());
                }
                tokio::task::yield_now().await;
            }
        });
    }

    let ticker = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            for step in 0..60 {
                engine.tick(start + Duration::milliseconds(step * 100)).await;
                tokio::task::yield_now().await;
            }
        })
    };

    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }
    ticker.await.unwrap();

    // Aliases: every one not removed by its own worker survives.
    let removed_per_worker = (0..ROUNDS).filter(|round| round % 3 == 0).count();
    let expected = WORKERS as usize * (ROUNDS as usize - removed_per_worker);
    assert_eq!(engine.registry().all_aliases().len(), expected);

    // Scheduler: ids unique, entries in fire-time order.
    let scheduled = engine.scheduled_commands(None);
    let ids: BTreeSet<u64> = scheduled.iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), scheduled.len());
    assert!(scheduled.windows(2).all(|pair| pair[0].time <= pair[1].time));

    // Links stay symmetric.
    for room in 0..ROOMS {
        let chat = console.chat(&format!("room{room}"));
        for linked in engine.linked_chats(&chat) {
            assert!(engine.linked_chats(&linked).contains(&chat), "{chat} -> {linked}");
        }
    }

    // The last save reflects the final state.
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.scheduled, scheduled);
    assert_eq!(store.load().unwrap(), snapshot);
    assert!(!dir.path().join("state.json.tmp").exists());
}

#[test]
fn test_saves_from_many_threads_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
    let engine = Engine::new(Config::default(), store.clone());
    let console = RecordingBackend::new("Console");

    std::thread::scope(|scope| {
        for worker in 0..WORKERS {
            let engine = &engine;
            let console = &console;
            scope.spawn(move || {
                let chat = console.chat(&format!("room{worker}"));
                for round in 0..50 {
                    engine.link(&chat, &console.chat(&format!("peer{round}")));
                }
            });
        }
    });

    let snapshot = store.load().unwrap();
    assert_eq!(snapshot, engine.snapshot());
    assert_eq!(snapshot.links.len(), WORKERS as usize + 50);
}
