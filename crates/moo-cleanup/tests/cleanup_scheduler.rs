//! Integration tests for the cleanup sweep and its scheduler.
//!
//! Loop tests run with paused Tokio time so the interval fires as soon
//! as the runtime is idle. Room deadlines are set relative to the wall
//! clock, which the sweep reads.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use moo_cleanup::{CleanupConfig, CleanupScheduler};
use moo_core::{Game, Move, MoveId, PlayerSlot, Room, RoomCode, RoomId, RoomStatus, UserId};
use moo_store::{MemoryStore, Store};

// =========================================================================
// Helpers
// =========================================================================

fn scheduler() -> (Arc<MemoryStore>, CleanupScheduler<Arc<MemoryStore>>) {
    let store = Arc::new(MemoryStore::new());
    let scheduler = CleanupScheduler::new(Arc::clone(&store), CleanupConfig::default());
    (store, scheduler)
}

async fn seed_room(
    store: &MemoryStore,
    code: &str,
    status: RoomStatus,
    empty_at: DateTime<Utc>,
) -> RoomId {
    let room = Room {
        id: RoomId::new(),
        code: RoomCode::new(code),
        created_by: UserId::new("alice"),
        status,
        empty_at,
        created_at: empty_at,
        updated_at: empty_at,
    };
    store.insert_room(&room).await.unwrap();
    room.id
}

/// Adds a game to the room and drives it to `playing`, optionally on to
/// `finished`.
async fn seed_game(store: &MemoryStore, room_id: RoomId, finished: bool) -> Game {
    let now = Utc::now();
    let game = Game::new(room_id, UserId::new("alice"), UserId::new("bob"), now);
    store.insert_game(&game).await.unwrap();
    store.set_player_code(game.id, PlayerSlot::One, "0123", now).await.unwrap();
    store.set_player_code(game.id, PlayerSlot::Two, "4501", now).await.unwrap();
    store.start_game_if_ready(game.id, now).await.unwrap();
    store
        .insert_move(&Move {
            id: MoveId::new(),
            game_id: game.id,
            player_id: UserId::new("alice"),
            round: 1,
            guess: "4501".into(),
            bulls: 4,
            cows: 0,
            created_at: now,
        })
        .await
        .unwrap();
    if finished {
        store.finish_game(game.id, &UserId::new("alice"), now).await.unwrap();
    }
    game
}

fn minutes_ago(m: i64) -> DateTime<Utc> {
    Utc::now() - TimeDelta::minutes(m)
}

// =========================================================================
// Sweep
// =========================================================================

#[tokio::test]
async fn test_sweep_deletes_stale_waiting_room() {
    let (store, scheduler) = scheduler();
    let room_id = seed_room(&store, "OLDD", RoomStatus::Waiting, minutes_ago(10)).await;

    let report = scheduler.sweep_once().await.unwrap();
    assert_eq!((report.candidates, report.deleted, report.skipped), (1, 1, 0));
    assert!(store.room_by_id(room_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sweep_leaves_recent_and_busy_rooms() {
    let (store, scheduler) = scheduler();
    let recent = seed_room(&store, "NEWW", RoomStatus::Waiting, minutes_ago(2)).await;
    let held = seed_room(&store, "HELD", RoomStatus::Waiting, Utc::now() + TimeDelta::hours(24)).await;
    let playing = seed_room(&store, "PLAY", RoomStatus::Playing, minutes_ago(60)).await;
    let finished = seed_room(&store, "FINI", RoomStatus::Finished, minutes_ago(60)).await;

    let report = scheduler.sweep_once().await.unwrap();
    assert_eq!(report.candidates, 0);
    for id in [recent, held, playing, finished] {
        assert!(store.room_by_id(id).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn test_sweep_skips_room_with_playing_game() {
    let (store, scheduler) = scheduler();
    let room_id = seed_room(&store, "BUSY", RoomStatus::Waiting, minutes_ago(10)).await;
    let game = seed_game(&store, room_id, false).await;

    let report = scheduler.sweep_once().await.unwrap();
    assert_eq!((report.candidates, report.deleted, report.skipped), (1, 0, 1));
    assert!(store.room_by_id(room_id).await.unwrap().is_some());
    assert!(store.game_by_id(game.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_sweep_cascades_finished_game_and_moves() {
    let (store, scheduler) = scheduler();
    let room_id = seed_room(&store, "DONE", RoomStatus::Waiting, minutes_ago(10)).await;
    let game = seed_game(&store, room_id, true).await;

    let report = scheduler.sweep_once().await.unwrap();
    assert_eq!(report.deleted, 1);
    assert!(store.game_by_id(game.id).await.unwrap().is_none());
    assert!(store.moves_for_game(game.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sweep_at_uses_given_clock() {
    let (store, scheduler) = scheduler();
    let room_id = seed_room(&store, "SOON", RoomStatus::Waiting, Utc::now()).await;

    let report = scheduler.sweep_at(Utc::now()).await.unwrap();
    assert_eq!(report.deleted, 0);

    let later = Utc::now() + TimeDelta::minutes(6);
    let report = scheduler.sweep_at(later).await.unwrap();
    assert_eq!(report.deleted, 1);
    assert!(store.room_by_id(room_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_metrics_accumulate_across_sweeps() {
    let (store, scheduler) = scheduler();
    seed_room(&store, "AAAA", RoomStatus::Waiting, minutes_ago(10)).await;
    let busy = seed_room(&store, "BBBB", RoomStatus::Waiting, minutes_ago(10)).await;
    seed_game(&store, busy, false).await;

    scheduler.sweep_once().await.unwrap();
    scheduler.sweep_once().await.unwrap();

    let m = scheduler.metrics();
    assert_eq!(m.sweeps, 2);
    assert_eq!(m.rooms_deleted, 1);
    assert_eq!(m.rooms_skipped, 2);
    assert_eq!(m.failures, 0);
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_start_sweeps_immediately_then_every_interval() {
    let (store, scheduler) = scheduler();
    seed_room(&store, "OLDD", RoomStatus::Waiting, minutes_ago(10)).await;

    assert!(scheduler.start());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(scheduler.metrics().sweeps, 1);
    assert_eq!(scheduler.metrics().rooms_deleted, 1);

    tokio::time::sleep(scheduler.config().interval).await;
    assert_eq!(scheduler.metrics().sweeps, 2);

    assert!(scheduler.stop().await);
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_is_noop() {
    let (_, scheduler) = scheduler();
    assert!(scheduler.start());
    assert!(!scheduler.start());
    assert!(scheduler.is_running());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(scheduler.metrics().sweeps, 1);

    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent_and_halts_sweeps() {
    let (_, scheduler) = scheduler();
    assert!(!scheduler.stop().await);

    scheduler.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(scheduler.stop().await);
    assert!(!scheduler.is_running());
    assert!(!scheduler.stop().await);

    let before = scheduler.metrics().sweeps;
    tokio::time::sleep(scheduler.config().interval * 3).await;
    assert_eq!(scheduler.metrics().sweeps, before);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop() {
    let (_, scheduler) = scheduler();
    scheduler.start();
    scheduler.stop().await;

    assert!(scheduler.start());
    assert!(scheduler.is_running());
    scheduler.stop().await;
}
