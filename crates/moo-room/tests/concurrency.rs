//! Racing requests against one game.
//!
//! `Interleaved` yields to the scheduler before every store call, so two
//! operations driven by `tokio::join!` advance in lockstep: both finish
//! their reads before either writes. The store's unique indexes and
//! conditional updates must then pick exactly one winner.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use moo_core::{
    EventKind, Game, GameId, GameStatus, Move, PlayerSlot, Room, RoomCode, RoomId, UserId,
};
use moo_room::{GameConfig, GameError, GameRef, GameService, Notifier, Subscription};
use moo_store::{MemoryStore, RoomUpdate, Store, StoreError};
use tokio::task::yield_now;

// =========================================================================
// Interleaving store
// =========================================================================

#[derive(Default)]
struct Interleaved {
    inner: MemoryStore,
    // The next this-many room inserts fail as if the code were taken.
    room_conflicts: AtomicU32,
}

impl Interleaved {
    fn with_room_conflicts(n: u32) -> Self {
        Self {
            room_conflicts: AtomicU32::new(n),
            ..Self::default()
        }
    }
}

impl Store for Interleaved {
    async fn insert_room(&self, room: &Room) -> Result<(), StoreError> {
        yield_now().await;
        let forced = self
            .room_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced {
            return Err(StoreError::Conflict(format!("room code {} taken", room.code)));
        }
        self.inner.insert_room(room).await
    }

    async fn room_by_id(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        yield_now().await;
        self.inner.room_by_id(id).await
    }

    async fn room_by_code(&self, code: &RoomCode) -> Result<Option<Room>, StoreError> {
        yield_now().await;
        self.inner.room_by_code(code).await
    }

    async fn update_room(
        &self,
        id: RoomId,
        update: RoomUpdate,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        yield_now().await;
        self.inner.update_room(id, update, now).await
    }

    async fn stale_rooms(&self, before: DateTime<Utc>) -> Result<Vec<Room>, StoreError> {
        yield_now().await;
        self.inner.stale_rooms(before).await
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool, StoreError> {
        yield_now().await;
        self.inner.delete_room(id).await
    }

    async fn insert_game(&self, game: &Game) -> Result<(), StoreError> {
        yield_now().await;
        self.inner.insert_game(game).await
    }

    async fn game_by_id(&self, id: GameId) -> Result<Option<Game>, StoreError> {
        yield_now().await;
        self.inner.game_by_id(id).await
    }

    async fn game_by_room(&self, room_id: RoomId) -> Result<Option<Game>, StoreError> {
        yield_now().await;
        self.inner.game_by_room(room_id).await
    }

    async fn games_for_user(&self, user: &UserId) -> Result<Vec<Game>, StoreError> {
        yield_now().await;
        self.inner.games_for_user(user).await
    }

    async fn set_player_code(
        &self,
        id: GameId,
        slot: PlayerSlot,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        yield_now().await;
        self.inner.set_player_code(id, slot, code, now).await
    }

    async fn start_game_if_ready(&self, id: GameId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        yield_now().await;
        self.inner.start_game_if_ready(id, now).await
    }

    async fn advance_round(
        &self,
        id: GameId,
        from: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        yield_now().await;
        self.inner.advance_round(id, from, now).await
    }

    async fn finish_game(
        &self,
        id: GameId,
        winner: &UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        yield_now().await;
        self.inner.finish_game(id, winner, now).await
    }

    async fn insert_move(&self, mv: &Move) -> Result<(), StoreError> {
        yield_now().await;
        self.inner.insert_move(mv).await
    }

    async fn move_for(
        &self,
        game_id: GameId,
        player: &UserId,
        round: u32,
    ) -> Result<Option<Move>, StoreError> {
        yield_now().await;
        self.inner.move_for(game_id, player, round).await
    }

    async fn count_moves(&self, game_id: GameId, round: u32) -> Result<u32, StoreError> {
        yield_now().await;
        self.inner.count_moves(game_id, round).await
    }

    async fn moves_for_game(&self, game_id: GameId) -> Result<Vec<Move>, StoreError> {
        yield_now().await;
        self.inner.moves_for_game(game_id).await
    }
}

// =========================================================================
// Helpers
// =========================================================================

const ALICE_CODE: &str = "0123";
const BOB_CODE: &str = "4501";

fn service() -> GameService<Interleaved> {
    GameService::new(Interleaved::default(), Notifier::new(), GameConfig::default())
}

/// Alice and Bob in a `playing` game, round 1.
async fn playing(svc: &GameService<Interleaved>) -> (RoomId, GameId) {
    let created = svc.create_room(&UserId::new("alice")).await.unwrap();
    let joined = svc
        .join_room(&UserId::new("bob"), created.code.as_str())
        .await
        .unwrap();
    let game = GameRef::Id(joined.game_id.unwrap());
    svc.set_player_code(&UserId::new("alice"), &game, ALICE_CODE).await.unwrap();
    svc.set_player_code(&UserId::new("bob"), &game, BOB_CODE).await.unwrap();
    (created.room_id, joined.game_id.unwrap())
}

fn kinds(sub: &mut Subscription) -> Vec<EventKind> {
    std::iter::from_fn(|| sub.try_recv()).map(|e| e.kind).collect()
}

// =========================================================================
// Races
// =========================================================================

#[tokio::test]
async fn test_join_room_race_second_joiner_gets_room_full() {
    let svc = service();
    let created = svc.create_room(&UserId::new("alice")).await.unwrap();
    let mut sub = svc.subscribe(created.room_id);
    let code = created.code.as_str();

    let (bob, eve) = (UserId::new("bob"), UserId::new("eve"));
    let (a, b) = tokio::join!(svc.join_room(&bob, code), svc.join_room(&eve, code));

    let (winner, loser) = match (a, b) {
        (Ok(_), Err(e)) => (bob, e),
        (Err(e), Ok(_)) => (eve, e),
        other => panic!("expected exactly one join to succeed, got {other:?}"),
    };
    assert!(matches!(loser, GameError::RoomFull(_)), "{loser:?}");

    let game = svc.store().game_by_room(created.room_id).await.unwrap().unwrap();
    assert_eq!(game.player2_id, winner);
    assert_eq!(kinds(&mut sub), vec![EventKind::GameStarted]);
}

#[tokio::test]
async fn test_set_player_code_race_starts_game_once() {
    let svc = service();
    let created = svc.create_room(&UserId::new("alice")).await.unwrap();
    let joined = svc
        .join_room(&UserId::new("bob"), created.code.as_str())
        .await
        .unwrap();
    let game = GameRef::Id(joined.game_id.unwrap());
    let mut sub = svc.subscribe(created.room_id);

    let (alice, bob) = (UserId::new("alice"), UserId::new("bob"));
    let (a, b) = tokio::join!(
        svc.set_player_code(&alice, &game, ALICE_CODE),
        svc.set_player_code(&bob, &game, BOB_CODE),
    );
    a.unwrap();
    b.unwrap();

    let state = svc.game_state(&alice, &game).await.unwrap();
    assert_eq!(state.game.status, GameStatus::Playing);
    assert_eq!(kinds(&mut sub), vec![EventKind::GameStarted]);
}

#[tokio::test]
async fn test_make_guess_race_same_player_gets_already_guessed() {
    let svc = service();
    let (_, game_id) = playing(&svc).await;
    let game = GameRef::Id(game_id);

    let alice = UserId::new("alice");
    let (a, b) = tokio::join!(
        svc.make_guess(&alice, &game, "5432"),
        svc.make_guess(&alice, &game, "5431"),
    );

    let loser = match (a, b) {
        (Ok(_), Err(e)) | (Err(e), Ok(_)) => e,
        other => panic!("expected exactly one guess to land, got {other:?}"),
    };
    assert!(
        matches!(loser, GameError::AlreadyGuessed { round: 1, .. }),
        "{loser:?}"
    );
    assert_eq!(svc.store().count_moves(game_id, 1).await.unwrap(), 1);

    let stored = svc.store().game_by_id(game_id).await.unwrap().unwrap();
    assert_eq!(stored.current_round, 1);
}

#[tokio::test]
async fn test_make_guess_race_both_players_advance_round_once() {
    let svc = service();
    let (room_id, game_id) = playing(&svc).await;
    let game = GameRef::Id(game_id);
    let mut sub = svc.subscribe(room_id);
    let (alice, bob) = (UserId::new("alice"), UserId::new("bob"));

    for round in 1..=3 {
        let (a, b) = tokio::join!(
            svc.make_guess(&alice, &game, "5432"),
            svc.make_guess(&bob, &game, "3210"),
        );
        assert!(!a.unwrap().is_win);
        assert!(!b.unwrap().is_win);

        let stored = svc.store().game_by_id(game_id).await.unwrap().unwrap();
        assert_eq!(stored.current_round, round + 1);
        assert_eq!(svc.store().count_moves(game_id, round).await.unwrap(), 2);
    }

    assert_eq!(kinds(&mut sub), vec![EventKind::MoveMade; 6]);
}

#[tokio::test]
async fn test_make_guess_race_two_winning_guesses_one_winner() {
    let svc = service();
    let (room_id, game_id) = playing(&svc).await;
    let game = GameRef::Id(game_id);
    let mut sub = svc.subscribe(room_id);
    let (alice, bob) = (UserId::new("alice"), UserId::new("bob"));

    let (a, b) = tokio::join!(
        svc.make_guess(&alice, &game, BOB_CODE),
        svc.make_guess(&bob, &game, ALICE_CODE),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!((a.bulls, b.bulls), (4, 4));
    assert!(a.is_win ^ b.is_win, "exactly one winner: {a:?} {b:?}");

    let winner = if a.is_win { alice } else { bob };
    let stored = svc.store().game_by_id(game_id).await.unwrap().unwrap();
    assert_eq!(stored.status, GameStatus::Finished);
    assert_eq!(stored.winner_id, Some(winner));
    assert_eq!(svc.store().moves_for_game(game_id).await.unwrap().len(), 2);
    assert_eq!(kinds(&mut sub), vec![EventKind::GameFinished]);
}

// =========================================================================
// Room code collisions
// =========================================================================

#[tokio::test]
async fn test_create_room_retries_after_insert_conflict() {
    let svc = GameService::new(
        Interleaved::with_room_conflicts(2),
        Notifier::new(),
        GameConfig::default(),
    );
    let created = svc.create_room(&UserId::new("alice")).await.unwrap();

    let room = svc.store().room_by_id(created.room_id).await.unwrap().unwrap();
    assert_eq!(room.code, created.code);
    assert_eq!(svc.store().room_conflicts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_create_room_insert_conflicts_exhaust_attempts() {
    let config = GameConfig {
        code_attempts: 2,
        ..GameConfig::default()
    };
    let svc = GameService::new(Interleaved::with_room_conflicts(2), Notifier::new(), config);

    let err = svc.create_room(&UserId::new("alice")).await.unwrap_err();
    assert!(matches!(err, GameError::CodeSpaceExhausted(2)), "{err:?}");
}
