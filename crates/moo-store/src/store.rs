//! The [`Store`] trait: everything the game layer needs from persistence.
//!
//! The game layer takes no locks of its own. Every check-then-write it
//! performs is backed by one of the atomic primitives below, so two
//! concurrent requests against the same game can never both win:
//!
//! - unique inserts ([`insert_room`](Store::insert_room),
//!   [`insert_game`](Store::insert_game), [`insert_move`](Store::insert_move))
//!   fail with [`StoreError::Conflict`];
//! - conditional updates ([`set_player_code`](Store::set_player_code),
//!   [`start_game_if_ready`](Store::start_game_if_ready),
//!   [`advance_round`](Store::advance_round),
//!   [`finish_game`](Store::finish_game)) return `false` when their
//!   precondition no longer holds.

use std::future::Future;

use chrono::{DateTime, Utc};
use moo_core::{Game, GameId, Move, PlayerSlot, Room, RoomCode, RoomId, RoomStatus, UserId};

use crate::StoreError;

/// Fields of a room that can change after creation. `None` leaves the
/// column untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoomUpdate {
    pub status: Option<RoomStatus>,
    pub empty_at: Option<DateTime<Utc>>,
}

impl RoomUpdate {
    pub fn status(mut self, status: RoomStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn empty_at(mut self, at: DateTime<Utc>) -> Self {
        self.empty_at = Some(at);
        self
    }
}

/// Persistent storage for rooms, games and moves.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static`: one store is shared by every request task
///   and by the cleanup scheduler.
/// - Returned futures are `Send` so callers can hold them across
///   `tokio::spawn`.
///
/// Deleting a room deletes its game, and deleting a game deletes its
/// moves.
pub trait Store: Send + Sync + 'static {
    // -- Rooms --

    /// Inserts a new room. `Conflict` if its code is taken.
    fn insert_room(&self, room: &Room) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn room_by_id(
        &self,
        id: RoomId,
    ) -> impl Future<Output = Result<Option<Room>, StoreError>> + Send;

    fn room_by_code(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<Option<Room>, StoreError>> + Send;

    /// Applies `update` and bumps `updated_at`. Returns `false` if the
    /// room does not exist.
    fn update_room(
        &self,
        id: RoomId,
        update: RoomUpdate,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Rooms with status `waiting` whose `empty_at` is before `before`,
    /// oldest first.
    fn stale_rooms(
        &self,
        before: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Room>, StoreError>> + Send;

    /// Deletes a room with its game and moves. Returns `false` if it was
    /// already gone.
    fn delete_room(&self, id: RoomId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    // -- Games --

    /// Inserts a new game. `Conflict` if the room already has one.
    fn insert_game(&self, game: &Game) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn game_by_id(
        &self,
        id: GameId,
    ) -> impl Future<Output = Result<Option<Game>, StoreError>> + Send;

    fn game_by_room(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<Option<Game>, StoreError>> + Send;

    /// Games where `user` is either player, most recently updated first.
    fn games_for_user(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<Game>, StoreError>> + Send;

    /// Writes the secret code for `slot`, only while the game is in
    /// `code_selection`. Returns whether a row was written.
    fn set_player_code(
        &self,
        id: GameId,
        slot: PlayerSlot,
        code: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Moves the game from `code_selection` to `playing` if both codes are
    /// set. Returns whether this call made the transition.
    fn start_game_if_ready(
        &self,
        id: GameId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Increments `current_round` if the game is `playing` and still on
    /// round `from`. Returns whether this call advanced it.
    fn advance_round(
        &self,
        id: GameId,
        from: u32,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Moves the game from `playing` to `finished` with `winner`, who must
    /// be one of its players. Returns whether this call finished it.
    fn finish_game(
        &self,
        id: GameId,
        winner: &UserId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    // -- Moves --

    /// Inserts a move. `Conflict` if the player already moved this round.
    fn insert_move(&self, mv: &Move) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn move_for(
        &self,
        game_id: GameId,
        player: &UserId,
        round: u32,
    ) -> impl Future<Output = Result<Option<Move>, StoreError>> + Send;

    fn count_moves(
        &self,
        game_id: GameId,
        round: u32,
    ) -> impl Future<Output = Result<u32, StoreError>> + Send;

    /// Every move of a game, ordered by round then insertion.
    fn moves_for_game(
        &self,
        game_id: GameId,
    ) -> impl Future<Output = Result<Vec<Move>, StoreError>> + Send;
}

// An `Arc<S>` is a store too, so one backend can be handed to both the
// game service and the cleanup scheduler.
impl<S: Store> Store for std::sync::Arc<S> {
    fn insert_room(&self, room: &Room) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).insert_room(room)
    }

    fn room_by_id(
        &self,
        id: RoomId,
    ) -> impl Future<Output = Result<Option<Room>, StoreError>> + Send {
        (**self).room_by_id(id)
    }

    fn room_by_code(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<Option<Room>, StoreError>> + Send {
        (**self).room_by_code(code)
    }

    fn update_room(
        &self,
        id: RoomId,
        update: RoomUpdate,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).update_room(id, update, now)
    }

    fn stale_rooms(
        &self,
        before: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Room>, StoreError>> + Send {
        (**self).stale_rooms(before)
    }

    fn delete_room(&self, id: RoomId) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).delete_room(id)
    }

    fn insert_game(&self, game: &Game) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).insert_game(game)
    }

    fn game_by_id(
        &self,
        id: GameId,
    ) -> impl Future<Output = Result<Option<Game>, StoreError>> + Send {
        (**self).game_by_id(id)
    }

    fn game_by_room(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<Option<Game>, StoreError>> + Send {
        (**self).game_by_room(room_id)
    }

    fn games_for_user(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<Game>, StoreError>> + Send {
        (**self).games_for_user(user)
    }

    fn set_player_code(
        &self,
        id: GameId,
        slot: PlayerSlot,
        code: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).set_player_code(id, slot, code, now)
    }

    fn start_game_if_ready(
        &self,
        id: GameId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).start_game_if_ready(id, now)
    }

    fn advance_round(
        &self,
        id: GameId,
        from: u32,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).advance_round(id, from, now)
    }

    fn finish_game(
        &self,
        id: GameId,
        winner: &UserId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).finish_game(id, winner, now)
    }

    fn insert_move(&self, mv: &Move) -> impl Future<Output = Result<(), StoreError>> + Send {
        (**self).insert_move(mv)
    }

    fn move_for(
        &self,
        game_id: GameId,
        player: &UserId,
        round: u32,
    ) -> impl Future<Output = Result<Option<Move>, StoreError>> + Send {
        (**self).move_for(game_id, player, round)
    }

    fn count_moves(
        &self,
        game_id: GameId,
        round: u32,
    ) -> impl Future<Output = Result<u32, StoreError>> + Send {
        (**self).count_moves(game_id, round)
    }

    fn moves_for_game(
        &self,
        game_id: GameId,
    ) -> impl Future<Output = Result<Vec<Move>, StoreError>> + Send {
        (**self).moves_for_game(game_id)
    }
}
