//! In-memory store, for tests and single-process deployments that do not
//! need to survive a restart.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use moo_core::{
    Game, GameId, GameStatus, Move, PlayerSlot, Room, RoomCode, RoomId, RoomStatus, UserId,
};
use tokio::sync::RwLock;

use crate::{RoomUpdate, Store, StoreError};

#[derive(Debug, Default)]
struct Tables {
    rooms: HashMap<RoomId, Room>,
    games: HashMap<GameId, Game>,
    // Insertion order doubles as the tie-break for moves in one round.
    moves: Vec<Move>,
}

/// A [`Store`] backed by hash maps behind one [`RwLock`].
///
/// Every method takes the lock once, so each check-then-write below is
/// atomic with respect to other callers, and the unique constraints
/// match [`SqliteStore`](crate::SqliteStore).
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    async fn insert_room(&self, room: &Room) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if t.rooms.values().any(|r| r.code == room.code) {
            return Err(StoreError::Conflict(format!("room code {} taken", room.code)));
        }
        if t.rooms.contains_key(&room.id) {
            return Err(StoreError::Conflict(format!("room {} exists", room.id)));
        }
        t.rooms.insert(room.id, room.clone());
        Ok(())
    }

    async fn room_by_id(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.tables.read().await.rooms.get(&id).cloned())
    }

    async fn room_by_code(&self, code: &RoomCode) -> Result<Option<Room>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.rooms.values().find(|r| r.code == *code).cloned())
    }

    async fn update_room(
        &self,
        id: RoomId,
        update: RoomUpdate,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        let Some(room) = t.rooms.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(status) = update.status {
            room.status = status;
        }
        if let Some(at) = update.empty_at {
            room.empty_at = at;
        }
        room.updated_at = now;
        Ok(true)
    }

    async fn stale_rooms(&self, before: DateTime<Utc>) -> Result<Vec<Room>, StoreError> {
        let t = self.tables.read().await;
        let mut rooms: Vec<Room> = t
            .rooms
            .values()
            .filter(|r| r.status == RoomStatus::Waiting && r.empty_at < before)
            .cloned()
            .collect();
        rooms.sort_by_key(|r| r.empty_at);
        Ok(rooms)
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        if t.rooms.remove(&id).is_none() {
            return Ok(false);
        }
        let doomed: Vec<GameId> = t
            .games
            .values()
            .filter(|g| g.room_id == id)
            .map(|g| g.id)
            .collect();
        for game_id in &doomed {
            t.games.remove(game_id);
        }
        t.moves.retain(|m| !doomed.contains(&m.game_id));
        Ok(true)
    }

    async fn insert_game(&self, game: &Game) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if !t.rooms.contains_key(&game.room_id) {
            return Err(StoreError::Backend(format!(
                "room {} does not exist",
                game.room_id
            )));
        }
        if t.games.values().any(|g| g.room_id == game.room_id) {
            return Err(StoreError::Conflict(format!(
                "room {} already has a game",
                game.room_id
            )));
        }
        t.games.insert(game.id, game.clone());
        Ok(())
    }

    async fn game_by_id(&self, id: GameId) -> Result<Option<Game>, StoreError> {
        Ok(self.tables.read().await.games.get(&id).cloned())
    }

    async fn game_by_room(&self, room_id: RoomId) -> Result<Option<Game>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.games.values().find(|g| g.room_id == room_id).cloned())
    }

    async fn games_for_user(&self, user: &UserId) -> Result<Vec<Game>, StoreError> {
        let t = self.tables.read().await;
        let mut games: Vec<Game> = t
            .games
            .values()
            .filter(|g| g.has_player(user))
            .cloned()
            .collect();
        games.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(games)
    }

    async fn set_player_code(
        &self,
        id: GameId,
        slot: PlayerSlot,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        let Some(game) = t.games.get_mut(&id) else {
            return Ok(false);
        };
        if game.status != GameStatus::CodeSelection {
            return Ok(false);
        }
        match slot {
            PlayerSlot::One => game.player1_code = Some(code.to_string()),
            PlayerSlot::Two => game.player2_code = Some(code.to_string()),
        }
        game.updated_at = now;
        Ok(true)
    }

    async fn start_game_if_ready(&self, id: GameId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        let Some(game) = t.games.get_mut(&id) else {
            return Ok(false);
        };
        if game.status != GameStatus::CodeSelection || !game.both_codes_set() {
            return Ok(false);
        }
        game.status = GameStatus::Playing;
        game.updated_at = now;
        Ok(true)
    }

    async fn advance_round(
        &self,
        id: GameId,
        from: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        let Some(game) = t.games.get_mut(&id) else {
            return Ok(false);
        };
        if game.status != GameStatus::Playing || game.current_round != from {
            return Ok(false);
        }
        game.current_round += 1;
        game.updated_at = now;
        Ok(true)
    }

    async fn finish_game(
        &self,
        id: GameId,
        winner: &UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut t = self.tables.write().await;
        let Some(game) = t.games.get_mut(&id) else {
            return Ok(false);
        };
        if game.status != GameStatus::Playing || !game.has_player(winner) {
            return Ok(false);
        }
        game.status = GameStatus::Finished;
        game.winner_id = Some(winner.clone());
        game.updated_at = now;
        Ok(true)
    }

    async fn insert_move(&self, mv: &Move) -> Result<(), StoreError> {
        let mut t = self.tables.write().await;
        if !t.games.contains_key(&mv.game_id) {
            return Err(StoreError::Backend(format!("game {} does not exist", mv.game_id)));
        }
        let duplicate = t.moves.iter().any(|m| {
            m.game_id == mv.game_id && m.player_id == mv.player_id && m.round == mv.round
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "{} already moved in round {}",
                mv.player_id, mv.round
            )));
        }
        t.moves.push(mv.clone());
        Ok(())
    }

    async fn move_for(
        &self,
        game_id: GameId,
        player: &UserId,
        round: u32,
    ) -> Result<Option<Move>, StoreError> {
        let t = self.tables.read().await;
        Ok(t.moves
            .iter()
            .find(|m| m.game_id == game_id && m.player_id == *player && m.round == round)
            .cloned())
    }

    async fn count_moves(&self, game_id: GameId, round: u32) -> Result<u32, StoreError> {
        let t = self.tables.read().await;
        let n = t
            .moves
            .iter()
            .filter(|m| m.game_id == game_id && m.round == round)
            .count();
        Ok(n as u32)
    }

    async fn moves_for_game(&self, game_id: GameId) -> Result<Vec<Move>, StoreError> {
        let t = self.tables.read().await;
        let mut moves: Vec<Move> = t
            .moves
            .iter()
            .filter(|m| m.game_id == game_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order within a round.
        moves.sort_by_key(|m| (m.round, m.created_at));
        Ok(moves)
    }
}
