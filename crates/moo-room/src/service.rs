//! The game service and the values it hands back to callers.

use chrono::{DateTime, Utc};
use moo_core::{EventKind, Game, GameEvent, GameId, GameStatus, Move, Room, RoomCode, RoomId};
use moo_store::Store;
use serde::{Deserialize, Serialize};

use crate::{GameConfig, GameError, Notifier, Subscription};

/// How an operation finds its game: by id, or through the room code.
///
/// Both lead to the same state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameRef {
    Id(GameId),
    RoomCode(RoomCode),
}

impl GameRef {
    /// A lookup through a room code as typed by a user.
    pub fn code(code: &str) -> Self {
        Self::RoomCode(RoomCode::new(code))
    }
}

impl From<GameId> for GameRef {
    fn from(id: GameId) -> Self {
        Self::Id(id)
    }
}

impl From<RoomCode> for GameRef {
    fn from(code: RoomCode) -> Self {
        Self::RoomCode(code)
    }
}

/// Result of `create_room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRoom {
    pub room_id: RoomId,
    pub code: RoomCode,
}

/// Result of `join_room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedRoom {
    /// `None` when the creator returns to a room nobody joined yet.
    pub game_id: Option<GameId>,
    pub room_id: RoomId,
    pub is_creator: bool,
}

/// A user's relationship to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomRole {
    Creator,
    Player,
    Visitor,
}

/// Result of `user_room_role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRoleInfo {
    pub role: RoomRole,
    pub room_id: RoomId,
    pub game_id: Option<GameId>,
    pub game_status: Option<GameStatus>,
}

/// A player's view of a game.
///
/// The opponent's secret code is blanked out until the game is finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub game: Game,
    pub moves: Vec<Move>,
    pub is_player1: bool,
    pub is_player2: bool,
}

/// Result of `make_guess`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessOutcome {
    pub bulls: u8,
    pub cows: u8,
    /// This guess finished the game. Four bulls that arrive after the
    /// opponent already won score normally but are not a win.
    pub is_win: bool,
}

/// Room registry and game state machine over a [`Store`].
///
/// Holds no per-game state of its own: every operation reads what it
/// needs from the store, and every transition is a conditional store
/// write. Events go out through the injected [`Notifier`] once the write
/// has landed.
pub struct GameService<S> {
    pub(crate) store: S,
    pub(crate) notifier: Notifier,
    pub(crate) config: GameConfig,
}

impl<S: Store> GameService<S> {
    pub fn new(store: S, notifier: Notifier, config: GameConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Listens to every event of `room_id`.
    pub fn subscribe(&self, room_id: RoomId) -> Subscription {
        self.notifier.subscribe(room_id)
    }

    // -- Lookups shared by the registry and the state machine --

    pub(crate) async fn find_room(&self, code: &RoomCode) -> Result<Room, GameError> {
        self.store
            .room_by_code(code)
            .await?
            .ok_or_else(|| GameError::RoomNotFound(code.clone()))
    }

    pub(crate) async fn resolve_game(&self, game: &GameRef) -> Result<Game, GameError> {
        match game {
            GameRef::Id(id) => self
                .store
                .game_by_id(*id)
                .await?
                .ok_or(GameError::GameNotFound(*id)),
            GameRef::RoomCode(code) => {
                let room = self.find_room(code).await?;
                self.store
                    .game_by_room(room.id)
                    .await?
                    .ok_or_else(|| GameError::NoGameInRoom(code.clone()))
            }
        }
    }

    pub(crate) fn publish(
        &self,
        room_id: RoomId,
        game_id: Option<GameId>,
        kind: EventKind,
        data: serde_json::Value,
    ) {
        let mut event = GameEvent::new(room_id, kind, data);
        if let Some(game_id) = game_id {
            event = event.with_game(game_id);
        }
        self.notifier.emit(event);
    }

    pub(crate) fn now() -> DateTime<Utc> {
        Utc::now()
    }
}
