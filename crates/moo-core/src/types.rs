//! Records and events shared by every Moo layer.
//!
//! The three persistent records mirror the store's tables:
//!
//! ```text
//! Room 1 ── 0..1 Game 1 ── * Move
//! ```
//!
//! A room owns at most one game, a game owns its moves, and deleting a
//! room takes both with it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable user id handed to us by the identity provider.
///
/// Opaque on purpose: Moo never looks inside, it only compares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Allocates a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Primary key of a [`Room`].
    RoomId
);
uuid_id!(
    /// Primary key of a [`Game`].
    GameId
);
uuid_id!(
    /// Primary key of a [`Move`].
    MoveId
);

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// Number of letters in a room code.
pub const ROOM_CODE_LEN: usize = 4;

/// Letters a room code is drawn from.
pub const ROOM_CODE_ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// The short, shareable name of a room, e.g. `"QXRB"`.
///
/// Codes are case-insensitive. The newtype always holds the uppercased
/// form, so two `RoomCode`s compare equal exactly when a lookup would
/// find the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Normalises user input into a lookup key.
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_uppercase())
    }

    /// Draws a random code from [`ROOM_CODE_ALPHABET`].
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..ROOM_CODE_LEN)
            .map(|_| {
                let i = rng.random_range(0..ROOM_CODE_ALPHABET.len());
                char::from(ROOM_CODE_ALPHABET[i])
            })
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this looks like a code [`generate`](Self::generate)
    /// could have produced.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == ROOM_CODE_LEN
            && self.0.bytes().all(|b| ROOM_CODE_ALPHABET.contains(&b))
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Lifecycle of a room.
///
/// ```text
/// Waiting ──(second player joins)──→ Playing ──(winning guess)──→ Finished
///    ↑                                                               │
///    └──────────────────────(marked empty)───────────────────────────┘
/// ```
///
/// A `Waiting` room whose `empty_at` lies far enough in the past is
/// eligible for cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Returns `true` if a second player may join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Playing => "playing",
            Self::Finished => "finished",
        }
    }
}

impl FromStr for RoomStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "playing" => Ok(Self::Playing),
            "finished" => Ok(Self::Finished),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a game. Strictly forward, `Finished` is terminal:
///
/// ```text
/// CodeSelection ──(both codes set)──→ Playing ──(4 bulls)──→ Finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    CodeSelection,
    Playing,
    Finished,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeSelection => "code_selection",
            Self::Playing => "playing",
            Self::Finished => "finished",
        }
    }
}

impl FromStr for GameStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code_selection" => Ok(Self::CodeSelection),
            "playing" => Ok(Self::Playing),
            "finished" => Ok(Self::Finished),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which seat a user occupies in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSlot {
    /// The room creator.
    One,
    /// The user who joined.
    Two,
}

impl PlayerSlot {
    pub fn opponent(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A lobby identified by a short code, owned by its creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub code: RoomCode,
    pub created_by: UserId,
    pub status: RoomStatus,
    /// In the future: keep. In the past on a `Waiting` room: reapable.
    pub empty_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One match between the room creator and the user who joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameId,
    pub room_id: RoomId,
    pub player1_id: UserId,
    pub player2_id: UserId,
    pub player1_code: Option<String>,
    pub player2_code: Option<String>,
    pub current_round: u32,
    pub status: GameStatus,
    pub winner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    /// A fresh game in `CodeSelection`, round 1.
    pub fn new(room_id: RoomId, player1_id: UserId, player2_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: GameId::new(),
            room_id,
            player1_id,
            player2_id,
            player1_code: None,
            player2_code: None,
            current_round: 1,
            status: GameStatus::CodeSelection,
            winner_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the seat `user` occupies, if any.
    pub fn slot_of(&self, user: &UserId) -> Option<PlayerSlot> {
        if self.player1_id == *user {
            Some(PlayerSlot::One)
        } else if self.player2_id == *user {
            Some(PlayerSlot::Two)
        } else {
            None
        }
    }

    pub fn has_player(&self, user: &UserId) -> bool {
        self.slot_of(user).is_some()
    }

    pub fn code(&self, slot: PlayerSlot) -> Option<&str> {
        match slot {
            PlayerSlot::One => self.player1_code.as_deref(),
            PlayerSlot::Two => self.player2_code.as_deref(),
        }
    }

    pub fn both_codes_set(&self) -> bool {
        self.player1_code.is_some() && self.player2_code.is_some()
    }
}

/// One player's guess for one round, with its score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub id: MoveId,
    pub game_id: GameId,
    pub player_id: UserId,
    pub round: u32,
    pub guess: String,
    pub bulls: u8,
    pub cows: u8,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RoomUpdated,
    GameStarted,
    MoveMade,
    GameFinished,
}

/// A state-change notification, scoped to one room.
///
/// Events are hints, not state: a subscriber that receives one re-fetches
/// whatever it displays. `data` is deliberately loose so the payload can
/// grow without a protocol change.
///
/// Serialized as
/// `{"roomId": "...", "gameId": "...", "type": "move_made", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEvent {
    pub room_id: RoomId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<GameId>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub data: serde_json::Value,
}

impl GameEvent {
    pub fn new(room_id: RoomId, kind: EventKind, data: serde_json::Value) -> Self {
        Self {
            room_id,
            game_id: None,
            kind,
            data,
        }
    }

    /// Attaches the game this event concerns.
    pub fn with_game(mut self, game_id: GameId) -> Self {
        self.game_id = Some(game_id);
        self
    }
}
