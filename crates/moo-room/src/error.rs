//! Error types for the game layer.

use moo_core::{GameId, GameStatus, RoomCode, UserId};
use moo_store::StoreError;
use serde::{Deserialize, Serialize};

/// The coarse category of a [`GameError`], as a client sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No caller identity, or a rejected one. Raised by the service
    /// root before any game operation runs.
    Unauthorized,
    /// The room or game does not exist. Clients redirect home.
    NotFound,
    /// The request cannot apply in the current state.
    BadRequest,
    /// The caller is not a participant.
    Forbidden,
    /// Something broke on our side.
    Internal,
}

/// Errors that can occur during room and game operations.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// No room has this code.
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    /// The room exists but no one has joined it yet.
    #[error("no game found in room {0}")]
    NoGameInRoom(RoomCode),

    /// No game has this id.
    #[error("game {0} not found")]
    GameNotFound(GameId),

    /// A secret code or guess that is not four digits in `0..6`.
    #[error("invalid code format {0:?}")]
    InvalidCode(String),

    /// The room is past `waiting` and takes no new players.
    #[error("room {0} is not accepting new players")]
    RoomNotJoinable(RoomCode),

    /// The room already holds a game.
    #[error("room {0} already has a game in progress")]
    RoomFull(RoomCode),

    /// The game is in the wrong phase for this operation.
    #[error("game {game_id} is {actual}, expected {expected}")]
    WrongPhase {
        game_id: GameId,
        expected: GameStatus,
        actual: GameStatus,
    },

    /// Guessing before both secret codes are set.
    #[error("players in game {0} have not set their codes yet")]
    CodesNotSet(GameId),

    /// A second guess in the same round.
    #[error("already guessed in round {round} of game {game_id}")]
    AlreadyGuessed { game_id: GameId, round: u32 },

    /// The caller is neither player of the game.
    #[error("user {0} is not a player in game {1}")]
    NotAPlayer(UserId, GameId),

    /// Every generated room code collided with a live room.
    #[error("failed to generate a unique room code after {0} attempts")]
    CodeSpaceExhausted(u32),

    /// The store failed underneath us.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound(_) | Self::NoGameInRoom(_) | Self::GameNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::InvalidCode(_)
            | Self::RoomNotJoinable(_)
            | Self::RoomFull(_)
            | Self::WrongPhase { .. }
            | Self::CodesNotSet(_)
            | Self::AlreadyGuessed { .. } => ErrorKind::BadRequest,
            Self::NotAPlayer(..) => ErrorKind::Forbidden,
            Self::CodeSpaceExhausted(_) | Self::Store(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_covers_taxonomy() {
        let game_id = GameId::new();
        assert_eq!(GameError::RoomNotFound(RoomCode::new("ABCD")).kind(), ErrorKind::NotFound);
        assert_eq!(GameError::GameNotFound(game_id).kind(), ErrorKind::NotFound);
        assert_eq!(GameError::InvalidCode("9".into()).kind(), ErrorKind::BadRequest);
        assert_eq!(
            GameError::AlreadyGuessed { game_id, round: 2 }.kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            GameError::NotAPlayer(UserId::new("eve"), game_id).kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(GameError::CodeSpaceExhausted(10).kind(), ErrorKind::Internal);
        assert_eq!(
            GameError::Store(StoreError::Backend("disk".into())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_wrong_phase_message() {
        let err = GameError::WrongPhase {
            game_id: GameId::new(),
            expected: GameStatus::Playing,
            actual: GameStatus::CodeSelection,
        };
        let msg = err.to_string();
        assert!(msg.contains("is code_selection, expected playing"), "{msg}");
    }
}
