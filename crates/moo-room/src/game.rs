//! Game state machine.
//!
//! ```text
//! CodeSelection ──(both codes set)──→ Playing ──(4 bulls)──→ Finished
//! ```
//!
//! Within `Playing`, each player gets one guess per round. The round
//! counter advances once both players have a move recorded for it.
//!
//! Every transition is a conditional write in the store: the update only
//! applies if the game is still in the state we read. When two requests
//! race, exactly one of them sees its write applied, and only that one
//! emits the transition event.

use moo_core::{
    EventKind, Game, GameStatus, Move, MoveId, PlayerSlot, RoomStatus, UserId, is_valid_code,
    score,
};
use moo_store::{RoomUpdate, Store};
use serde_json::json;

use crate::{GameError, GameRef, GameService, GameStateView, GuessOutcome};

fn expect_phase(game: &Game, expected: GameStatus) -> Result<(), GameError> {
    if game.status == expected {
        Ok(())
    } else {
        Err(GameError::WrongPhase {
            game_id: game.id,
            expected,
            actual: game.status,
        })
    }
}

fn seat(game: &Game, user: &UserId) -> Result<PlayerSlot, GameError> {
    game.slot_of(user)
        .ok_or_else(|| GameError::NotAPlayer(user.clone(), game.id))
}

impl<S: Store> GameService<S> {
    /// The game as `user` may see it, with all moves so far.
    pub async fn game_state(&self, user: &UserId, game: &GameRef) -> Result<GameStateView, GameError> {
        let mut game = self.resolve_game(game).await?;
        let slot = seat(&game, user)?;
        let moves = self.store.moves_for_game(game.id).await?;

        if game.status != GameStatus::Finished {
            match slot.opponent() {
                PlayerSlot::One => game.player1_code = None,
                PlayerSlot::Two => game.player2_code = None,
            }
        }

        Ok(GameStateView {
            is_player1: slot == PlayerSlot::One,
            is_player2: slot == PlayerSlot::Two,
            game,
            moves,
        })
    }

    /// Records `user`'s secret code. Setting it again before the game
    /// starts replaces the earlier one.
    ///
    /// The call that completes the pair moves the game to `playing` and
    /// emits `game_started`.
    pub async fn set_player_code(
        &self,
        user: &UserId,
        game: &GameRef,
        code: &str,
    ) -> Result<(), GameError> {
        if !is_valid_code(code) {
            return Err(GameError::InvalidCode(code.to_string()));
        }
        let game = self.resolve_game(game).await?;
        expect_phase(&game, GameStatus::CodeSelection)?;
        let slot = seat(&game, user)?;

        let now = Self::now();
        if !self.store.set_player_code(game.id, slot, code, now).await? {
            return Err(self.phase_changed(&game, GameStatus::CodeSelection).await);
        }
        tracing::debug!(game_id = %game.id, user_id = %user, "secret code set");

        if self.store.start_game_if_ready(game.id, now).await? {
            tracing::info!(room_id = %game.room_id, game_id = %game.id, "game started");
            self.publish(
                game.room_id,
                Some(game.id),
                EventKind::GameStarted,
                json!({ "status": GameStatus::Playing }),
            );
        }
        Ok(())
    }

    /// Scores `guess` against the opponent's code and records it as
    /// `user`'s move for the current round.
    ///
    /// A winning guess finishes the game and marks the room empty.
    /// Otherwise the round advances if both players have now moved.
    ///
    /// When both players guess right in the same round, only the one
    /// whose finish lands first wins; the other's move is recorded with
    /// `is_win == false`.
    pub async fn make_guess(
        &self,
        user: &UserId,
        game: &GameRef,
        guess: &str,
    ) -> Result<GuessOutcome, GameError> {
        if !is_valid_code(guess) {
            return Err(GameError::InvalidCode(guess.to_string()));
        }
        let game = self.resolve_game(game).await?;
        expect_phase(&game, GameStatus::Playing)?;
        if !game.both_codes_set() {
            return Err(GameError::CodesNotSet(game.id));
        }
        let slot = seat(&game, user)?;
        let target = game
            .code(slot.opponent())
            .ok_or(GameError::CodesNotSet(game.id))?;

        let round = game.current_round;
        let already_guessed = GameError::AlreadyGuessed {
            game_id: game.id,
            round,
        };
        if self.store.move_for(game.id, user, round).await?.is_some() {
            tracing::debug!(game_id = %game.id, user_id = %user, round, "duplicate guess rejected");
            return Err(already_guessed);
        }

        let result = score(guess, target);
        let now = Self::now();
        let mv = Move {
            id: MoveId::new(),
            game_id: game.id,
            player_id: user.clone(),
            round,
            guess: guess.to_string(),
            bulls: result.bulls,
            cows: result.cows,
            created_at: now,
        };
        match self.store.insert_move(&mv).await {
            Ok(()) => {}
            // Lost a race against our own second request.
            Err(e) if e.is_conflict() => return Err(already_guessed),
            Err(e) => return Err(e.into()),
        }

        let mut is_win = false;
        if result.is_win() {
            if self.store.finish_game(game.id, user, now).await? {
                is_win = true;
                self.store
                    .update_room(game.room_id, RoomUpdate::default().status(RoomStatus::Finished), now)
                    .await?;
                self.mark_room_empty(game.room_id).await?;
                tracing::info!(
                    room_id = %game.room_id,
                    game_id = %game.id,
                    winner = %user,
                    round,
                    "game finished"
                );
                self.publish(
                    game.room_id,
                    Some(game.id),
                    EventKind::GameFinished,
                    json!({ "winnerId": user, "bulls": result.bulls, "cows": result.cows }),
                );
            } else {
                tracing::debug!(game_id = %game.id, user_id = %user, "opponent won first, guess not a win");
            }
        } else {
            if self.store.count_moves(game.id, round).await? >= 2
                && self.store.advance_round(game.id, round, now).await?
            {
                tracing::info!(game_id = %game.id, round = round + 1, "round advanced");
            }
            self.publish(
                game.room_id,
                Some(game.id),
                EventKind::MoveMade,
                json!({
                    "playerId": user,
                    "round": round,
                    "bulls": result.bulls,
                    "cows": result.cows,
                }),
            );
        }

        Ok(GuessOutcome {
            bulls: result.bulls,
            cows: result.cows,
            is_win,
        })
    }

    // A conditional write matched nothing: report the phase the game is
    // in now, or that it is gone.
    async fn phase_changed(&self, game: &Game, expected: GameStatus) -> GameError {
        match self.store.game_by_id(game.id).await {
            Ok(Some(current)) => GameError::WrongPhase {
                game_id: game.id,
                expected,
                actual: current.status,
            },
            Ok(None) => GameError::GameNotFound(game.id),
            Err(e) => e.into(),
        }
    }
}
