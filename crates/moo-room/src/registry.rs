//! Room registry: creating, finding and joining rooms.

use moo_core::{EventKind, Game, Room, RoomCode, RoomId, RoomStatus, UserId};
use moo_store::{RoomUpdate, Store};
use serde_json::json;

use crate::{CreatedRoom, GameError, GameService, JoinedRoom, RoomRole, RoomRoleInfo};

impl<S: Store> GameService<S> {
    /// Opens a new `waiting` room owned by `creator` under a fresh code.
    ///
    /// Codes are drawn at random; a draw that collides with a live room
    /// (found by lookup, or by the store's unique index on insert) costs
    /// one of `code_attempts`.
    pub async fn create_room(&self, creator: &UserId) -> Result<CreatedRoom, GameError> {
        let attempts = self.config.code_attempts;
        for attempt in 1..=attempts {
            let code = RoomCode::generate(&mut rand::rng());
            if self.store.room_by_code(&code).await?.is_some() {
                tracing::debug!(%code, attempt, "room code collision");
                continue;
            }

            let now = Self::now();
            let room = Room {
                id: RoomId::new(),
                code,
                created_by: creator.clone(),
                status: RoomStatus::Waiting,
                empty_at: self.config.hold_until(now),
                created_at: now,
                updated_at: now,
            };
            match self.store.insert_room(&room).await {
                Ok(()) => {}
                Err(e) if e.is_conflict() => {
                    tracing::debug!(code = %room.code, attempt, "room code taken on insert");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            tracing::info!(room_id = %room.id, code = %room.code, user_id = %creator, "room created");
            self.publish(
                room.id,
                None,
                EventKind::RoomUpdated,
                json!({ "status": RoomStatus::Waiting, "code": room.code }),
            );
            return Ok(CreatedRoom {
                room_id: room.id,
                code: room.code,
            });
        }

        tracing::warn!(attempts, "room code space exhausted");
        Err(GameError::CodeSpaceExhausted(attempts))
    }

    /// Public room lookup. Case-insensitive.
    pub async fn room_info(&self, code: &str) -> Result<Room, GameError> {
        self.find_room(&RoomCode::new(code)).await
    }

    /// Whether `user` created the room, plays in its game, or is just
    /// looking.
    pub async fn user_room_role(
        &self,
        user: &UserId,
        code: &str,
    ) -> Result<RoomRoleInfo, GameError> {
        let room = self.find_room(&RoomCode::new(code)).await?;
        let game = self.store.game_by_room(room.id).await?;

        let role = if room.created_by == *user {
            RoomRole::Creator
        } else if game.as_ref().is_some_and(|g| g.has_player(user)) {
            RoomRole::Player
        } else {
            RoomRole::Visitor
        };

        let game = game.filter(|_| role != RoomRole::Visitor);
        Ok(RoomRoleInfo {
            role,
            room_id: room.id,
            game_id: game.as_ref().map(|g| g.id),
            game_status: game.as_ref().map(|g| g.status),
        })
    }

    /// Enters the room behind `code`.
    ///
    /// The creator just comes back: the room is marked active and any
    /// existing game is returned. Anyone else becomes player two of a new
    /// game, which moves the room to `playing`.
    pub async fn join_room(&self, user: &UserId, code: &str) -> Result<JoinedRoom, GameError> {
        let room = self.find_room(&RoomCode::new(code)).await?;

        if room.created_by == *user {
            self.touch_active(room.id).await;
            let game = self.store.game_by_room(room.id).await?;
            tracing::debug!(room_id = %room.id, user_id = %user, "creator returned to room");
            return Ok(JoinedRoom {
                game_id: game.map(|g| g.id),
                room_id: room.id,
                is_creator: true,
            });
        }

        if !room.status.is_joinable() {
            tracing::debug!(room_id = %room.id, status = %room.status, "join rejected");
            return Err(GameError::RoomNotJoinable(room.code));
        }
        if self.store.game_by_room(room.id).await?.is_some() {
            return Err(GameError::RoomFull(room.code));
        }

        let now = Self::now();
        let game = Game::new(room.id, room.created_by.clone(), user.clone(), now);
        match self.store.insert_game(&game).await {
            Ok(()) => {}
            // Someone else joined between our check and our insert.
            Err(e) if e.is_conflict() => return Err(GameError::RoomFull(room.code)),
            Err(e) => return Err(e.into()),
        }
        self.store
            .update_room(
                room.id,
                RoomUpdate::default()
                    .status(RoomStatus::Playing)
                    .empty_at(self.config.hold_until(now)),
                now,
            )
            .await?;

        tracing::info!(
            room_id = %room.id,
            game_id = %game.id,
            player1 = %game.player1_id,
            player2 = %game.player2_id,
            "game created"
        );
        self.publish(
            room.id,
            Some(game.id),
            EventKind::GameStarted,
            json!({ "player1Id": game.player1_id, "player2Id": game.player2_id }),
        );

        Ok(JoinedRoom {
            game_id: Some(game.id),
            room_id: room.id,
            is_creator: false,
        })
    }

    /// Every game `user` plays in, most recently updated first.
    pub async fn my_games(&self, user: &UserId) -> Result<Vec<Game>, GameError> {
        Ok(self.store.games_for_user(user).await?)
    }

    /// Pushes the room's `empty_at` out by `active_hold`, keeping the
    /// cleanup sweep away. Returns `false` if the room is gone.
    pub async fn mark_room_active(&self, room_id: RoomId) -> Result<bool, GameError> {
        let now = Self::now();
        let found = self
            .store
            .update_room(
                room_id,
                RoomUpdate::default().empty_at(self.config.hold_until(now)),
                now,
            )
            .await?;
        if found {
            tracing::debug!(%room_id, "room marked active");
        }
        Ok(found)
    }

    /// Puts the room back to `waiting` with `empty_at = now`, so the sweep
    /// reaps it once it has stayed that way long enough.
    pub async fn mark_room_empty(&self, room_id: RoomId) -> Result<bool, GameError> {
        let now = Self::now();
        let found = self
            .store
            .update_room(
                room_id,
                RoomUpdate::default().status(RoomStatus::Waiting).empty_at(now),
                now,
            )
            .await?;
        if found {
            tracing::debug!(%room_id, "room marked empty");
        }
        Ok(found)
    }

    // Side-effect bookkeeping: a failure here must not fail the caller.
    async fn touch_active(&self, room_id: RoomId) {
        if let Err(e) = self.mark_room_active(room_id).await {
            tracing::warn!(%room_id, error = %e, "failed to mark room active");
        }
    }
}
