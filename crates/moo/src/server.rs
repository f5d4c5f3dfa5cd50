//! The server facade that ties the store, game service, notifier and
//! cleanup scheduler together.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!   token ──────→ │ Authenticator│ ──→ PlayerSession ──┐
//!                 └──────────────┘                     │
//!                                                      ▼
//!  Store (Arc) ◄──── GameService ────→ Notifier ──→ Subscription
//!       ▲
//!       └─────────── CleanupScheduler (background sweep)
//! ```
//!
//! Every caller-facing operation except [`MooServer::room_info`] goes
//! through a [`PlayerSession`], so an unauthenticated caller never
//! reaches the game layer.

use std::sync::Arc;

use moo_cleanup::{CleanupMetrics, CleanupScheduler, SweepReport};
use moo_core::{Game, Room, RoomId, UserId};
use moo_room::{
    CreatedRoom, GameRef, GameService, GameStateView, GuessOutcome, JoinedRoom, Notifier,
    RoomRoleInfo, Subscription,
};
use moo_store::Store;
use tracing::{debug, info};

use crate::{Authenticator, MooConfig, MooError};

/// Owns everything one Moo deployment needs.
pub struct MooServer<S, A> {
    store: Arc<S>,
    games: GameService<Arc<S>>,
    cleanup: CleanupScheduler<Arc<S>>,
    auth: A,
}

impl<S: Store, A: Authenticator> MooServer<S, A> {
    /// Wires the components over `store`. The cleanup loop is not started
    /// until [`start_cleanup`](Self::start_cleanup).
    pub fn new(store: S, auth: A, config: &MooConfig) -> Self {
        let store = Arc::new(store);
        let games = GameService::new(Arc::clone(&store), Notifier::new(), config.game.clone());
        let cleanup = CleanupScheduler::new(Arc::clone(&store), config.cleanup.clone());
        Self {
            store,
            games,
            cleanup,
            auth,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn games(&self) -> &GameService<Arc<S>> {
        &self.games
    }

    pub fn notifier(&self) -> &Notifier {
        self.games.notifier()
    }

    /// Authenticates `token` and binds the resulting user to a session.
    ///
    /// A missing token is `Unauthorized` without consulting the
    /// authenticator.
    pub async fn session(&self, token: Option<&str>) -> Result<PlayerSession<'_, S, A>, MooError> {
        let Some(token) = token else {
            debug!("request without token");
            return Err(MooError::Unauthorized("missing token".into()));
        };
        let user = self.auth.authenticate(token).await.inspect_err(|e| {
            debug!(error = %e, "authentication failed");
        })?;
        Ok(PlayerSession { server: self, user })
    }

    /// Public room lookup, no session needed.
    pub async fn room_info(&self, code: &str) -> Result<Room, MooError> {
        Ok(self.games.room_info(code).await?)
    }

    /// Listens to every event of `room_id`.
    pub fn subscribe(&self, room_id: RoomId) -> Subscription {
        self.games.subscribe(room_id)
    }

    /// Pushes the room's `empty_at` out by the configured hold.
    pub async fn mark_room_active(&self, room_id: RoomId) -> Result<bool, MooError> {
        Ok(self.games.mark_room_active(room_id).await?)
    }

    /// Returns the room to `waiting` with `empty_at` set to now.
    pub async fn mark_room_empty(&self, room_id: RoomId) -> Result<bool, MooError> {
        Ok(self.games.mark_room_empty(room_id).await?)
    }

    // -- Cleanup --

    /// Starts the background sweep. `false` if it was already running.
    pub fn start_cleanup(&self) -> bool {
        self.cleanup.start()
    }

    /// Runs one sweep now, whether or not the loop is running.
    pub async fn run_cleanup_sweep(&self) -> Result<SweepReport, MooError> {
        Ok(self.cleanup.sweep_once().await?)
    }

    pub fn cleanup_metrics(&self) -> CleanupMetrics {
        self.cleanup.metrics()
    }

    pub fn is_cleanup_running(&self) -> bool {
        self.cleanup.is_running()
    }

    /// Stops the background sweep and waits for it to exit.
    pub async fn shutdown(&self) {
        if self.cleanup.stop().await {
            info!("moo server shut down");
        }
    }
}

/// An authenticated caller. Every operation acts as [`user`](Self::user).
pub struct PlayerSession<'a, S, A> {
    server: &'a MooServer<S, A>,
    user: UserId,
}

impl<S: Store, A: Authenticator> PlayerSession<'_, S, A> {
    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub async fn create_room(&self) -> Result<CreatedRoom, MooError> {
        Ok(self.server.games.create_room(&self.user).await?)
    }

    pub async fn join_room(&self, code: &str) -> Result<JoinedRoom, MooError> {
        Ok(self.server.games.join_room(&self.user, code).await?)
    }

    pub async fn user_room_role(&self, code: &str) -> Result<RoomRoleInfo, MooError> {
        Ok(self.server.games.user_room_role(&self.user, code).await?)
    }

    pub async fn game_state(&self, game: impl Into<GameRef>) -> Result<GameStateView, MooError> {
        Ok(self.server.games.game_state(&self.user, &game.into()).await?)
    }

    pub async fn set_player_code(
        &self,
        game: impl Into<GameRef>,
        code: &str,
    ) -> Result<(), MooError> {
        Ok(self
            .server
            .games
            .set_player_code(&self.user, &game.into(), code)
            .await?)
    }

    pub async fn make_guess(
        &self,
        game: impl Into<GameRef>,
        guess: &str,
    ) -> Result<GuessOutcome, MooError> {
        Ok(self
            .server
            .games
            .make_guess(&self.user, &game.into(), guess)
            .await?)
    }

    pub async fn my_games(&self) -> Result<Vec<Game>, MooError> {
        Ok(self.server.games.my_games(&self.user).await?)
    }

    pub fn subscribe(&self, room_id: RoomId) -> Subscription {
        self.server.subscribe(room_id)
    }
}
