//! # Moo
//!
//! Multiplayer bulls and cows. Two players each pick a secret four-digit
//! code over the symbols `0..6` and take turns guessing the other's. A
//! guess scores bulls (right symbol, right place) and cows (right symbol,
//! wrong place). Four bulls wins.
//!
//! This crate is the service root. It wires the layers together:
//!
//! - [`moo_core`]: ids, records, the code codec, scoring
//! - [`moo_store`]: the [`Store`](moo_store::Store) seam, in-memory and SQLite backends
//! - [`moo_room`]: room registry, game state machine, event fan-out
//! - [`moo_cleanup`]: the background sweep for abandoned rooms
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use moo::prelude::*;
//!
//! # async fn run() -> Result<(), MooError> {
//! let config = MooConfig::from_env()?;
//! let store = SqliteStore::open(&config.db_path)?;
//! let server = MooServer::new(store, DevAuthenticator, &config);
//! server.start_cleanup();
//!
//! let alice = server.session(Some("alice")).await?;
//! let room = alice.create_room().await?;
//! println!("share code {}", room.code);
//! # Ok(())
//! # }
//! ```

mod auth;
mod config;
mod error;
mod server;

pub use auth::{Authenticator, DevAuthenticator, StaticAuthenticator};
pub use config::MooConfig;
pub use error::{ConfigError, MooError};
pub use server::{MooServer, PlayerSession};

/// Convenient imports for applications built on Moo.
pub mod prelude {
    pub use crate::{
        Authenticator, ConfigError, DevAuthenticator, MooConfig, MooError, MooServer,
        PlayerSession, StaticAuthenticator,
    };
    pub use moo_cleanup::{CleanupConfig, CleanupMetrics, SweepReport};
    pub use moo_core::{
        EventKind, Game, GameEvent, GameId, GameStatus, Move, Room, RoomCode, RoomId, RoomStatus,
        UserId,
    };
    pub use moo_room::{
        CreatedRoom, ErrorKind, GameConfig, GameError, GameRef, GameStateView, GuessOutcome,
        JoinedRoom, RoomRole, RoomRoleInfo, Subscription,
    };
    pub use moo_store::{MemoryStore, SqliteStore, Store, StoreError};
}
