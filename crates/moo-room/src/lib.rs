//! Rooms, games and live updates for Moo.
//!
//! Everything here runs against a [`moo_store::Store`] and keeps no game
//! state in memory, so any number of request tasks can drive the same
//! game concurrently.
//!
//! # Key types
//!
//! - [`GameService`]: the room registry (create, join, role lookup) and
//!   the game state machine (secret codes, guesses, rounds, wins)
//! - [`GameRef`]: find a game by id or by its room's code
//! - [`Notifier`] / [`Subscription`]: per-room event fan-out
//! - [`GameConfig`]: code generation attempts, active-room hold
//! - [`GameError`] / [`ErrorKind`]: what went wrong, and how a client
//!   should treat it

mod config;
mod error;
mod game;
mod notifier;
mod registry;
mod service;

pub use config::GameConfig;
pub use error::{ErrorKind, GameError};
pub use notifier::{Notifier, Subscription};
pub use service::{
    CreatedRoom, GameRef, GameService, GameStateView, GuessOutcome, JoinedRoom, RoomRole,
    RoomRoleInfo,
};
