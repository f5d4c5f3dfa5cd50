//! Persistence for Moo.
//!
//! The game layer talks to storage only through the [`Store`] trait.
//! Two backends ship with the crate:
//!
//! - [`MemoryStore`]: hash maps behind a tokio `RwLock`. Fast, gone on
//!   restart; what the tests use.
//! - [`SqliteStore`]: a single `rusqlite` connection with WAL, foreign
//!   keys and cascading deletes.
//!
//! Both enforce the same uniqueness rules: one room per code, one game
//! per room, one move per player per round.

mod error;
mod memory;
mod migrations;
mod sqlite;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{RoomUpdate, Store};
