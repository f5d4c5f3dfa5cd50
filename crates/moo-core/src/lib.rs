//! Core vocabulary for Moo.
//!
//! This crate defines the pieces every other layer agrees on:
//!
//! - **Types** ([`Room`], [`Game`], [`Move`], [`GameEvent`], the id
//!   newtypes and status enums): the records that live in the store
//!   and the events that travel to subscribers.
//! - **Codec** ([`encode`], [`decode`], [`is_valid_code`]): how a row of
//!   emoji symbols is stored as a fixed-width digit string.
//! - **Scoring** ([`score`], [`Score`]): bulls and cows for a guess.
//! - **Errors** ([`CoreError`]): what can go wrong while parsing.
//!
//! Nothing here performs I/O. Storage lives in `moo-store`, the game
//! rules that mutate state live in `moo-room`.

mod codec;
mod error;
mod scoring;
mod types;

pub use codec::{
    ALPHABET_SIZE, CODE_LEN, SYMBOLS, decode, encode, is_valid_code,
    symbol_index, try_decode, try_encode,
};
pub use error::CoreError;
pub use scoring::{Score, is_winning_guess, score};
pub use types::{
    EventKind, Game, GameEvent, GameId, GameStatus, Move, MoveId, PlayerSlot,
    ROOM_CODE_ALPHABET, ROOM_CODE_LEN, Room, RoomCode, RoomId, RoomStatus,
    UserId,
};
