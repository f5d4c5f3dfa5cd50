//! SQLite store.
//!
//! Ids are stored as UUID text, timestamps as Unix milliseconds, statuses
//! as their snake_case names. Uniqueness and cascades are enforced by the
//! schema in [`migrations`](crate::migrations); conditional updates are
//! single `UPDATE ... WHERE` statements, so each one is atomic.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use moo_core::{
    Game, GameId, GameStatus, Move, MoveId, PlayerSlot, Room, RoomCode, RoomId, UserId,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;
use uuid::Uuid;

use crate::{RoomUpdate, Store, StoreError, migrations};

const ROOM_COLUMNS: &str = "id, code, created_by, status, empty_at, created_at, updated_at";
const GAME_COLUMNS: &str = "id, room_id, player1_id, player2_id, player1_code, player2_code, \
     current_round, status, winner_id, created_at, updated_at";
const MOVE_COLUMNS: &str = "id, game_id, player_id, round, guess, bulls, cows, created_at";

/// A [`Store`] on a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and migrates it.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let store = Self::init(conn)?;
        info!("database opened at {}", path.display());
        Ok(store)
    }

    /// A private, throwaway database. Used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Backend(format!("connection lock poisoned: {e}")))?;
        f(&conn)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Maps a unique or primary-key violation onto [`StoreError::Conflict`].
fn insert_error(e: rusqlite::Error, what: impl FnOnce() -> String) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            StoreError::Conflict(what())
        }
        _ => e.into(),
    }
}

// -- Column encoding --

fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp {ms} out of range")))
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|e| StoreError::Corrupt(format!("bad id {s:?}: {e}")))
}

fn corrupt(e: moo_core::CoreError) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

// -- Raw rows --
//
// Rows are read into plain column values inside the rusqlite closure and
// converted afterwards, so decoding failures surface as `Corrupt` rather
// than as a rusqlite error.

struct RoomRow {
    id: String,
    code: String,
    created_by: String,
    status: String,
    empty_at: i64,
    created_at: i64,
    updated_at: i64,
}

impl RoomRow {
    fn read(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            code: r.get(1)?,
            created_by: r.get(2)?,
            status: r.get(3)?,
            empty_at: r.get(4)?,
            created_at: r.get(5)?,
            updated_at: r.get(6)?,
        })
    }

    fn into_room(self) -> Result<Room, StoreError> {
        Ok(Room {
            id: RoomId(parse_uuid(&self.id)?),
            code: RoomCode::new(&self.code),
            created_by: UserId(self.created_by),
            status: self.status.parse().map_err(corrupt)?,
            empty_at: from_millis(self.empty_at)?,
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
        })
    }
}

struct GameRow {
    id: String,
    room_id: String,
    player1_id: String,
    player2_id: String,
    player1_code: Option<String>,
    player2_code: Option<String>,
    current_round: u32,
    status: String,
    winner_id: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl GameRow {
    fn read(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            room_id: r.get(1)?,
            player1_id: r.get(2)?,
            player2_id: r.get(3)?,
            player1_code: r.get(4)?,
            player2_code: r.get(5)?,
            current_round: r.get(6)?,
            status: r.get(7)?,
            winner_id: r.get(8)?,
            created_at: r.get(9)?,
            updated_at: r.get(10)?,
        })
    }

    fn into_game(self) -> Result<Game, StoreError> {
        Ok(Game {
            id: GameId(parse_uuid(&self.id)?),
            room_id: RoomId(parse_uuid(&self.room_id)?),
            player1_id: UserId(self.player1_id),
            player2_id: UserId(self.player2_id),
            player1_code: self.player1_code,
            player2_code: self.player2_code,
            current_round: self.current_round,
            status: self.status.parse().map_err(corrupt)?,
            winner_id: self.winner_id.map(UserId),
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
        })
    }
}

struct MoveRow {
    id: String,
    game_id: String,
    player_id: String,
    round: u32,
    guess: String,
    bulls: u8,
    cows: u8,
    created_at: i64,
}

impl MoveRow {
    fn read(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            game_id: r.get(1)?,
            player_id: r.get(2)?,
            round: r.get(3)?,
            guess: r.get(4)?,
            bulls: r.get(5)?,
            cows: r.get(6)?,
            created_at: r.get(7)?,
        })
    }

    fn into_move(self) -> Result<Move, StoreError> {
        Ok(Move {
            id: MoveId(parse_uuid(&self.id)?),
            game_id: GameId(parse_uuid(&self.game_id)?),
            player_id: UserId(self.player_id),
            round: self.round,
            guess: self.guess,
            bulls: self.bulls,
            cows: self.cows,
            created_at: from_millis(self.created_at)?,
        })
    }
}

fn query_rooms(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Room>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, RoomRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(RoomRow::into_room).collect()
}

fn query_games(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Game>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, GameRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(GameRow::into_game).collect()
}

fn query_moves(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Move>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, MoveRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(MoveRow::into_move).collect()
}

impl Store for SqliteStore {
    // -- Rooms --

    async fn insert_room(&self, room: &Room) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO rooms ({ROOM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                params![
                    room.id.0.to_string(),
                    room.code.as_str(),
                    room.created_by.as_str(),
                    room.status.as_str(),
                    millis(room.empty_at),
                    millis(room.created_at),
                    millis(room.updated_at),
                ],
            )
            .map_err(|e| insert_error(e, || format!("room code {} taken", room.code)))?;
            Ok(())
        })
    }

    async fn room_by_id(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?1"),
                [id.0.to_string()],
                RoomRow::read,
            )
            .optional()?
            .map(RoomRow::into_room)
            .transpose()
        })
    }

    async fn room_by_code(&self, code: &RoomCode) -> Result<Option<Room>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE code = ?1"),
                [code.as_str()],
                RoomRow::read,
            )
            .optional()?
            .map(RoomRow::into_room)
            .transpose()
        })
    }

    async fn update_room(
        &self,
        id: RoomId,
        update: RoomUpdate,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE rooms
                 SET status = COALESCE(?1, status),
                     empty_at = COALESCE(?2, empty_at),
                     updated_at = ?3
                 WHERE id = ?4",
                params![
                    update.status.map(|s| s.as_str()),
                    update.empty_at.map(millis),
                    millis(now),
                    id.0.to_string(),
                ],
            )?;
            Ok(changed == 1)
        })
    }

    async fn stale_rooms(&self, before: DateTime<Utc>) -> Result<Vec<Room>, StoreError> {
        self.with_conn(|conn| {
            query_rooms(
                conn,
                &format!(
                    "SELECT {ROOM_COLUMNS} FROM rooms
                     WHERE status = 'waiting' AND empty_at < ?1
                     ORDER BY empty_at"
                ),
                [millis(before)],
            )
        })
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM rooms WHERE id = ?1", [id.0.to_string()])?;
            Ok(deleted == 1)
        })
    }

    // -- Games --

    async fn insert_game(&self, game: &Game) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO games ({GAME_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                params![
                    game.id.0.to_string(),
                    game.room_id.0.to_string(),
                    game.player1_id.as_str(),
                    game.player2_id.as_str(),
                    game.player1_code.as_deref(),
                    game.player2_code.as_deref(),
                    game.current_round,
                    game.status.as_str(),
                    game.winner_id.as_ref().map(UserId::as_str),
                    millis(game.created_at),
                    millis(game.updated_at),
                ],
            )
            .map_err(|e| {
                insert_error(e, || format!("room {} already has a game", game.room_id))
            })?;
            Ok(())
        })
    }

    async fn game_by_id(&self, id: GameId) -> Result<Option<Game>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?1"),
                [id.0.to_string()],
                GameRow::read,
            )
            .optional()?
            .map(GameRow::into_game)
            .transpose()
        })
    }

    async fn game_by_room(&self, room_id: RoomId) -> Result<Option<Game>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {GAME_COLUMNS} FROM games WHERE room_id = ?1"),
                [room_id.0.to_string()],
                GameRow::read,
            )
            .optional()?
            .map(GameRow::into_game)
            .transpose()
        })
    }

    async fn games_for_user(&self, user: &UserId) -> Result<Vec<Game>, StoreError> {
        self.with_conn(|conn| {
            query_games(
                conn,
                &format!(
                    "SELECT {GAME_COLUMNS} FROM games
                     WHERE player1_id = ?1 OR player2_id = ?1
                     ORDER BY updated_at DESC"
                ),
                [user.as_str()],
            )
        })
    }

    async fn set_player_code(
        &self,
        id: GameId,
        slot: PlayerSlot,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let column = match slot {
            PlayerSlot::One => "player1_code",
            PlayerSlot::Two => "player2_code",
        };
        self.with_conn(|conn| {
            let changed = conn.execute(
                &format!(
                    "UPDATE games SET {column} = ?1, updated_at = ?2
                     WHERE id = ?3 AND status = ?4"
                ),
                params![
                    code,
                    millis(now),
                    id.0.to_string(),
                    GameStatus::CodeSelection.as_str(),
                ],
            )?;
            Ok(changed == 1)
        })
    }

    async fn start_game_if_ready(&self, id: GameId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE games SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = ?4
                   AND player1_code IS NOT NULL AND player2_code IS NOT NULL",
                params![
                    GameStatus::Playing.as_str(),
                    millis(now),
                    id.0.to_string(),
                    GameStatus::CodeSelection.as_str(),
                ],
            )?;
            Ok(changed == 1)
        })
    }

    async fn advance_round(
        &self,
        id: GameId,
        from: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE games SET current_round = current_round + 1, updated_at = ?1
                 WHERE id = ?2 AND status = ?3 AND current_round = ?4",
                params![
                    millis(now),
                    id.0.to_string(),
                    GameStatus::Playing.as_str(),
                    from,
                ],
            )?;
            Ok(changed == 1)
        })
    }

    async fn finish_game(
        &self,
        id: GameId,
        winner: &UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE games SET status = ?1, winner_id = ?2, updated_at = ?3
                 WHERE id = ?4 AND status = ?5
                   AND (player1_id = ?2 OR player2_id = ?2)",
                params![
                    GameStatus::Finished.as_str(),
                    winner.as_str(),
                    millis(now),
                    id.0.to_string(),
                    GameStatus::Playing.as_str(),
                ],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Moves --

    async fn insert_move(&self, mv: &Move) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO moves ({MOVE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    mv.id.0.to_string(),
                    mv.game_id.0.to_string(),
                    mv.player_id.as_str(),
                    mv.round,
                    mv.guess,
                    mv.bulls,
                    mv.cows,
                    millis(mv.created_at),
                ],
            )
            .map_err(|e| {
                insert_error(e, || {
                    format!("{} already moved in round {}", mv.player_id, mv.round)
                })
            })?;
            Ok(())
        })
    }

    async fn move_for(
        &self,
        game_id: GameId,
        player: &UserId,
        round: u32,
    ) -> Result<Option<Move>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {MOVE_COLUMNS} FROM moves
                     WHERE game_id = ?1 AND player_id = ?2 AND round = ?3"
                ),
                params![game_id.0.to_string(), player.as_str(), round],
                MoveRow::read,
            )
            .optional()?
            .map(MoveRow::into_move)
            .transpose()
        })
    }

    async fn count_moves(&self, game_id: GameId, round: u32) -> Result<u32, StoreError> {
        self.with_conn(|conn| {
            let n: u32 = conn.query_row(
                "SELECT COUNT(*) FROM moves WHERE game_id = ?1 AND round = ?2",
                params![game_id.0.to_string(), round],
                |r| r.get(0),
            )?;
            Ok(n)
        })
    }

    async fn moves_for_game(&self, game_id: GameId) -> Result<Vec<Move>, StoreError> {
        self.with_conn(|conn| {
            query_moves(
                conn,
                &format!(
                    "SELECT {MOVE_COLUMNS} FROM moves
                     WHERE game_id = ?1
                     ORDER BY round, created_at, rowid"
                ),
                [game_id.0.to_string()],
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_round_trip_at_millisecond_precision() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(from_millis(millis(at)).unwrap(), at);
    }

    #[test]
    fn test_parse_uuid_rejects_garbage() {
        assert!(matches!(parse_uuid("not-a-uuid"), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_open_in_memory_migrates_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        let version: i64 = store
            .with_conn(|conn| {
                migrations::run(conn)?;
                Ok(conn.query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(version, 1);
    }
}
