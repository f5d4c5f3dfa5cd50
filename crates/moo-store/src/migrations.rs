use rusqlite::Connection;
use tracing::info;

pub(crate) fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("running migration v1 (rooms, games, moves)");
        conn.execute_batch(
            "
            CREATE TABLE rooms (
                id TEXT PRIMARY KEY,
                code TEXT NOT NULL,
                created_by TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'waiting',
                empty_at INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE UNIQUE INDEX idx_rooms_code ON rooms(code);
            CREATE INDEX idx_rooms_status_empty_at ON rooms(status, empty_at);

            CREATE TABLE games (
                id TEXT PRIMARY KEY,
                room_id TEXT NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
                player1_id TEXT NOT NULL,
                player2_id TEXT NOT NULL,
                player1_code TEXT,
                player2_code TEXT,
                current_round INTEGER NOT NULL DEFAULT 1,
                status TEXT NOT NULL DEFAULT 'code_selection',
                winner_id TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                CHECK (player1_id <> player2_id)
            );
            CREATE UNIQUE INDEX idx_games_room ON games(room_id);
            CREATE INDEX idx_games_player1 ON games(player1_id);
            CREATE INDEX idx_games_player2 ON games(player2_id);

            CREATE TABLE moves (
                id TEXT PRIMARY KEY,
                game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                player_id TEXT NOT NULL,
                round INTEGER NOT NULL CHECK (round > 0),
                guess TEXT NOT NULL,
                bulls INTEGER NOT NULL,
                cows INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                CHECK (bulls + cows <= 4)
            );
            CREATE UNIQUE INDEX idx_moves_player_round ON moves(game_id, player_id, round);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
