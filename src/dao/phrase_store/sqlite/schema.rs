use rusqlite::{Connection, Result as SqlResult};

/// Tables of the relational store. Column names follow the layout of the
/// mobile app database so existing files can be opened as is.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    createdAt INTEGER
);

CREATE TABLE IF NOT EXISTS teams (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    color TEXT NOT NULL,
    createdAt INTEGER
);

CREATE TABLE IF NOT EXISTS team_players (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    teamId INTEGER NOT NULL,
    playerId INTEGER NOT NULL,
    FOREIGN KEY (teamId) REFERENCES teams (id) ON DELETE CASCADE,
    FOREIGN KEY (playerId) REFERENCES players (id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    createdAt INTEGER
);

CREATE TABLE IF NOT EXISTS phrases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    categoryId INTEGER NOT NULL,
    createdAt INTEGER,
    FOREIGN KEY (categoryId) REFERENCES categories (id) ON DELETE CASCADE
);
";

/// Create missing tables and enable foreign keys on `conn`.
pub(super) fn ensure_schema(conn: &Connection) -> SqlResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)
}
