// src/history/schema.rs

//! Schema of the history database and its migrations

use rusqlite::Connection;
use tracing::{debug, info};

/// Migrations in order; entry `n` brings the schema to version `n + 1`
const MIGRATIONS: &[fn(&Connection) -> rusqlite::Result<()>] = &[migrate_v1];

/// Current schema version
pub const SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

/// Highest applied schema version, 0 for a fresh database
pub fn schema_version(conn: &Connection) -> rusqlite::Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version.unwrap_or(0))
}

/// Apply all pending migrations, each in its own transaction
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    let applied = schema_version(conn)?;
    debug!("History schema version: {}", applied);

    for (idx, step) in MIGRATIONS.iter().enumerate().skip(applied.max(0) as usize) {
        let version = idx as i32 + 1;
        info!("Applying history migration to version {}", version);

        let tx = conn.unchecked_transaction()?;
        step(&tx)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
        tx.commit()?;
    }

    Ok(())
}

/// Initial schema
///
/// - saved_states: one row per recorded revision
/// - state_files: full content of every tracked file in a revision
fn migrate_v1(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE saved_states (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            number INTEGER NOT NULL UNIQUE,
            kind TEXT NOT NULL CHECK(kind IN ('install', 'update', 'rollback')),
            summary TEXT NOT NULL,
            author TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE state_files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            state_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            sha256 TEXT NOT NULL,
            content BLOB NOT NULL,
            UNIQUE(state_id, name),
            FOREIGN KEY (state_id) REFERENCES saved_states(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_state_files_state ON state_files(state_id);
        ",
    )
}
