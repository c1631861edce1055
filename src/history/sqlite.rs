// src/history/sqlite.rs

//! SQLite-backed revision history
//!
//! The database lives inside the metadata directory (`.history/states.db`),
//! which keeps it out of the tracked file set. Each commit is written in a
//! single transaction: the state row and the full content of every tracked
//! file, with its SHA-256 digest. Digests are checked again on load.

use super::schema;
use super::{
    FileDiff, RevisionError, RevisionStore, SavedState, Snapshot, StateKind, revert_directory,
    snapshot_directory,
};
use crate::config::DEFAULT_AUTHOR;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Revision history stored in an SQLite database
pub struct SqliteRevisionStore {
    conn: Connection,
    author: String,
}

impl SqliteRevisionStore {
    /// Open (or create) the history database at `db_path`
    pub fn open(db_path: &Path) -> Result<Self, RevisionError> {
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent).map_err(|e| RevisionError::io(parent, e))?;
        }

        let conn = Connection::open(db_path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        schema::migrate(&conn)?;

        debug!("Opened history database {}", db_path.display());
        Ok(Self {
            conn,
            author: DEFAULT_AUTHOR.to_string(),
        })
    }

    /// Author recorded on states committed through this store
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    fn row_id(&self, state: &SavedState) -> Result<i64, RevisionError> {
        self.conn
            .query_row(
                "SELECT id FROM saved_states WHERE uuid = ?1",
                [&state.id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| RevisionError::UnknownState(state.id.clone()))
    }

    fn load_files(&self, state: &SavedState) -> Result<Snapshot, RevisionError> {
        let state_id = self.row_id(state)?;

        let mut stmt = self
            .conn
            .prepare("SELECT name, sha256, content FROM state_files WHERE state_id = ?1")?;
        let rows = stmt
            .query_map([state_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut files = Snapshot::new();
        for (name, digest, content) in rows {
            verify_digest(state, &name, &digest, &content)?;
            files.insert(name, content);
        }
        Ok(files)
    }

    fn load_file(&self, state: &SavedState, name: &str) -> Result<Option<Vec<u8>>, RevisionError> {
        let state_id = self.row_id(state)?;

        let row: Option<(String, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT sha256, content FROM state_files WHERE state_id = ?1 AND name = ?2",
                params![state_id, name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((digest, content)) => {
                verify_digest(state, name, &digest, &content)?;
                Ok(Some(content))
            }
            None => Ok(None),
        }
    }

    fn from_row(row: &Row) -> rusqlite::Result<SavedState> {
        let kind: String = row.get(2)?;
        let kind = kind
            .parse::<StateKind>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

        let created_at: String = row.get(5)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?
            .with_timezone(&Utc);

        Ok(SavedState {
            id: row.get(0)?,
            number: row.get(1)?,
            kind,
            summary: row.get(3)?,
            author: row.get(4)?,
            created_at,
        })
    }
}

impl RevisionStore for SqliteRevisionStore {
    fn commit(
        &mut self,
        directory: &Path,
        kind: StateKind,
        summary: &str,
    ) -> Result<SavedState, RevisionError> {
        let files = snapshot_directory(directory)?;

        let tx = self.conn.transaction()?;
        let number: i64 = tx.query_row(
            "SELECT COALESCE(MAX(number), 0) + 1 FROM saved_states",
            [],
            |row| row.get(0),
        )?;

        let state = SavedState {
            id: Uuid::new_v4().to_string(),
            number,
            kind,
            summary: summary.to_string(),
            author: self.author.clone(),
            created_at: Utc::now(),
        };

        tx.execute(
            "INSERT INTO saved_states (uuid, number, kind, summary, author, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &state.id,
                state.number,
                state.kind.as_str(),
                &state.summary,
                &state.author,
                state.created_at.to_rfc3339()
            ],
        )?;
        let state_id = tx.last_insert_rowid();

        for (name, content) in &files {
            tx.execute(
                "INSERT INTO state_files (state_id, name, sha256, content) VALUES (?1, ?2, ?3, ?4)",
                params![state_id, name, digest(content), content],
            )?;
        }
        tx.commit()?;

        info!(
            "Recorded state #{} ({}): {} file(s)",
            state.number,
            state.kind,
            files.len()
        );
        Ok(state)
    }

    fn list_revisions(&self) -> Result<Vec<SavedState>, RevisionError> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, number, kind, summary, author, created_at
             FROM saved_states ORDER BY number DESC",
        )?;
        let states = stmt
            .query_map([], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(states)
    }

    fn revert(
        &mut self,
        directory: &Path,
        target: &SavedState,
    ) -> Result<SavedState, RevisionError> {
        let target_files = self.load_files(target)?;
        let head_files = match self.list_revisions()?.first() {
            Some(head) => self.load_files(head)?,
            None => Snapshot::new(),
        };

        let summary = format!("Rollback to state #{}", target.number);
        revert_directory(directory, &head_files, &target_files, || {
            self.commit(directory, StateKind::Rollback, &summary)
        })
    }

    fn diff(
        &self,
        from: &SavedState,
        to: &SavedState,
        file_name: &str,
    ) -> Result<FileDiff, RevisionError> {
        let old = self.load_file(from, file_name)?;
        let new = self.load_file(to, file_name)?;

        Ok(FileDiff {
            file_name: file_name.to_string(),
            old: old.map(|c| String::from_utf8_lossy(&c).into_owned()),
            new: new.map(|c| String::from_utf8_lossy(&c).into_owned()),
        })
    }
}

fn digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

fn verify_digest(
    state: &SavedState,
    name: &str,
    expected: &str,
    content: &[u8],
) -> Result<(), RevisionError> {
    let actual = digest(content);
    if actual != expected {
        return Err(RevisionError::Corrupted(format!(
            "{} in state #{}: expected sha256 {}, got {}",
            name, state.number, expected, actual
        )));
    }
    Ok(())
}
