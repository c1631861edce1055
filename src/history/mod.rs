// src/history/mod.rs

//! Revision history of the metadata directory
//!
//! Every persist of the metadata documents is recorded as a saved state: a
//! full snapshot of the tracked files in the metadata directory. Saved states
//! can be listed (newest first), compared file by file, and restored. A
//! restore never rewrites history; it is recorded as a new state of kind
//! [`StateKind::Rollback`].
//!
//! The store only talks to history through the [`RevisionStore`] trait:
//! - [`SqliteRevisionStore`]: snapshots kept in an SQLite database inside the
//!   metadata directory
//! - [`MemoryRevisionStore`]: in-process log for tests

pub mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryRevisionStore;
pub use sqlite::SqliteRevisionStore;

use crate::layout::is_tracked_name;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Tracked file name -> content
pub type Snapshot = BTreeMap<String, Vec<u8>>;

#[derive(Error, Debug)]
pub enum RevisionError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("History database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Unknown saved state: {0}")]
    UnknownState(String),

    #[error("History is corrupted: {0}")]
    Corrupted(String),

    #[error("History backend unavailable: {0}")]
    Unavailable(String),
}

impl RevisionError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Operation that produced a saved state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    /// First recorded state of an installation
    Install,
    /// Metadata changed by an update
    Update,
    /// Metadata restored to an earlier state
    Rollback,
}

impl StateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
            Self::Rollback => "rollback",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for StateKind {
    type Err = RevisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "install" => Ok(Self::Install),
            "update" => Ok(Self::Update),
            "rollback" => Ok(Self::Rollback),
            other => Err(RevisionError::Corrupted(format!(
                "unknown state kind '{}'",
                other
            ))),
        }
    }
}

/// A recorded revision of the metadata directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedState {
    /// Opaque identifier, stable for the life of the history
    pub id: String,
    /// Position in history, strictly increasing
    pub number: i64,
    pub kind: StateKind,
    pub summary: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for SavedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] {} ({}, {})",
            self.number,
            self.kind,
            self.summary,
            self.author,
            self.created_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// One file as it was in two saved states
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub file_name: String,
    /// Content in the older state, `None` if the file was absent
    pub old: Option<String>,
    /// Content in the newer state, `None` if the file was absent
    pub new: Option<String>,
}

impl FileDiff {
    pub fn is_unchanged(&self) -> bool {
        self.old == self.new
    }

    /// Render as a unified diff
    pub fn unified(&self) -> String {
        let old = self.old.as_deref().unwrap_or("");
        let new = self.new.as_deref().unwrap_or("");
        diffy::create_patch(old, new).to_string()
    }
}

/// Versioned-snapshot service for one metadata directory
pub trait RevisionStore {
    /// Record the tracked files of `directory` as a new saved state
    fn commit(
        &mut self,
        directory: &Path,
        kind: StateKind,
        summary: &str,
    ) -> Result<SavedState, RevisionError>;

    /// All saved states, most recent first
    fn list_revisions(&self) -> Result<Vec<SavedState>, RevisionError>;

    /// Restore the tracked files of `directory` to `target`
    ///
    /// The restore itself is recorded as a new [`StateKind::Rollback`] state,
    /// which is returned. If it cannot be recorded, the tracked files are left
    /// as they were.
    fn revert(&mut self, directory: &Path, target: &SavedState)
    -> Result<SavedState, RevisionError>;

    /// Content of `file_name` in two saved states
    fn diff(
        &self,
        from: &SavedState,
        to: &SavedState,
        file_name: &str,
    ) -> Result<FileDiff, RevisionError>;
}

/// Read the tracked files directly inside `directory`
pub fn snapshot_directory(directory: &Path) -> Result<Snapshot, RevisionError> {
    let mut snapshot = Snapshot::new();

    let entries = fs::read_dir(directory).map_err(|e| RevisionError::io(directory, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| RevisionError::io(directory, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| RevisionError::io(&path, e))?;
        if !file_type.is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !is_tracked_name(&name) {
            continue;
        }

        let content = fs::read(&path).map_err(|e| RevisionError::io(&path, e))?;
        snapshot.insert(name, content);
    }

    debug!(
        "Snapshot of {}: {} tracked file(s)",
        directory.display(),
        snapshot.len()
    );
    Ok(snapshot)
}

/// Bring `directory` to the `target` snapshot
///
/// Files from `target` are written if their content differs on disk. Files
/// recorded in `head` but absent from `target` are removed. Anything else in
/// the directory is left alone.
pub fn restore_directory(
    directory: &Path,
    head: &Snapshot,
    target: &Snapshot,
) -> Result<(), RevisionError> {
    fs::create_dir_all(directory).map_err(|e| RevisionError::io(directory, e))?;

    for (name, content) in target {
        let path = directory.join(name);
        let unchanged = fs::read(&path).is_ok_and(|current| current == *content);
        if unchanged {
            continue;
        }
        write_atomic(&path, content)?;
        debug!("Restored {}", path.display());
    }

    for name in head.keys().filter(|name| !target.contains_key(*name)) {
        let path = directory.join(name);
        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(RevisionError::io(&path, e)),
        }
    }

    Ok(())
}

/// Restore `directory` to `target`, then record the result with `commit`
///
/// When the restore or the commit fails, the tracked files are put back to
/// what they held before the call and the original error is returned.
pub fn revert_directory<F>(
    directory: &Path,
    head: &Snapshot,
    target: &Snapshot,
    commit: F,
) -> Result<SavedState, RevisionError>
where
    F: FnOnce() -> Result<SavedState, RevisionError>,
{
    fs::create_dir_all(directory).map_err(|e| RevisionError::io(directory, e))?;
    let current = snapshot_directory(directory)?;

    let result = restore_directory(directory, head, target).and_then(|()| commit());
    if result.is_err() {
        let undo = snapshot_directory(directory)
            .and_then(|partial| restore_directory(directory, &partial, &current));
        match undo {
            Ok(()) => debug!("Put back tracked files of {}", directory.display()),
            Err(e) => warn!(
                "Unable to put back tracked files of {}: {}",
                directory.display(),
                e
            ),
        }
    }
    result
}

/// Write a file via a hidden sibling temp file and a rename
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), RevisionError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let mut file = fs::File::create(&temp_path).map_err(|e| RevisionError::io(&temp_path, e))?;
    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| RevisionError::io(&temp_path, e))?;

    fs::rename(&temp_path, path).map_err(|e| RevisionError::io(path, e))
}
