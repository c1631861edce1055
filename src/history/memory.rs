// src/history/memory.rs

//! In-process revision history
//!
//! Clones share the same log, so a test can hand one clone to the store and
//! keep another to inspect what was committed or to make the next commit fail.

use super::{
    FileDiff, RevisionError, RevisionStore, SavedState, Snapshot, StateKind, revert_directory,
    snapshot_directory,
};
use crate::config::DEFAULT_AUTHOR;
use chrono::Utc;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Log {
    states: Vec<(SavedState, Snapshot)>,
    fail_next_commit: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryRevisionStore {
    log: Arc<Mutex<Log>>,
    author: String,
}

impl Default for MemoryRevisionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRevisionStore {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Log::default())),
            author: DEFAULT_AUTHOR.to_string(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Number of states recorded so far
    pub fn commit_count(&self) -> usize {
        self.log().states.len()
    }

    /// Make the next commit fail without recording anything
    pub fn fail_next_commit(&self) {
        self.log().fail_next_commit = true;
    }

    /// Files recorded for `state`
    pub fn files(&self, state: &SavedState) -> Option<Snapshot> {
        self.log()
            .states
            .iter()
            .find(|(s, _)| s.id == state.id)
            .map(|(_, files)| files.clone())
    }

    fn log(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RevisionStore for MemoryRevisionStore {
    fn commit(
        &mut self,
        directory: &Path,
        kind: StateKind,
        summary: &str,
    ) -> Result<SavedState, RevisionError> {
        let mut log = self.log();
        if log.fail_next_commit {
            log.fail_next_commit = false;
            return Err(RevisionError::Unavailable(
                "commit rejected by test hook".to_string(),
            ));
        }

        let files = snapshot_directory(directory)?;
        let state = SavedState {
            id: Uuid::new_v4().to_string(),
            number: log.states.last().map_or(1, |(s, _)| s.number + 1),
            kind,
            summary: summary.to_string(),
            author: self.author.clone(),
            created_at: Utc::now(),
        };
        log.states.push((state.clone(), files));
        Ok(state)
    }

    fn list_revisions(&self) -> Result<Vec<SavedState>, RevisionError> {
        Ok(self
            .log()
            .states
            .iter()
            .rev()
            .map(|(s, _)| s.clone())
            .collect())
    }

    fn revert(
        &mut self,
        directory: &Path,
        target: &SavedState,
    ) -> Result<SavedState, RevisionError> {
        let target_files = self
            .files(target)
            .ok_or_else(|| RevisionError::UnknownState(target.id.clone()))?;
        let head_files = {
            let log = self.log();
            log.states
                .last()
                .map(|(_, files)| files.clone())
                .unwrap_or_default()
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
        let content = |state: &SavedState| -> Result<Option<String>, RevisionError> {
            let files = self
                .files(state)
                .ok_or_else(|| RevisionError::UnknownState(state.id.clone()))?;
            Ok(files
                .get(file_name)
                .map(|c| String::from_utf8_lossy(c).into_owned()))
        };

        Ok(FileDiff {
            file_name: file_name.to_string(),
            old: content(from)?,
            new: content(to)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_clones_share_log() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("manifest.yaml"), "v1").unwrap();

        let observer = MemoryRevisionStore::new();
        let mut store = observer.clone();
        store.commit(temp.path(), StateKind::Install, "init").unwrap();

        assert_eq!(observer.commit_count(), 1);
    }

    #[test]
    fn test_fail_next_commit() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = MemoryRevisionStore::new();

        store.fail_next_commit();
        assert!(store.commit(temp.path(), StateKind::Install, "init").is_err());
        assert_eq!(store.commit_count(), 0);

        store.commit(temp.path(), StateKind::Install, "init").unwrap();
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn test_failed_revert_keeps_directory() {
        let temp = tempfile::tempdir().unwrap();
        let manifest = temp.path().join("manifest.yaml");
        let mut store = MemoryRevisionStore::new();

        fs::write(&manifest, "v1").unwrap();
        let first = store.commit(temp.path(), StateKind::Install, "init").unwrap();
        fs::write(&manifest, "v2").unwrap();
        store.commit(temp.path(), StateKind::Update, "bump").unwrap();

        store.fail_next_commit();
        assert!(store.revert(temp.path(), &first).is_err());

        assert_eq!(fs::read_to_string(&manifest).unwrap(), "v2");
        assert_eq!(store.commit_count(), 2);
    }

    #[test]
    fn test_revert_and_numbering() {
        let temp = tempfile::tempdir().unwrap();
        let manifest = temp.path().join("manifest.yaml");
        let mut store = MemoryRevisionStore::new().with_author("alice");

        fs::write(&manifest, "v1").unwrap();
        let first = store.commit(temp.path(), StateKind::Install, "init").unwrap();
        fs::write(&manifest, "v2").unwrap();
        let second = store.commit(temp.path(), StateKind::Update, "bump").unwrap();

        let rollback = store.revert(temp.path(), &first).unwrap();
        assert_eq!(rollback.number, 3);
        assert_eq!(rollback.author, "alice");
        assert_eq!(fs::read_to_string(&manifest).unwrap(), "v1");

        let numbers: Vec<i64> = store
            .list_revisions()
            .unwrap()
            .iter()
            .map(|s| s.number)
            .collect();
        assert_eq!(numbers, vec![3, 2, 1]);

        let diff = store.diff(&first, &second, "manifest.yaml").unwrap();
        assert_eq!(diff.old.as_deref(), Some("v1"));
        assert_eq!(diff.new.as_deref(), Some("v2"));
    }
}
