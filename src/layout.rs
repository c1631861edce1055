// src/layout.rs
//! Fixed on-disk layout of an installation's metadata
//!
//! The directory and file names here are persisted contracts shared with
//! existing installations and bundles. They must not change.

use std::path::{Path, PathBuf};

/// Directory holding the versioned metadata documents
pub const METADATA_DIR: &str = ".installation";

/// Directory holding the provisioning engine's own state
pub const PROVISIONING_DIR: &str = ".galleon";

pub const MANIFEST_FILE_NAME: &str = "manifest.yaml";
pub const CHANNELS_FILE_NAME: &str = "channels.yaml";
pub const REPOS_FILE_NAME: &str = "repos.yaml";
pub const PROVISIONING_FILE_NAME: &str = "provisioning.xml";

/// Revision history directory, inside the metadata directory
pub const HISTORY_DIR: &str = ".history";

/// Revision history database file name
pub const HISTORY_DB_NAME: &str = "states.db";

/// Paths of every metadata file for one installation base directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    base: PathBuf,
}

impl Layout {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }

    /// Installation base directory
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.base.join(METADATA_DIR)
    }

    pub fn provisioning_dir(&self) -> PathBuf {
        self.base.join(PROVISIONING_DIR)
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.metadata_dir().join(MANIFEST_FILE_NAME)
    }

    pub fn channels_file(&self) -> PathBuf {
        self.metadata_dir().join(CHANNELS_FILE_NAME)
    }

    pub fn repos_file(&self) -> PathBuf {
        self.metadata_dir().join(REPOS_FILE_NAME)
    }

    pub fn provisioning_file(&self) -> PathBuf {
        self.provisioning_dir().join(PROVISIONING_FILE_NAME)
    }

    /// Directory owned by the revision history backend
    pub fn history_dir(&self) -> PathBuf {
        self.metadata_dir().join(HISTORY_DIR)
    }

    pub fn history_db(&self) -> PathBuf {
        self.history_dir().join(HISTORY_DB_NAME)
    }
}

/// Whether a file name inside the metadata directory is covered by snapshots
///
/// Hidden entries (history database, staging files) are never tracked.
pub fn is_tracked_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.')
}
