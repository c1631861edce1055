// src/repository/mod.rs

//! Artifact repositories backing the installation's channels
//!
//! This module provides:
//! - The `(id, url)` repository descriptor stored in `repos.yaml`
//! - Reading and writing the repository list document
//! - Parsing user-supplied repository definitions (`id::location` or a bare
//!   location) into validated descriptors

mod definition;
pub mod location;

pub use definition::{GENERATED_ID_PREFIX, ID_SEPARATOR, parse_definitions};

use crate::document::{self, DocumentError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// A network or file-system location artifacts are fetched from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub url: String,
}

impl Repository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }

    /// Whether the location is a network URL rather than a local path
    pub fn is_remote(&self) -> bool {
        self.url.starts_with("http:") || self.url.starts_with("https:")
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.id, self.url)
    }
}

/// Check the list-level invariants: non-empty, unique ids
pub fn check_repositories(repositories: &[Repository]) -> Result<(), DocumentError> {
    let mut seen = HashSet::new();
    for repo in repositories {
        if repo.id.trim().is_empty() {
            return Err(DocumentError::Invalid(format!(
                "repository '{}' has an empty id",
                repo.url
            )));
        }
        if repo.url.trim().is_empty() {
            return Err(DocumentError::Invalid(format!(
                "repository '{}' has an empty url",
                repo.id
            )));
        }
        if !seen.insert(repo.id.as_str()) {
            return Err(DocumentError::Invalid(format!(
                "repository id '{}' is used more than once",
                repo.id
            )));
        }
    }
    Ok(())
}

/// Read `repos.yaml`; an empty file is an empty list
pub fn read_repositories(path: &Path) -> Result<Vec<Repository>, DocumentError> {
    let repositories: Option<Vec<Repository>> = document::read_yaml(path)?;
    let repositories = repositories.unwrap_or_default();
    check_repositories(&repositories)?;
    Ok(repositories)
}

pub fn parse_repositories(content: &str) -> Result<Vec<Repository>, DocumentError> {
    let repositories: Option<Vec<Repository>> = document::parse_yaml(content)?;
    let repositories = repositories.unwrap_or_default();
    check_repositories(&repositories)?;
    Ok(repositories)
}

pub fn repositories_to_yaml(repositories: &[Repository]) -> Result<String, DocumentError> {
    document::to_yaml(repositories)
}
