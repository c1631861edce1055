// src/document.rs

//! Shared plumbing for the YAML metadata documents
//!
//! The manifest, channel list and repository list are all small YAML files
//! read whole and written whole. Parsing failures carry the file path so the
//! store can report which document is at fault.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse document: {0}")]
    Syntax(#[source] serde_yaml::Error),

    #[error("Failed to serialize document: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("Invalid document: {0}")]
    Invalid(String),
}

/// Read and deserialize a YAML document from disk
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, DocumentError> {
    let content = fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_yaml(&content).map_err(|err| match err {
        DocumentError::Syntax(source) => DocumentError::Parse {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Parse a YAML document held in memory
///
/// A blank document reads as YAML `null`.
pub fn parse_yaml<T: DeserializeOwned>(content: &str) -> Result<T, DocumentError> {
    let content = if content.trim().is_empty() { "null" } else { content };
    serde_yaml::from_str(content).map_err(DocumentError::Syntax)
}

pub fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String, DocumentError> {
    serde_yaml::to_string(value).map_err(DocumentError::Serialize)
}
