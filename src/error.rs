// src/error.rs

//! Error types for the installation metadata store
//!
//! Every failure surfaced by the public API is one of four kinds. Leaf
//! modules keep their own narrow error enums ([`DocumentError`],
//! [`ProvisioningError`], [`RevisionError`]) and the store folds them into
//! [`Error::Metadata`], keeping the original error as the source.
//!
//! [`DocumentError`]: crate::document::DocumentError
//! [`ProvisioningError`]: crate::provisioning::ProvisioningError
//! [`RevisionError`]: crate::history::RevisionError

use std::path::PathBuf;
use thiserror::Error;

/// Boxed underlying cause carried by [`Error::Metadata`]
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or non-existent repository definition, with the exact input
    #[error("Invalid repository definition: {0}")]
    InvalidRepositoryDefinition(String),

    /// Failure reading, writing or parsing metadata, or talking to the history backend
    #[error("{message}")]
    Metadata {
        message: String,
        #[source]
        source: Cause,
    },

    /// Bundle archive lacking one or more of the required entries
    #[error("Invalid metadata bundle {}: missing {}", path.display(), missing.join(", "))]
    InvalidBundle { path: PathBuf, missing: Vec<String> },

    /// Operation needs a live revision history the store does not have
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl Error {
    /// Wrap an underlying failure into [`Error::Metadata`]
    pub fn metadata(message: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self::Metadata {
            message: message.into(),
            source: source.into(),
        }
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;
