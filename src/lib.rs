// src/lib.rs

//! Stowage installation metadata store
//!
//! Keeps the metadata of an installation assembled from versioned artifacts
//! as one consistent, versioned, portable unit.
//!
//! # Architecture
//!
//! - Four documents: manifest, channel list, repository list (YAML) and the
//!   provisioning config (XML, read only)
//! - Atomic persist: documents are staged and swapped in together, then
//!   recorded as a saved state, or nothing changes
//! - Append-only history: rollback records a new state, never erases one
//! - Bundles: the four documents in one tar.gz, importable anywhere

pub mod bundle;
pub mod channel;
pub mod config;
pub mod document;
mod error;
pub mod history;
pub mod layout;
pub mod manifest;
pub mod metadata;
pub mod provisioning;
pub mod repository;

pub use channel::{ChannelRef, ChannelSource};
pub use config::StoreOptions;
pub use error::{Cause, Error, Result};
pub use history::{
    FileDiff, MemoryRevisionStore, RevisionError, RevisionStore, SavedState,
    SqliteRevisionStore, StateKind,
};
pub use layout::Layout;
pub use manifest::{Artifact, ArtifactChange, ArtifactKey, Manifest};
pub use metadata::InstallationMetadata;
pub use provisioning::{
    ProvisioningConfig, ProvisioningError, ProvisioningParser, XmlProvisioningParser,
};
pub use repository::{Repository, parse_definitions};
