// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use stowage::{
    Artifact, ChannelRef, InstallationMetadata, Layout, Repository, SqliteRevisionStore,
    XmlProvisioningParser,
};
use tempfile::TempDir;

pub const TEST_AUTHOR: &str = "integration";

pub const PROVISIONING_XML: &str = r#"<?xml version="1.0" ?>
<installation xmlns="urn:jboss:galleon:provisioning:3.0">
    <feature-pack location="org.example:server-galleon-pack:zip">
        <default-configs inherit="false"/>
    </feature-pack>
    <options>
        <option name="optional-packages" value="passive+"/>
    </options>
</installation>
"#;

/// Create an empty installation holding only its provisioning config.
///
/// Keep the TempDir alive to prevent cleanup.
pub fn setup_installation() -> TempDir {
    let temp_dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(temp_dir.path());
    fs::create_dir_all(layout.provisioning_dir()).unwrap();
    fs::write(layout.provisioning_file(), PROVISIONING_XML).unwrap();
    temp_dir
}

pub fn sample_artifacts() -> Vec<Artifact> {
    vec![
        Artifact::new("org.example", "server-core", "1.0.0"),
        Artifact::new("org.example", "server-web", "1.0.0").with_extension("war"),
        Artifact::new("org.example", "server-core", "1.0.0").with_classifier("tests"),
    ]
}

pub fn sample_channels() -> Vec<ChannelRef> {
    vec![
        ChannelRef::coordinate("server", "org.example.channels:server"),
        ChannelRef::location("extras", "https://channels.example.test/extras.yaml"),
    ]
}

pub fn sample_repositories() -> Vec<Repository> {
    vec![
        Repository::new("central", "https://repo.example.test/maven2"),
        Repository::new("mirror", "http://mirror.example.test/maven2"),
    ]
}

/// SQLite history for the installation at `base`
pub fn sqlite_history(base: &Path) -> Box<SqliteRevisionStore> {
    let store = SqliteRevisionStore::open(&Layout::new(base).history_db())
        .unwrap()
        .with_author(TEST_AUTHOR);
    Box::new(store)
}

/// Create the sample metadata at `base`, not yet persisted
pub fn create_store(base: &Path) -> InstallationMetadata {
    InstallationMetadata::create_with(
        base,
        sample_artifacts(),
        sample_channels(),
        sample_repositories(),
        sqlite_history(base),
        Box::new(XmlProvisioningParser),
    )
    .unwrap()
}

/// Reopen the installation at `base` with SQLite history
pub fn open_store(base: &Path) -> InstallationMetadata {
    InstallationMetadata::open_with(base, sqlite_history(base), Box::new(XmlProvisioningParser))
        .unwrap()
}

/// An installation with the sample metadata persisted once
pub fn seeded_installation() -> TempDir {
    let temp_dir = setup_installation();
    let mut store = create_store(temp_dir.path());
    store.persist().unwrap();
    temp_dir
}
