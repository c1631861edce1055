// src/metadata/mod.rs

//! Installation metadata store
//!
//! [`InstallationMetadata`] owns the four metadata documents of one
//! installation and, for a live installation, its revision history:
//!
//! ```text
//! <base>/.installation/manifest.yaml    Manifest
//! <base>/.installation/channels.yaml    Channel list
//! <base>/.installation/repos.yaml       Repository list
//! <base>/.installation/.history/        Revision history (not tracked)
//! <base>/.galleon/provisioning.xml      Provisioning config (read only)
//! ```
//!
//! A store is either live (opened or created over a base directory, with a
//! [`RevisionStore`]) or imported from a bundle. Imported stores can be read
//! and exported again, but every operation that needs history fails with
//! [`Error::UnsupportedOperation`].

mod staging;

use crate::channel::{self, ChannelRef};
use crate::config::StoreOptions;
use crate::error::{Error, Result};
use crate::history::{
    FileDiff, RevisionError, RevisionStore, SavedState, SqliteRevisionStore, StateKind,
};
use crate::layout::{CHANNELS_FILE_NAME, Layout, MANIFEST_FILE_NAME, REPOS_FILE_NAME};
use crate::manifest::{Artifact, ArtifactChange, Manifest};
use crate::provisioning::{ProvisioningConfig, ProvisioningParser, XmlProvisioningParser};
use crate::repository::{self, Repository};
use staging::StageError;
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// The four metadata documents as held in memory
struct Documents {
    manifest: Manifest,
    channels: Vec<ChannelRef>,
    repositories: Vec<Repository>,
    provisioning: ProvisioningConfig,
}

impl Documents {
    /// Parse all four documents from their fixed locations under `layout`
    fn read(layout: &Layout, parser: &dyn ProvisioningParser) -> Result<Self> {
        let path = layout.manifest_file();
        let manifest = Manifest::read(&path).map_err(|e| load_error("manifest", &path, e))?;

        let path = layout.channels_file();
        let channels =
            channel::read_channels(&path).map_err(|e| load_error("channel list", &path, e))?;

        let path = layout.repos_file();
        let repositories = repository::read_repositories(&path)
            .map_err(|e| load_error("repository list", &path, e))?;

        let provisioning = read_provisioning(layout, parser)?;

        debug!(
            "Loaded metadata from {}: {} artifacts, {} channels, {} repositories",
            layout.base().display(),
            manifest.len(),
            channels.len(),
            repositories.len()
        );

        Ok(Self {
            manifest,
            channels,
            repositories,
            provisioning,
        })
    }

    /// Serialized form of the documents this store writes
    fn serialize(&self) -> Result<Vec<(&'static str, Vec<u8>)>> {
        let manifest = self
            .manifest
            .to_yaml()
            .map_err(|e| Error::metadata("Unable to serialize manifest", e))?;
        let channels = channel::channels_to_yaml(&self.channels)
            .map_err(|e| Error::metadata("Unable to serialize channel list", e))?;
        let repositories = repository::repositories_to_yaml(&self.repositories)
            .map_err(|e| Error::metadata("Unable to serialize repository list", e))?;

        Ok(vec![
            (MANIFEST_FILE_NAME, manifest.into_bytes()),
            (CHANNELS_FILE_NAME, channels.into_bytes()),
            (REPOS_FILE_NAME, repositories.into_bytes()),
        ])
    }
}

enum Source {
    /// Backed by an installation directory and its revision history
    Live {
        layout: Layout,
        revisions: Box<dyn RevisionStore>,
        parser: Box<dyn ProvisioningParser>,
    },
    /// Materialized from a bundle; the files are removed with the store
    Bundle { _files: TempDir },
}

/// Metadata of one installation
pub struct InstallationMetadata {
    docs: Documents,
    source: Source,
}

impl fmt::Debug for InstallationMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("InstallationMetadata");
        if let Some(layout) = self.layout() {
            s.field("base", &layout.base());
        }
        s.field("live", &self.is_live())
            .field("artifacts", &self.docs.manifest.len())
            .field("channels", &self.docs.channels)
            .field("repositories", &self.docs.repositories)
            .finish()
    }
}

impl InstallationMetadata {
    /// Load the metadata of the installation at `base`
    ///
    /// History is kept in SQLite and states are attributed per
    /// [`StoreOptions::from_env`].
    pub fn open(base: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(base, &StoreOptions::from_env())
    }

    pub fn open_with_options(base: impl AsRef<Path>, options: &StoreOptions) -> Result<Self> {
        let layout = Layout::new(base);
        let parser = XmlProvisioningParser;
        let docs = Documents::read(&layout, &parser)?;
        let revisions = open_history(&layout, options)?;

        Ok(Self::live(docs, layout, Box::new(revisions), Box::new(parser)))
    }

    /// Load the metadata at `base` with an explicit history backend and parser
    pub fn open_with(
        base: impl AsRef<Path>,
        revisions: Box<dyn RevisionStore>,
        parser: Box<dyn ProvisioningParser>,
    ) -> Result<Self> {
        let layout = Layout::new(base);
        let docs = Documents::read(&layout, parser.as_ref())?;
        Ok(Self::live(docs, layout, revisions, parser))
    }

    /// Start the metadata of an installation from scratch
    ///
    /// No manifest, channel or repository file needs to exist yet, but the
    /// provisioning config must. No document is written until [`persist`],
    /// but the history database is opened, and created if missing, right away.
    ///
    /// [`persist`]: Self::persist
    pub fn create(
        base: impl AsRef<Path>,
        artifacts: Vec<Artifact>,
        channels: Vec<ChannelRef>,
        repositories: Vec<Repository>,
    ) -> Result<Self> {
        let layout = Layout::new(base);
        let parser = XmlProvisioningParser;
        let docs = fresh_documents(&layout, &parser, artifacts, channels, repositories)?;
        let revisions = open_history(&layout, &StoreOptions::from_env())?;

        Ok(Self::live(docs, layout, Box::new(revisions), Box::new(parser)))
    }

    pub fn create_with(
        base: impl AsRef<Path>,
        artifacts: Vec<Artifact>,
        channels: Vec<ChannelRef>,
        repositories: Vec<Repository>,
        revisions: Box<dyn RevisionStore>,
        parser: Box<dyn ProvisioningParser>,
    ) -> Result<Self> {
        let layout = Layout::new(base);
        let docs = fresh_documents(&layout, parser.as_ref(), artifacts, channels, repositories)?;
        Ok(Self::live(docs, layout, revisions, parser))
    }

    /// Import a metadata bundle written by [`export_bundle`]
    ///
    /// [`export_bundle`]: Self::export_bundle
    pub fn from_bundle(archive: impl AsRef<Path>) -> Result<Self> {
        crate::bundle::import(archive.as_ref())
    }

    /// Store over documents materialized into a temporary directory
    pub(crate) fn from_materialized(files: TempDir) -> Result<Self> {
        let layout = Layout::new(files.path());
        let docs = Documents::read(&layout, &XmlProvisioningParser)?;
        Ok(Self {
            docs,
            source: Source::Bundle { _files: files },
        })
    }

    fn live(
        docs: Documents,
        layout: Layout,
        revisions: Box<dyn RevisionStore>,
        parser: Box<dyn ProvisioningParser>,
    ) -> Self {
        Self {
            docs,
            source: Source::Live {
                layout,
                revisions,
                parser,
            },
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.docs.manifest
    }

    /// Channels in resolution order
    pub fn channels(&self) -> &[ChannelRef] {
        &self.docs.channels
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.docs.repositories
    }

    pub fn provisioning_config(&self) -> &ProvisioningConfig {
        &self.docs.provisioning
    }

    /// Layout of the installation, `None` for an imported bundle
    pub fn layout(&self) -> Option<&Layout> {
        match &self.source {
            Source::Live { layout, .. } => Some(layout),
            Source::Bundle { .. } => None,
        }
    }

    /// Whether this store has a revision history behind it
    pub fn is_live(&self) -> bool {
        matches!(self.source, Source::Live { .. })
    }

    /// Record new versions of installed artifacts, in memory only
    ///
    /// Artifacts not in the manifest are ignored. Returns how many entries
    /// actually changed version.
    pub fn register_updates<'a>(
        &mut self,
        updates: impl IntoIterator<Item = &'a Artifact>,
    ) -> usize {
        let mut changed = 0;
        for artifact in updates {
            if self.docs.manifest.update_version(artifact) {
                debug!("Registered update {}", artifact);
                changed += 1;
            }
        }
        changed
    }

    pub fn set_channels(&mut self, channels: Vec<ChannelRef>) {
        self.docs.channels = channels;
    }

    /// Replace the repository list; ids must be unique
    pub fn set_repositories(&mut self, repositories: Vec<Repository>) -> Result<()> {
        repository::check_repositories(&repositories)
            .map_err(|e| Error::metadata("Invalid repository list", e))?;
        self.docs.repositories = repositories;
        Ok(())
    }

    /// Write the manifest, channel and repository documents and record them
    ///
    /// Either every document is written and a new saved state is recorded,
    /// or the metadata directory is left as it was.
    pub fn persist(&mut self) -> Result<SavedState> {
        let Source::Live {
            layout, revisions, ..
        } = &mut self.source
        else {
            return Err(unsupported("persist"));
        };

        let documents = self.docs.serialize()?;
        let directory = layout.metadata_dir();

        let kind = if revisions
            .list_revisions()
            .map_err(|e| history_error(&directory, e))?
            .is_empty()
        {
            StateKind::Install
        } else {
            StateKind::Update
        };
        let summary = format!(
            "{} artifacts, {} channels, {} repositories",
            self.docs.manifest.len(),
            self.docs.channels.len(),
            self.docs.repositories.len()
        );

        let state = staging::replace_documents(&directory, &documents, || {
            revisions.commit(&directory, kind, &summary)
        })
        .map_err(|e| match e {
            StageError::Io { path, source } => {
                Error::metadata(format!("Unable to write {}", path.display()), source)
            }
            StageError::Commit(e) => history_error(&directory, e),
        })?;

        info!(
            "Saved installation metadata in {} as state #{}",
            directory.display(),
            state.number
        );
        Ok(state)
    }

    /// Saved states, most recent first
    pub fn history(&self) -> Result<Vec<SavedState>> {
        let Source::Live {
            layout, revisions, ..
        } = &self.source
        else {
            return Err(unsupported("history"));
        };

        revisions
            .list_revisions()
            .map_err(|e| history_error(&layout.metadata_dir(), e))
    }

    /// Restore the metadata to `target` and reload it
    ///
    /// The restore is itself recorded as a new saved state; nothing is removed
    /// from history.
    pub fn rollback(self, target: &SavedState) -> Result<Self> {
        let (layout, mut revisions, parser) = match self.source {
            Source::Live {
                layout,
                revisions,
                parser,
            } => (layout, revisions, parser),
            Source::Bundle { .. } => return Err(unsupported("rollback")),
        };

        let directory = layout.metadata_dir();
        let state = revisions
            .revert(&directory, target)
            .map_err(|e| history_error(&directory, e))?;
        info!(
            "Rolled back {} to state #{} (recorded as #{})",
            layout.base().display(),
            target.number,
            state.number
        );

        let docs = Documents::read(&layout, parser.as_ref())?;
        Ok(Self::live(docs, layout, revisions, parser))
    }

    /// The manifest as it was in `from` and as it is in the most recent saved state
    pub fn manifest_diff(&self, from: &SavedState) -> Result<FileDiff> {
        let Source::Live {
            layout, revisions, ..
        } = &self.source
        else {
            return Err(unsupported("manifest_diff"));
        };
        let directory = layout.metadata_dir();

        let head = revisions
            .list_revisions()
            .map_err(|e| history_error(&directory, e))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                history_error(&directory, RevisionError::UnknownState(from.id.clone()))
            })?;

        revisions
            .diff(from, &head, MANIFEST_FILE_NAME)
            .map_err(|e| history_error(&directory, e))
    }

    /// Artifact version changes from `from` to the most recent saved state
    pub fn changes_since(&self, from: &SavedState) -> Result<Vec<ArtifactChange>> {
        if !self.is_live() {
            return Err(unsupported("changes_since"));
        }
        let diff = self.manifest_diff(from)?;

        let parse = |content: Option<String>, which: &str| -> Result<Manifest> {
            content
                .map(|c| Manifest::from_yaml(&c))
                .transpose()
                .map(Option::unwrap_or_default)
                .map_err(|e| {
                    Error::metadata(
                        format!("Unable to parse {} of {} state", MANIFEST_FILE_NAME, which),
                        e,
                    )
                })
        };
        let old = parse(diff.old, "saved")?;
        let new = parse(diff.new, "current")?;

        Ok(old.changes_to(&new))
    }

    /// Write this store's documents into a bundle at `destination`
    pub fn export_bundle(&self, destination: impl AsRef<Path>) -> Result<PathBuf> {
        crate::bundle::export(self, destination.as_ref())
    }

    /// Documents in the form they are persisted and exported
    pub(crate) fn serialized_documents(&self) -> Result<Vec<(&'static str, Vec<u8>)>> {
        self.docs.serialize()
    }
}

fn fresh_documents(
    layout: &Layout,
    parser: &dyn ProvisioningParser,
    artifacts: Vec<Artifact>,
    channels: Vec<ChannelRef>,
    repositories: Vec<Repository>,
) -> Result<Documents> {
    repository::check_repositories(&repositories)
        .map_err(|e| Error::metadata("Invalid repository list", e))?;
    let provisioning = read_provisioning(layout, parser)?;

    Ok(Documents {
        manifest: Manifest::new(artifacts),
        channels,
        repositories,
        provisioning,
    })
}

fn read_provisioning(
    layout: &Layout,
    parser: &dyn ProvisioningParser,
) -> Result<ProvisioningConfig> {
    let path = layout.provisioning_file();
    parser
        .parse_config(&path)
        .map_err(|e| load_error("provisioning config", &path, e))
}

fn open_history(layout: &Layout, options: &StoreOptions) -> Result<SqliteRevisionStore> {
    let db = layout.history_db();
    let store = SqliteRevisionStore::open(&db).map_err(|e| {
        Error::metadata(format!("Unable to open revision history {}", db.display()), e)
    })?;
    Ok(store.with_author(options.author.clone()))
}

fn load_error(what: &str, path: &Path, source: impl Into<crate::error::Cause>) -> Error {
    Error::metadata(format!("Unable to load {} from {}", what, path.display()), source)
}

fn history_error(directory: &Path, source: RevisionError) -> Error {
    Error::metadata(
        format!("Revision history of {} failed", directory.display()),
        source,
    )
}

fn unsupported(operation: &str) -> Error {
    Error::UnsupportedOperation(format!(
        "{} needs a live installation; this metadata was imported from a bundle",
        operation
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryRevisionStore;
    use std::fs;

    const PROVISIONING: &str = r#"<installation xmlns="urn:jboss:galleon:provisioning:3.0">
    <feature-pack location="org.example:server-galleon-pack:zip"/>
</installation>
"#;

    fn installation() -> (tempfile::TempDir, Layout) {
        let temp = tempfile::tempdir().unwrap();
        let layout = Layout::new(temp.path());
        fs::create_dir_all(layout.provisioning_dir()).unwrap();
        fs::write(layout.provisioning_file(), PROVISIONING).unwrap();
        (temp, layout)
    }

    fn artifacts() -> Vec<Artifact> {
        vec![
            Artifact::new("org.example", "core", "1.0.0"),
            Artifact::new("org.example", "web", "2.0.0"),
        ]
    }

    fn create(layout: &Layout, history: &MemoryRevisionStore) -> InstallationMetadata {
        InstallationMetadata::create_with(
            layout.base(),
            artifacts(),
            vec![ChannelRef::coordinate("main", "org.example:channel")],
            vec![Repository::new("central", "https://repo.example.test/maven2")],
            Box::new(history.clone()),
            Box::new(XmlProvisioningParser),
        )
        .unwrap()
    }

    #[test]
    fn test_create_requires_provisioning() {
        let temp = tempfile::tempdir().unwrap();
        let err = InstallationMetadata::create_with(
            temp.path(),
            artifacts(),
            Vec::new(),
            Vec::new(),
            Box::new(MemoryRevisionStore::new()),
            Box::new(XmlProvisioningParser),
        )
        .unwrap_err();

        assert!(matches!(err, Error::Metadata { .. }));
        assert!(err.to_string().contains("provisioning.xml"));
    }

    #[test]
    fn test_first_persist_is_install() {
        let (_temp, layout) = installation();
        let history = MemoryRevisionStore::new();
        let mut store = create(&layout, &history);

        let first = store.persist().unwrap();
        assert_eq!(first.kind, StateKind::Install);
        assert!(layout.manifest_file().exists());
        assert!(layout.channels_file().exists());
        assert!(layout.repos_file().exists());

        let second = store.persist().unwrap();
        assert_eq!(second.kind, StateKind::Update);
        assert_eq!(history.commit_count(), 2);
    }

    #[test]
    fn test_register_updates_keeps_entry_count() {
        let (_temp, layout) = installation();
        let mut store = create(&layout, &MemoryRevisionStore::new());

        let update = Artifact::new("org.example", "core", "1.1.0");
        let unknown = Artifact::new("org.other", "core", "9.0.0");

        assert_eq!(store.register_updates([&update, &unknown]), 1);
        assert_eq!(store.register_updates([&update]), 0);
        assert_eq!(store.manifest().len(), 2);
        assert_eq!(
            store.manifest().find(&update.key()).unwrap().version,
            "1.1.0"
        );
    }

    #[test]
    fn test_failed_commit_leaves_directory_unchanged() {
        let (_temp, layout) = installation();
        let history = MemoryRevisionStore::new();
        let mut store = create(&layout, &history);
        store.persist().unwrap();
        let before = fs::read(layout.manifest_file()).unwrap();

        store.register_updates([&Artifact::new("org.example", "core", "1.1.0")]);
        history.fail_next_commit();

        assert!(matches!(store.persist(), Err(Error::Metadata { .. })));
        assert_eq!(fs::read(layout.manifest_file()).unwrap(), before);
        assert_eq!(history.commit_count(), 1);
    }

    #[test]
    fn test_write_failure_skips_commit() {
        let (_temp, layout) = installation();
        let history = MemoryRevisionStore::new();
        let mut store = create(&layout, &history);
        store.persist().unwrap();
        let before = fs::read(layout.manifest_file()).unwrap();

        fs::remove_file(layout.repos_file()).unwrap();
        fs::create_dir(layout.repos_file()).unwrap();
        store.register_updates([&Artifact::new("org.example", "core", "1.1.0")]);

        let err = store.persist().unwrap_err();
        assert!(err.to_string().contains(REPOS_FILE_NAME));
        assert_eq!(history.commit_count(), 1);
        assert_eq!(fs::read(layout.manifest_file()).unwrap(), before);
    }

    #[test]
    fn test_set_repositories_rejects_duplicate_ids() {
        let (_temp, layout) = installation();
        let mut store = create(&layout, &MemoryRevisionStore::new());

        let err = store
            .set_repositories(vec![
                Repository::new("dup", "http://a.test"),
                Repository::new("dup", "http://b.test"),
            ])
            .unwrap_err();

        assert!(matches!(err, Error::Metadata { .. }));
        assert_eq!(store.repositories().len(), 1);
    }

    #[test]
    fn test_changes_since() {
        let (_temp, layout) = installation();
        let history = MemoryRevisionStore::new();
        let mut store = create(&layout, &history);
        let first = store.persist().unwrap();

        store.register_updates([&Artifact::new("org.example", "web", "2.1.0")]);
        let second = store.persist().unwrap();

        let changes = store.changes_since(&first).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_version.as_deref(), Some("2.0.0"));
        assert_eq!(changes[0].new_version.as_deref(), Some("2.1.0"));

        assert!(store.changes_since(&second).unwrap().is_empty());
    }

    #[test]
    fn test_rollback_reloads_documents() {
        let (_temp, layout) = installation();
        let history = MemoryRevisionStore::new();
        let mut store = create(&layout, &history);
        let first = store.persist().unwrap();

        store.register_updates([&Artifact::new("org.example", "core", "3.0.0")]);
        store.set_channels(Vec::new());
        store.persist().unwrap();

        let store = store.rollback(&first).unwrap();
        let core = store
            .manifest()
            .find(&Artifact::new("org.example", "core", "").key())
            .unwrap();
        assert_eq!(core.version, "1.0.0");
        assert_eq!(store.channels().len(), 1);

        let states = store.history().unwrap();
        assert_eq!(states.len(), 3);
        assert_eq!(states[0].kind, StateKind::Rollback);
        assert!(states.iter().any(|s| s.id == first.id));
    }

    #[test]
    fn test_failed_rollback_leaves_directory_unchanged() {
        let (_temp, layout) = installation();
        let history = MemoryRevisionStore::new();
        let mut store = create(&layout, &history);
        let first = store.persist().unwrap();

        store.register_updates([&Artifact::new("org.example", "core", "2.0.0")]);
        store.set_channels(Vec::new());
        store.persist().unwrap();
        let manifest = fs::read(layout.manifest_file()).unwrap();
        let channels = fs::read(layout.channels_file()).unwrap();

        history.fail_next_commit();
        assert!(matches!(store.rollback(&first), Err(Error::Metadata { .. })));

        assert_eq!(fs::read(layout.manifest_file()).unwrap(), manifest);
        assert_eq!(fs::read(layout.channels_file()).unwrap(), channels);
        assert_eq!(history.commit_count(), 2);

        let reopened = InstallationMetadata::open_with(
            layout.base(),
            Box::new(history.clone()),
            Box::new(XmlProvisioningParser),
        )
        .unwrap();
        let core = reopened
            .manifest()
            .find(&Artifact::new("org.example", "core", "").key())
            .unwrap();
        assert_eq!(core.version, "2.0.0");
    }

    #[test]
    fn test_open_reports_broken_document() {
        let (_temp, layout) = installation();
        let mut store = create(&layout, &MemoryRevisionStore::new());
        store.persist().unwrap();
        fs::write(layout.channels_file(), "- name: broken\n").unwrap();

        let err = InstallationMetadata::open_with(
            layout.base(),
            Box::new(MemoryRevisionStore::new()),
            Box::new(XmlProvisioningParser),
        )
        .unwrap_err();

        assert!(err.to_string().contains(CHANNELS_FILE_NAME));
    }
}
