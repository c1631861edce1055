// src/manifest.rs

//! Installation manifest: which artifact versions are installed
//!
//! The manifest is an ordered list of artifacts. Each artifact is identified
//! by its coordinate key (group, artifact id, extension, classifier); the
//! version is the only mutable part. At most one entry exists per key.
//!
//! # Format
//!
//! ```yaml
//! schemaVersion: "1.0.0"
//! artifacts:
//! - groupId: org.example
//!   artifactId: core
//!   extension: jar
//!   version: 1.2.0
//! - groupId: org.example
//!   artifactId: core
//!   extension: jar
//!   classifier: tests
//!   version: 1.2.0
//! ```

use crate::document::{self, DocumentError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Current manifest schema version
pub const MANIFEST_SCHEMA_VERSION: &str = "1.0.0";

/// Extension assumed when a manifest entry omits one
pub const DEFAULT_EXTENSION: &str = "jar";

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

/// An installed artifact coordinate with its version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    pub version: String,
}

/// Version-less part of a coordinate, unique within a manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    pub group_id: String,
    pub artifact_id: String,
    pub extension: String,
    pub classifier: Option<String>,
}

impl Artifact {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            extension: default_extension(),
            classifier: None,
            version: version.into(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Set the classifier; an empty classifier means none
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        let classifier = classifier.into();
        self.classifier = (!classifier.is_empty()).then_some(classifier);
        self
    }

    pub fn key(&self) -> ArtifactKey {
        ArtifactKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            extension: self.extension.clone(),
            classifier: self.classifier.clone(),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        Ok(())
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key(), self.version)
    }
}

/// On-disk shape of `manifest.yaml`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestFile {
    schema_version: String,
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

/// Ordered set of installed artifacts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    artifacts: Vec<Artifact>,
}

impl Manifest {
    /// Build a manifest from an artifact list
    ///
    /// A later artifact with an already-seen key replaces the earlier
    /// version in place, so the result holds one entry per key in
    /// first-seen order.
    pub fn new(artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        let mut manifest = Self::default();
        for artifact in artifacts {
            match manifest.position(&artifact.key()) {
                Some(idx) => manifest.artifacts[idx] = artifact,
                None => manifest.artifacts.push(artifact),
            }
        }
        manifest
    }

    /// Parse a manifest from YAML, rejecting duplicate coordinates
    pub fn from_yaml(content: &str) -> Result<Self, DocumentError> {
        let file: ManifestFile = document::parse_yaml(content)?;
        Self::from_file(file)
    }

    /// Read `manifest.yaml` from disk
    pub fn read(path: &Path) -> Result<Self, DocumentError> {
        let file: ManifestFile = document::read_yaml(path)?;
        Self::from_file(file)
    }

    fn from_file(file: ManifestFile) -> Result<Self, DocumentError> {
        if file.schema_version.trim().is_empty() {
            return Err(DocumentError::Invalid(
                "manifest schemaVersion is empty".to_string(),
            ));
        }

        let mut seen: HashMap<ArtifactKey, usize> = HashMap::new();
        for (idx, artifact) in file.artifacts.iter().enumerate() {
            if artifact.group_id.is_empty() || artifact.artifact_id.is_empty() {
                return Err(DocumentError::Invalid(format!(
                    "manifest entry {} has an empty groupId or artifactId",
                    idx
                )));
            }
            if let Some(first) = seen.insert(artifact.key(), idx) {
                return Err(DocumentError::Invalid(format!(
                    "manifest lists {} twice (entries {} and {})",
                    artifact.key(),
                    first,
                    idx
                )));
            }
        }

        Ok(Self {
            artifacts: file.artifacts,
        })
    }

    pub fn to_yaml(&self) -> Result<String, DocumentError> {
        document::to_yaml(&ManifestFile {
            schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
            artifacts: self.artifacts.clone(),
        })
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn find(&self, key: &ArtifactKey) -> Option<&Artifact> {
        self.position(key).map(|idx| &self.artifacts[idx])
    }

    /// Replace the version of an installed artifact
    ///
    /// Artifacts not present in the manifest are ignored. Returns true when
    /// the stored version actually changed.
    pub fn update_version(&mut self, artifact: &Artifact) -> bool {
        let Some(idx) = self.position(&artifact.key()) else {
            return false;
        };

        let entry = &mut self.artifacts[idx];
        if entry.version == artifact.version {
            return false;
        }
        entry.version = artifact.version.clone();
        true
    }

    /// Coordinate-level changes needed to go from `self` to `newer`
    ///
    /// Added and changed artifacts come first, in `newer`'s order, followed
    /// by removed artifacts in `self`'s order.
    pub fn changes_to(&self, newer: &Manifest) -> Vec<ArtifactChange> {
        let old_versions: HashMap<ArtifactKey, &str> = self
            .artifacts
            .iter()
            .map(|a| (a.key(), a.version.as_str()))
            .collect();

        let mut changes = Vec::new();

        for artifact in &newer.artifacts {
            let key = artifact.key();
            match old_versions.get(&key) {
                Some(old) if *old == artifact.version => {}
                Some(old) => changes.push(ArtifactChange {
                    key,
                    old_version: Some(old.to_string()),
                    new_version: Some(artifact.version.clone()),
                }),
                None => changes.push(ArtifactChange {
                    key,
                    old_version: None,
                    new_version: Some(artifact.version.clone()),
                }),
            }
        }

        for artifact in &self.artifacts {
            let key = artifact.key();
            if newer.position(&key).is_none() {
                changes.push(ArtifactChange {
                    key,
                    old_version: Some(artifact.version.clone()),
                    new_version: None,
                });
            }
        }

        changes
    }

    fn position(&self, key: &ArtifactKey) -> Option<usize> {
        self.artifacts.iter().position(|a| {
            a.group_id == key.group_id
                && a.artifact_id == key.artifact_id
                && a.extension == key.extension
                && a.classifier == key.classifier
        })
    }
}

/// One manifest delta between two saved states
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactChange {
    pub key: ArtifactKey,
    /// Version before the change, `None` if the artifact was added
    pub old_version: Option<String>,
    /// Version after the change, `None` if the artifact was removed
    pub new_version: Option<String>,
}

impl ArtifactChange {
    pub fn is_added(&self) -> bool {
        self.old_version.is_none()
    }

    pub fn is_removed(&self) -> bool {
        self.new_version.is_none()
    }
}

impl fmt::Display for ArtifactChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.old_version, &self.new_version) {
            (None, Some(new)) => write!(f, "+ {} {}", self.key, new),
            (Some(old), None) => write!(f, "- {} {}", self.key, old),
            (Some(old), Some(new)) => write!(f, "~ {} {} -> {}", self.key, old, new),
            (None, None) => write!(f, "  {}", self.key),
        }
    }
}
