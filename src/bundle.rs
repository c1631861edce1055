// src/bundle.rs

//! Portable metadata bundles
//!
//! A bundle is a gzip-compressed tar archive holding the four metadata
//! documents as flat entries:
//!
//! ```text
//! manifest.yaml
//! channels.yaml
//! repos.yaml
//! provisioning.xml
//! ```
//!
//! Entries carry a fixed mtime and mode so exporting the same metadata twice
//! yields the same archive. Import checks that every entry is present before
//! parsing anything, then materializes the documents into a temporary
//! directory owned by the returned store.

use crate::error::{Error, Result};
use crate::layout::{
    CHANNELS_FILE_NAME, Layout, MANIFEST_FILE_NAME, PROVISIONING_FILE_NAME, REPOS_FILE_NAME,
};
use crate::metadata::InstallationMetadata;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, Header};
use tracing::{debug, info};

/// Entry names every bundle must contain
pub const BUNDLE_ENTRIES: [&str; 4] = [
    MANIFEST_FILE_NAME,
    CHANNELS_FILE_NAME,
    REPOS_FILE_NAME,
    PROVISIONING_FILE_NAME,
];

/// mtime stamped on every entry (2024-01-01 00:00:00 UTC)
const ENTRY_MTIME: u64 = 1_704_067_200;

const ENTRY_MODE: u32 = 0o644;

/// Largest entry content accepted on import
const MAX_ENTRY_SIZE: u64 = 16 * 1024 * 1024;

/// Write the documents of `metadata` into a bundle at `destination`
pub fn export(metadata: &InstallationMetadata, destination: &Path) -> Result<PathBuf> {
    let mut entries = metadata.serialized_documents()?;
    entries.push((
        PROVISIONING_FILE_NAME,
        metadata.provisioning_config().as_bytes().to_vec(),
    ));

    write_archive(destination, &entries).map_err(|e| {
        Error::metadata(format!("Unable to write bundle {}", destination.display()), e)
    })?;

    info!(
        "Exported metadata bundle {} ({} artifacts)",
        destination.display(),
        metadata.manifest().len()
    );
    Ok(destination.to_path_buf())
}

/// Load a bundle into a store without revision history
pub fn import(archive: &Path) -> Result<InstallationMetadata> {
    import_into(archive, &std::env::temp_dir())
}

/// Import with the documents materialized in a new directory under `scratch`
///
/// The directory is removed when the import fails or the store is dropped.
fn import_into(archive: &Path, scratch: &Path) -> Result<InstallationMetadata> {
    let mut entries = read_archive(archive)
        .map_err(|e| Error::metadata(format!("Unable to read bundle {}", archive.display()), e))?;

    let missing: Vec<String> = BUNDLE_ENTRIES
        .iter()
        .filter(|name| !entries.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(Error::InvalidBundle {
            path: archive.to_path_buf(),
            missing,
        });
    }

    let files = tempfile::Builder::new()
        .prefix("stowage-bundle-")
        .tempdir_in(scratch)
        .map_err(|e| Error::metadata("Unable to create directory for imported bundle", e))?;
    let layout = Layout::new(files.path());

    for name in BUNDLE_ENTRIES {
        let target = if name == PROVISIONING_FILE_NAME {
            layout.provisioning_file()
        } else {
            layout.metadata_dir().join(name)
        };
        let content = entries.remove(name).unwrap_or_default();
        materialize(&target, &content)
            .map_err(|e| Error::metadata(format!("Unable to extract {} from bundle", name), e))?;
    }

    let metadata = InstallationMetadata::from_materialized(files)?;
    info!(
        "Imported metadata bundle {} ({} artifacts)",
        archive.display(),
        metadata.manifest().len()
    );
    Ok(metadata)
}

fn write_archive(destination: &Path, entries: &[(&str, Vec<u8>)]) -> io::Result<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let output_file = File::create(destination)?;
    let encoder = GzEncoder::new(output_file, Compression::default());
    let mut archive = Builder::new(encoder);

    for (name, content) in entries {
        let mut header = Header::new_gnu();
        header.set_mode(ENTRY_MODE);
        header.set_size(content.len() as u64);
        header.set_mtime(ENTRY_MTIME);
        header.set_cksum();
        archive.append_data(&mut header, name, content.as_slice())?;
        debug!("Bundled {} ({} bytes)", name, content.len());
    }

    let encoder = archive.into_inner()?;
    encoder.finish()?.sync_all()
}

/// Contents of the recognized entries, keyed by entry name
fn read_archive(path: &Path) -> io::Result<HashMap<&'static str, Vec<u8>>> {
    let file = File::open(path)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut found = HashMap::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_name = entry.path()?.to_string_lossy().into_owned();
        let entry_name = entry_name.strip_prefix("./").unwrap_or(&entry_name);

        let Some(name) = BUNDLE_ENTRIES.iter().find(|n| **n == entry_name) else {
            debug!("Ignoring bundle entry {}", entry_name);
            continue;
        };

        let mut content = Vec::new();
        entry.by_ref().take(MAX_ENTRY_SIZE + 1).read_to_end(&mut content)?;
        if content.len() as u64 > MAX_ENTRY_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("entry {} is larger than {} bytes", name, MAX_ENTRY_SIZE),
            ));
        }
        found.insert(*name, content);
    }

    Ok(found)
}

fn materialize(target: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(target, content)
}
