// src/metadata/staging.rs

//! All-or-nothing replacement of the metadata documents
//!
//! New contents are first written to hidden `.<name>.tmp` files next to the
//! documents, then swapped in with renames, and only then is the revision
//! history asked to record the directory. If any step fails, every document
//! already swapped gets its previous bytes back (or is removed if it did not
//! exist) and leftover staging files are deleted.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Why a staged write was abandoned
#[derive(Debug)]
pub(crate) enum StageError<E> {
    /// A document could not be staged, backed up or swapped in
    Io { path: PathBuf, source: io::Error },
    /// All documents were in place but the commit step failed
    Commit(E),
}

/// One document file to be replaced
struct Staged {
    target: PathBuf,
    temp: PathBuf,
    previous: Option<Vec<u8>>,
}

/// Replace `documents` (file name, content) in `directory`, then run `commit`
///
/// On error the directory is left as it was before the call, as far as the
/// file system allows.
pub(crate) fn replace_documents<T, E>(
    directory: &Path,
    documents: &[(&str, Vec<u8>)],
    commit: impl FnOnce() -> Result<T, E>,
) -> Result<T, StageError<E>> {
    fs::create_dir_all(directory).map_err(|source| StageError::Io {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut staged: Vec<Staged> = Vec::with_capacity(documents.len());
    for (name, content) in documents {
        let target = directory.join(name);
        let temp = directory.join(format!(".{}.tmp", name));

        let prepared = write_synced(&temp, content)
            .map_err(|source| StageError::Io {
                path: temp.clone(),
                source,
            })
            .and_then(|()| {
                read_previous(&target).map_err(|source| StageError::Io {
                    path: target.clone(),
                    source,
                })
            });

        match prepared {
            Ok(previous) => {
                debug!("Staged {}", temp.display());
                staged.push(Staged {
                    target,
                    temp,
                    previous,
                });
            }
            Err(e) => {
                remove_staging_file(&temp);
                discard(&staged, 0);
                return Err(e);
            }
        }
    }

    for (swapped, doc) in staged.iter().enumerate() {
        if let Err(source) = fs::rename(&doc.temp, &doc.target) {
            restore(&staged[..swapped]);
            discard(&staged, swapped);
            return Err(StageError::Io {
                path: doc.target.clone(),
                source,
            });
        }
    }

    commit().map_err(|e| {
        restore(&staged);
        StageError::Commit(e)
    })
}

fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

fn read_previous(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Put back the previous contents of documents already swapped in
fn restore(swapped: &[Staged]) {
    for doc in swapped {
        let result = match &doc.previous {
            Some(content) => {
                write_synced(&doc.temp, content).and_then(|()| fs::rename(&doc.temp, &doc.target))
            }
            None => fs::remove_file(&doc.target),
        };
        match result {
            Ok(()) => debug!("Restored {}", doc.target.display()),
            Err(e) => warn!("Failed to restore {}: {}", doc.target.display(), e),
        }
    }
}

/// Delete staging files from index `from` on
fn discard(staged: &[Staged], from: usize) {
    for doc in &staged[from..] {
        remove_staging_file(&doc.temp);
    }
}

fn remove_staging_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove staging file {}: {}", path.display(), e),
    }
}
