// src/repository/definition.rs

//! Parsing of user-supplied repository definitions
//!
//! A definition is either `id::location` or a bare `location`. Bare
//! locations get a generated id, `temp-repo-<index>`, from their position in
//! the batch. Locations are validated before anything is returned:
//! - `http:`/`https:` must be a syntactically valid URL (not checked further)
//! - `file:` must be a valid URL whose path exists locally
//! - `file://..` is always rejected, use `file://<host>/<path>` instead
//! - anything else is a file-system path that must exist
//!
//! A batch fails as a whole on the first bad definition.

use super::Repository;
use super::location::file_url_to_path;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

/// Separator between an explicit id and its location
pub const ID_SEPARATOR: &str = "::";

/// Prefix of ids generated for definitions without one
pub const GENERATED_ID_PREFIX: &str = "temp-repo-";

/// A definition split into its parts, before ids are assigned
struct Definition<'a> {
    input: &'a str,
    id: Option<&'a str>,
    location: &'a str,
}

/// Parse an ordered batch of repository definitions
///
/// Duplicate explicit ids are accepted here; list-level uniqueness is
/// checked when the repositories are stored. A generated id that matches an
/// explicit id elsewhere in the batch is rejected.
pub fn parse_definitions<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<Repository>> {
    let definitions = inputs
        .iter()
        .map(|input| split_definition(input.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let explicit_ids: HashSet<&str> = definitions.iter().filter_map(|d| d.id).collect();

    let mut repositories = Vec::with_capacity(definitions.len());
    for (index, definition) in definitions.iter().enumerate() {
        let id = match definition.id {
            Some(id) => id.to_string(),
            None => {
                let generated = format!("{}{}", GENERATED_ID_PREFIX, index);
                if explicit_ids.contains(generated.as_str()) {
                    warn!(
                        "Generated repository id '{}' is already used explicitly in the same batch",
                        generated
                    );
                    return Err(Error::InvalidRepositoryDefinition(
                        definition.input.to_string(),
                    ));
                }
                generated
            }
        };

        debug!("Repository definition '{}' -> {}", definition.input, id);
        repositories.push(Repository::new(id, definition.location));
    }

    Ok(repositories)
}

fn split_definition(input: &str) -> Result<Definition<'_>> {
    let invalid = || Error::InvalidRepositoryDefinition(input.to_string());

    let (id, location) = if input.contains(ID_SEPARATOR) {
        let parts: Vec<&str> = input.split(ID_SEPARATOR).collect();
        match parts.as_slice() {
            [id, location] if !id.is_empty() && !location.is_empty() => (Some(*id), *location),
            _ => return Err(invalid()),
        }
    } else {
        (None, input)
    };

    if !is_valid_location(location) {
        return Err(invalid());
    }

    Ok(Definition {
        input,
        id,
        location,
    })
}

fn is_valid_location(text: &str) -> bool {
    if text.starts_with("file://..") {
        warn!(
            "'{}' is invalid: a file URL must have the form 'file://<HOST>/<PATH>'",
            text
        );
        return false;
    }

    if text.starts_with("http:") || text.starts_with("https:") {
        return Url::parse(text).is_ok();
    }

    if text.starts_with("file:") {
        if Url::parse(text).is_err() {
            return false;
        }
        return match file_url_to_path(text) {
            Ok(path) => path_exists(&path),
            Err(e) => {
                debug!("Rejecting repository location: {}", e);
                false
            }
        };
    }

    path_exists(Path::new(text))
}

fn path_exists(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.try_exists().unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(repos: &[Repository]) -> Vec<&str> {
        repos.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_empty_batch() {
        let inputs: [&str; 0] = [];
        assert!(parse_definitions(&inputs).unwrap().is_empty());
    }

    #[test]
    fn test_generated_id_for_bare_location() {
        let repos = parse_definitions(&["http://test.te"]).unwrap();
        assert_eq!(repos, vec![Repository::new("temp-repo-0", "http://test.te")]);
    }

    #[test]
    fn test_explicit_id_kept() {
        let repos = parse_definitions(&["central::https://repo.test/maven2"]).unwrap();
        assert_eq!(repos[0].id, "central");
        assert_eq!(repos[0].url, "https://repo.test/maven2");
    }

    #[test]
    fn test_mixed_ids_follow_position() {
        let repos =
            parse_definitions(&["repo-1::http://a.test", "http://b.test", "repo-3::http://c.test"])
                .unwrap();
        assert_eq!(ids(&repos), vec!["repo-1", "temp-repo-1", "repo-3"]);
    }

    #[test]
    fn test_separator_errors() {
        for input in [
            "::http://test1.te",
            "repo-1::",
            "repo-1:::http://test1.te",
            "foo::bar::http://test1.te",
            "::",
        ] {
            assert!(
                matches!(
                    parse_definitions(&[input]),
                    Err(Error::InvalidRepositoryDefinition(ref s)) if s == input
                ),
                "expected rejection of {input}"
            );
        }
    }

    #[test]
    fn test_http_must_be_url() {
        assert!(parse_definitions(&["http://"]).is_err());
        assert!(parse_definitions(&["https://valid.test/path"]).is_ok());
    }

    #[test]
    fn test_dot_dot_file_url_always_rejected() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir(temp.path().join("repo")).unwrap();
        let existing = format!("file://../{}/repo", temp.path().display());

        assert!(parse_definitions(&[existing.as_str()]).is_err());
        assert!(parse_definitions(&["file://../repo"]).is_err());
        assert!(parse_definitions(&["file://.."]).is_err());
    }

    #[test]
    fn test_file_url_must_exist() {
        let temp = tempfile::tempdir().unwrap();
        let url = format!("file://{}", temp.path().display());
        assert!(parse_definitions(&[url.as_str()]).is_ok());

        let missing = format!("file://{}/missing", temp.path().display());
        assert!(parse_definitions(&[missing.as_str()]).is_err());
        assert!(parse_definitions(&["file:/path/to/repo"]).is_err());
    }

    #[test]
    fn test_bare_path_must_exist() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().display().to_string();

        let repos = parse_definitions(&[path.as_str()]).unwrap();
        assert_eq!(repos[0].url, path);

        assert!(parse_definitions(&["imnoturl"]).is_err());
        assert!(parse_definitions(&[""]).is_err());
    }

    #[test]
    fn test_generated_id_collision_rejected() {
        let result = parse_definitions(&["temp-repo-1::http://a.test", "http://b.test"]);
        assert!(matches!(
            result,
            Err(Error::InvalidRepositoryDefinition(ref s)) if s == "http://b.test"
        ));
    }

    #[test]
    fn test_duplicate_explicit_ids_allowed() {
        let repos = parse_definitions(&["dup::http://a.test", "dup::http://b.test"]).unwrap();
        assert_eq!(ids(&repos), vec!["dup", "dup"]);
    }

    #[test]
    fn test_batch_fails_atomically() {
        let result = parse_definitions(&["http://a.test", "imnoturl", "http://c.test"]);
        assert!(matches!(
            result,
            Err(Error::InvalidRepositoryDefinition(ref s)) if s == "imnoturl"
        ));
    }
}
