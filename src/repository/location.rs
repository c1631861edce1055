// src/repository/location.rs

//! Conversion of `file:` URLs into local paths
//!
//! Both absolute path shapes are handled here and nowhere else:
//! - POSIX: `file:///srv/repo` -> `/srv/repo`
//! - drive letter: `file:///C:/repo` -> `C:/repo`
//!
//! Relative forms (`file:../repo`) keep their relative path, which is then
//! resolved against the working directory. The host part of
//! `file://<host>/<path>` is ignored.

use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

static DRIVE_LETTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/[A-Za-z]:").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("Not a file URL: {0}")]
    NotFileUrl(String),

    #[error("File URL has no path: {0}")]
    MissingPath(String),

    #[error("File URL path is not valid UTF-8 once decoded: {0}")]
    Encoding(String),
}

/// Convert a `file:` URL to the local path it designates
pub fn file_url_to_path(url: &str) -> Result<PathBuf, LocationError> {
    let rest = url
        .strip_prefix("file:")
        .ok_or_else(|| LocationError::NotFileUrl(url.to_string()))?;

    let raw_path = match rest.strip_prefix("//") {
        // authority form: skip the host
        Some(authority) => match authority.find('/') {
            Some(idx) => &authority[idx..],
            None => return Err(LocationError::MissingPath(url.to_string())),
        },
        None => rest,
    };

    let raw_path = raw_path
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    if raw_path.is_empty() {
        return Err(LocationError::MissingPath(url.to_string()));
    }

    let decoded = urlencoding::decode(raw_path)
        .map_err(|_| LocationError::Encoding(url.to_string()))?;

    if DRIVE_LETTER.is_match(&decoded) {
        return Ok(PathBuf::from(&decoded[1..]));
    }

    Ok(PathBuf::from(decoded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_absolute() {
        assert_eq!(
            file_url_to_path("file:///srv/repo").unwrap(),
            PathBuf::from("/srv/repo")
        );
        assert_eq!(
            file_url_to_path("file:/srv/repo").unwrap(),
            PathBuf::from("/srv/repo")
        );
    }

    #[test]
    fn test_drive_letter_absolute() {
        assert_eq!(
            file_url_to_path("file:///C:/repos/maven").unwrap(),
            PathBuf::from("C:/repos/maven")
        );
        assert_eq!(
            file_url_to_path("file:/d:/repo").unwrap(),
            PathBuf::from("d:/repo")
        );
    }

    #[test]
    fn test_drive_letter_needs_leading_slash_position() {
        // a colon later in a POSIX path is not a drive letter
        assert_eq!(
            file_url_to_path("file:///srv/C:/repo").unwrap(),
            PathBuf::from("/srv/C:/repo")
        );
    }

    #[test]
    fn test_host_is_ignored() {
        assert_eq!(
            file_url_to_path("file://localhost/srv/repo").unwrap(),
            PathBuf::from("/srv/repo")
        );
    }

    #[test]
    fn test_relative_kept_relative() {
        assert_eq!(
            file_url_to_path("file:../repo").unwrap(),
            PathBuf::from("../repo")
        );
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(
            file_url_to_path("file:///srv/my%20repo").unwrap(),
            PathBuf::from("/srv/my repo")
        );
    }

    #[test]
    fn test_query_and_fragment_dropped() {
        assert_eq!(
            file_url_to_path("file:///srv/repo?x=1#top").unwrap(),
            PathBuf::from("/srv/repo")
        );
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            file_url_to_path("http://a.test/repo"),
            Err(LocationError::NotFileUrl(_))
        ));
        assert!(matches!(
            file_url_to_path("file://hostonly"),
            Err(LocationError::MissingPath(_))
        ));
        assert!(matches!(
            file_url_to_path("file:"),
            Err(LocationError::MissingPath(_))
        ));
    }
}
