// src/channel.rs

//! Channel references: the ordered feeds used for artifact resolution
//!
//! A channel is named and points either at a resolvable coordinate
//! (`groupId:artifactId`) or directly at a location. List order is
//! resolution precedence and is preserved through every read and write.
//!
//! ```yaml
//! - name: product
//!   gav: org.example.channels:product
//! - name: local-overrides
//!   url: file:/opt/channels/overrides.yaml
//! ```

use crate::document::{self, DocumentError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Where a channel definition is fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSource {
    /// Coordinate resolved through the configured repositories
    Coordinate(String),
    /// Direct URL or path of the channel definition
    Location(String),
}

/// A named pointer to a versioning feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChannel", into = "RawChannel")]
pub struct ChannelRef {
    name: String,
    source: ChannelSource,
}

impl ChannelRef {
    pub fn coordinate(name: impl Into<String>, gav: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: ChannelSource::Coordinate(gav.into()),
        }
    }

    pub fn location(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: ChannelSource::Location(url.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &ChannelSource {
        &self.source
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            ChannelSource::Coordinate(gav) => write!(f, "{} ({})", self.name, gav),
            ChannelSource::Location(url) => write!(f, "{} <{}>", self.name, url),
        }
    }
}

/// Serialized form; validated on the way in
#[derive(Debug, Serialize, Deserialize)]
struct RawChannel {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gav: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

impl TryFrom<RawChannel> for ChannelRef {
    type Error = String;

    fn try_from(raw: RawChannel) -> Result<Self, Self::Error> {
        if raw.name.trim().is_empty() {
            return Err("channel name must not be empty".to_string());
        }

        let source = match (raw.gav, raw.url) {
            (Some(gav), None) if !gav.is_empty() => ChannelSource::Coordinate(gav),
            (None, Some(url)) if !url.is_empty() => ChannelSource::Location(url),
            (Some(_), Some(_)) => {
                return Err(format!(
                    "channel '{}' must set either gav or url, not both",
                    raw.name
                ));
            }
            _ => {
                return Err(format!(
                    "channel '{}' needs a non-empty gav or url",
                    raw.name
                ));
            }
        };

        Ok(Self {
            name: raw.name,
            source,
        })
    }
}

impl From<ChannelRef> for RawChannel {
    fn from(channel: ChannelRef) -> Self {
        let (gav, url) = match channel.source {
            ChannelSource::Coordinate(gav) => (Some(gav), None),
            ChannelSource::Location(url) => (None, Some(url)),
        };
        Self {
            name: channel.name,
            gav,
            url,
        }
    }
}

/// Read `channels.yaml`; an empty file is an empty list
pub fn read_channels(path: &Path) -> Result<Vec<ChannelRef>, DocumentError> {
    let channels: Option<Vec<ChannelRef>> = document::read_yaml(path)?;
    Ok(channels.unwrap_or_default())
}

pub fn parse_channels(content: &str) -> Result<Vec<ChannelRef>, DocumentError> {
    let channels: Option<Vec<ChannelRef>> = document::parse_yaml(content)?;
    Ok(channels.unwrap_or_default())
}

pub fn channels_to_yaml(channels: &[ChannelRef]) -> Result<String, DocumentError> {
    document::to_yaml(channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_order_survives_yaml() {
        let channels = vec![
            ChannelRef::coordinate("product", "org.example.channels:product"),
            ChannelRef::location("overrides", "file:/opt/channels/overrides.yaml"),
            ChannelRef::coordinate("base", "org.example.channels:base"),
        ];

        let yaml = channels_to_yaml(&channels).unwrap();
        let parsed = parse_channels(&yaml).unwrap();

        assert_eq!(parsed, channels);
    }

    #[test]
    fn test_parse_sources() {
        let yaml = r#"
- name: product
  gav: org.example.channels:product
- name: local
  url: https://example.test/channel.yaml
"#;
        let channels = parse_channels(yaml).unwrap();
        assert_eq!(
            channels[0].source(),
            &ChannelSource::Coordinate("org.example.channels:product".to_string())
        );
        assert_eq!(
            channels[1].source(),
            &ChannelSource::Location("https://example.test/channel.yaml".to_string())
        );
    }

    #[test]
    fn test_display() {
        let coordinate = ChannelRef::coordinate("base", "org.example.channels:base");
        let location = ChannelRef::location("local", "https://example.test/channel.yaml");

        assert_eq!(coordinate.to_string(), "base (org.example.channels:base)");
        assert_eq!(location.to_string(), "local <https://example.test/channel.yaml>");
    }

    #[test]
    fn test_rejects_empty_name() {
        let yaml = "- name: \"\"\n  gav: g:a\n";
        assert!(parse_channels(yaml).is_err());
    }

    #[test]
    fn test_rejects_both_or_neither_source() {
        assert!(parse_channels("- name: a\n  gav: g:a\n  url: http://x.test\n").is_err());
        assert!(parse_channels("- name: a\n").is_err());
    }

    #[test]
    fn test_empty_document_is_empty_list() {
        assert!(parse_channels("").unwrap().is_empty());
        assert!(parse_channels("[]").unwrap().is_empty());
    }
}
