// src/provisioning.rs

//! Provisioning configuration produced by the provisioning engine
//!
//! The store never rewrites `provisioning.xml`. It is parsed once per load
//! (and again after a rollback) so callers can inspect which feature packs
//! and options produced the installation, and its original bytes are passed
//! through untouched when a bundle is exported.
//!
//! ```xml
//! <installation xmlns="urn:jboss:galleon:provisioning:3.0">
//!     <feature-pack location="org.example:server-galleon-pack:zip"/>
//!     <options>
//!         <option name="optional-packages" value="passive+"/>
//!     </options>
//! </installation>
//! ```

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisioningError {
    #[error("Failed to read provisioning config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed provisioning XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid provisioning config: {0}")]
    Invalid(String),
}

/// The provisioning engine's description of an installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningConfig {
    root: String,
    feature_packs: Vec<String>,
    options: BTreeMap<String, String>,
    raw: Vec<u8>,
}

impl ProvisioningConfig {
    /// Parse a provisioning document held in memory
    pub fn parse(raw: Vec<u8>) -> Result<Self, ProvisioningError> {
        let scanned = scan(&raw)?;

        Ok(Self {
            root: scanned.root,
            feature_packs: scanned.feature_packs,
            options: scanned.options,
            raw,
        })
    }

    /// Local name of the document element
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Feature-pack locations, in document order
    pub fn feature_packs(&self) -> &[String] {
        &self.feature_packs
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// The document exactly as read
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Elements of interest collected from one pass over the document
struct Scanned {
    root: String,
    feature_packs: Vec<String>,
    options: BTreeMap<String, String>,
}

fn scan(raw: &[u8]) -> Result<Scanned, ProvisioningError> {
    let mut reader = Reader::from_reader(raw);
    let mut buf = Vec::new();

    let mut root: Option<String> = None;
    let mut depth = 0usize;
    let mut feature_packs = Vec::new();
    let mut options = BTreeMap::new();

    loop {
        let event = reader.read_event_into(&mut buf)?.into_owned();
        buf.clear();

        let (element, opens) = match event {
            Event::Start(e) => (e, true),
            Event::Empty(e) => (e, false),
            Event::End(_) => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    ProvisioningError::Invalid("unbalanced closing tag".to_string())
                })?;
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        let name = local_name(&element);
        if depth == 0 {
            if let Some(existing) = &root {
                return Err(ProvisioningError::Invalid(format!(
                    "second root element <{}> after <{}>",
                    name, existing
                )));
            }
            root = Some(name.clone());
        }

        match name.as_str() {
            "feature-pack" => {
                if let Some(location) = attribute(&element, "location")? {
                    feature_packs.push(location);
                }
            }
            "option" => {
                if let Some(option) = attribute(&element, "name")? {
                    let value = attribute(&element, "value")?.unwrap_or_default();
                    options.insert(option, value);
                }
            }
            _ => {}
        }

        if opens {
            depth += 1;
        }
    }

    if depth != 0 {
        return Err(ProvisioningError::Invalid(
            "document ends inside an open element".to_string(),
        ));
    }
    let root = root.ok_or_else(|| ProvisioningError::Invalid("no root element".to_string()))?;

    Ok(Scanned {
        root,
        feature_packs,
        options,
    })
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Result<Option<String>, ProvisioningError> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == key.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Interface to the provisioning engine's config parser
pub trait ProvisioningParser {
    fn parse_config(&self, path: &Path) -> Result<ProvisioningConfig, ProvisioningError>;
}

/// Default parser reading `provisioning.xml` with quick-xml
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlProvisioningParser;

impl ProvisioningParser for XmlProvisioningParser {
    fn parse_config(&self, path: &Path) -> Result<ProvisioningConfig, ProvisioningError> {
        let raw = fs::read(path).map_err(|source| ProvisioningError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ProvisioningConfig::parse(raw)
    }
}
