//! The platform manifest (`inputs.json`) describing which sockets are present.

use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;

/// Interface reference carried by a manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterfaceRef {
    /// Socket slug.
    pub slug: String,
    /// Location of the socket relative to the input root, when supplied.
    #[serde(default)]
    pub relative_path: Option<String>,
}

/// One element of the manifest. Only the interface slug is consumed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    /// Socket the entry describes.
    pub interface: InterfaceRef,
}

impl ManifestEntry {
    /// Builds an entry for `slug` without a relative path.
    #[must_use]
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            interface: InterfaceRef {
                slug: slug.into(),
                relative_path: None,
            },
        }
    }

    /// Socket slug of the entry.
    #[must_use]
    pub fn slug(&self) -> &str {
        self.interface.slug.as_str()
    }
}

/// Ordered sequence of manifest entries, read once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Wraps already parsed entries.
    #[must_use]
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Builds a manifest from bare slugs.
    #[must_use]
    pub fn from_slugs<I, S>(slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(slugs.into_iter().map(ManifestEntry::new).collect())
    }

    /// Reads and parses the manifest at `path`.
    pub fn read(path: &Utf8Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        Self::parse(&text).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })
    }

    /// Parses manifest JSON text.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Entries in manifest order.
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Slugs in manifest order, duplicates included.
    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(ManifestEntry::slug)
    }
}

/// Errors raised while reading the manifest.
#[derive(Debug, Clone, Error)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("failed to read manifest '{path}': {source}")]
    Read {
        /// Manifest location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
    /// The manifest is not a JSON array of entries.
    #[error("failed to parse manifest '{path}': {source}")]
    Parse {
        /// Manifest location.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_platform_entries_and_ignores_extra_fields() {
        let manifest = Manifest::parse(
            r#"[
                {"interface": {"slug": "age-in-months", "kind": "Anything",
                               "relative_path": "age-in-months.json"}, "value": 36},
                {"interface": {"slug": "color-fundus-image",
                               "relative_path": "images/color-fundus"},
                 "image": {"name": "fundus.mha"}}
            ]"#,
        )
        .expect("manifest should parse");
        let slugs: Vec<&str> = manifest.slugs().collect();
        assert_eq!(slugs, vec!["age-in-months", "color-fundus-image"]);
        assert_eq!(
            manifest.entries()[0].interface.relative_path.as_deref(),
            Some("age-in-months.json")
        );
    }

    #[test]
    fn rejects_entries_without_interface() {
        assert!(Manifest::parse(r#"[{"value": 1}]"#).is_err());
    }

    #[test]
    fn reports_missing_manifest_with_path() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8Path::from_path(temp.path()).expect("utf-8 temp dir");
        let path = root.join("inputs.json");
        let error = Manifest::read(&path).expect_err("manifest should be missing");
        assert!(matches!(error, ManifestError::Read { .. }));
        assert!(error.to_string().contains("inputs.json"));
    }
}
