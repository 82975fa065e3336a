//! The case table: which local files make up each archive item.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use harbour_sockets::Interface;
use serde::Deserialize;
use thiserror::Error;

/// Unordered set of socket slugs.
pub type SocketSet = BTreeSet<String>;

/// Errors raised while reading a case table.
#[derive(Debug, Clone, Error)]
pub enum CaseTableError {
    /// The file could not be read.
    #[error("failed to read case table '{path}': {source}")]
    Read {
        /// Case table location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The file is not a valid case table.
    #[error("failed to parse case table '{path}': {source}")]
    Parse {
        /// Case table location.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },
}

/// One case: socket slug to local path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Case {
    paths: BTreeMap<String, Utf8PathBuf>,
}

impl Case {
    /// Builds a case from `(slug, path)` pairs.
    #[must_use]
    pub fn from_paths<I, S, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<Utf8PathBuf>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(|(slug, path)| (slug.into(), path.into()))
                .collect(),
        }
    }

    /// Slugs the case provides.
    #[must_use]
    pub fn socket_set(&self) -> SocketSet {
        self.paths.keys().cloned().collect()
    }

    /// Iterates over `(slug, path)` pairs in slug order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Utf8Path)> {
        self.paths
            .iter()
            .map(|(slug, path)| (slug.as_str(), path.as_path()))
    }

    fn rebase(&mut self, base: &Utf8Path) {
        for path in self.paths.values_mut() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Socket sets accepted when the table does not name its own: the input
/// sockets of every registered interface.
#[must_use]
pub fn default_expected_socket_sets() -> Vec<SocketSet> {
    Interface::ALL
        .iter()
        .map(|interface| {
            interface
                .inputs()
                .iter()
                .map(|socket| socket.slug().to_owned())
                .collect()
        })
        .collect()
}

/// Cases to upload together with the socket sets each case may provide.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaseTable {
    /// Allowed socket sets.
    #[serde(default = "default_expected_socket_sets")]
    pub expected_socket_sets: Vec<SocketSet>,
    /// Cases in upload order.
    #[serde(default)]
    pub cases: Vec<Case>,
}

impl CaseTable {
    /// Builds a table accepting the default socket sets.
    #[must_use]
    pub fn new(cases: Vec<Case>) -> Self {
        Self {
            expected_socket_sets: default_expected_socket_sets(),
            cases,
        }
    }

    /// Reads the table at `path`, resolving relative case paths against the
    /// table's directory.
    pub fn read(path: &Utf8Path) -> Result<Self, CaseTableError> {
        let text = fs::read_to_string(path).map_err(|source| CaseTableError::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        let mut table: Self = serde_json::from_str(&text).map_err(|source| CaseTableError::Parse {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        if let Some(base) = path.parent() {
            for case in &mut table.cases {
                case.rebase(base);
            }
        }
        Ok(table)
    }
}
