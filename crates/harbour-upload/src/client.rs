//! The remote archive operations the uploader depends on.

use std::sync::Arc;

use camino::Utf8PathBuf;
use serde::Deserialize;
use thiserror::Error;

use crate::validate::CaseContents;

/// An archive resolved from its slug.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Archive {
    /// Primary key.
    pub pk: String,
    /// Canonical API location, used to reference the archive in requests.
    pub api_url: String,
    /// Human-readable title.
    pub title: String,
    /// URL slug.
    pub slug: String,
}

/// A remote archive item; only its key is held locally.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArchiveItem {
    /// Primary key.
    pub pk: String,
}

/// Errors raised by an [`ArchiveClient`].
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The configured base URL is unusable.
    #[error("invalid API URL '{url}': {message}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser message.
        message: String,
    },
    /// No API token is configured.
    #[error("an API token is required to contact the archive")]
    MissingToken,
    /// The archive slug matched no archive, or more than one.
    #[error("expected exactly one archive with slug '{slug}', found {count}")]
    ArchiveLookup {
        /// Requested slug.
        slug: String,
        /// Number of matches.
        count: usize,
    },
    /// A request failed in transport or returned an error status.
    #[error("request to '{endpoint}' failed: {source}")]
    Http {
        /// Endpoint that was called.
        endpoint: String,
        /// Underlying client error.
        #[source]
        source: Arc<reqwest::Error>,
    },
    /// A file to upload could not be read.
    #[error("failed to read upload '{path}': {source}")]
    File {
        /// File being uploaded.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Remote archive operations.
pub trait ArchiveClient {
    /// Resolves an archive by slug.
    fn archive_detail(&self, slug: &str) -> Result<Archive, ClientError>;

    /// Creates an empty item in `archive`.
    fn create_archive_item(&self, archive: &Archive) -> Result<ArchiveItem, ClientError>;

    /// Attaches validated case contents to `item`.
    fn update_archive_item(
        &self,
        item: &ArchiveItem,
        contents: &CaseContents,
    ) -> Result<(), ClientError>;
}
