//! Sends validated cases to a remote archive.

use thiserror::Error;
use tracing::info;

use crate::client::{ArchiveClient, ClientError};
use crate::validate::CaseContents;

const UPLOADER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::uploader");

/// Failures while uploading.
///
/// Items created before the failure stay in the archive; `created` lists
/// their keys.
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    /// The archive could not be resolved.
    #[error("failed to resolve archive '{slug}': {source}")]
    Archive {
        /// Requested slug.
        slug: String,
        /// Client failure.
        #[source]
        source: ClientError,
    },
    /// Creating the item for a case failed.
    #[error("failed to create an archive item for case {index}: {source}")]
    Create {
        /// Zero-based case position.
        index: usize,
        /// Items created before the failure.
        created: Vec<String>,
        /// Client failure.
        #[source]
        source: ClientError,
    },
    /// Attaching a case's contents to its item failed.
    #[error("failed to update the archive item for case {index}: {source}")]
    Update {
        /// Zero-based case position.
        index: usize,
        /// Items created so far; the last one is the item being updated.
        created: Vec<String>,
        /// Client failure.
        #[source]
        source: ClientError,
    },
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    /// Title of the archive that received the cases.
    pub archive_title: String,
    /// Created item keys, in case order.
    pub items: Vec<String>,
}

/// Uploads `cases` to the archive named `archive_slug`.
///
/// The archive is resolved once; each case then gets a fresh item which is
/// updated with its contents. Cases are sent in input order and nothing is
/// rolled back on failure.
pub fn upload(
    cases: &[CaseContents],
    client: &dyn ArchiveClient,
    archive_slug: &str,
) -> Result<UploadSummary, UploadError> {
    let archive = client
        .archive_detail(archive_slug)
        .map_err(|source| UploadError::Archive {
            slug: archive_slug.to_owned(),
            source,
        })?;
    info!(
        target: UPLOADER_TARGET,
        archive = %archive.title,
        cases = cases.len(),
        "resolved archive"
    );

    let mut created = Vec::with_capacity(cases.len());
    for (index, contents) in cases.iter().enumerate() {
        info!(
            target: UPLOADER_TARGET,
            case = index,
            sockets = contents.len(),
            archive = %archive.title,
            "uploading case"
        );
        let item = match client.create_archive_item(&archive) {
            Ok(item) => item,
            Err(source) => {
                return Err(UploadError::Create {
                    index,
                    created,
                    source,
                });
            }
        };
        created.push(item.pk.clone());
        if let Err(source) = client.update_archive_item(&item, contents) {
            return Err(UploadError::Update {
                index,
                created,
                source,
            });
        }
        info!(target: UPLOADER_TARGET, case = index, item = %item.pk, "case uploaded");
    }

    Ok(UploadSummary {
        archive_title: archive.title,
        items: created,
    })
}
