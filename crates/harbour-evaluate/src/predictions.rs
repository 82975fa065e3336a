//! The platform's `predictions.json`: one entry per algorithm job.

use std::fs;
use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use harbour_sockets::Socket;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while reading `predictions.json`.
#[derive(Debug, Clone, Error)]
pub enum PredictionsError {
    /// The file could not be read.
    #[error("failed to read predictions '{path}': {source}")]
    Read {
        /// File location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The file is not a valid job list.
    #[error("failed to parse predictions '{path}': {source}")]
    Parse {
        /// File location.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },
}

/// Interface reference attached to a job value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValueInterface {
    /// Socket slug.
    pub slug: String,
    /// Location of the value inside the job's output directory.
    #[serde(default)]
    pub relative_path: Option<String>,
}

/// User-provided image metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageRef {
    /// Original image name.
    pub name: String,
}

/// One input or output value of a job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobValue {
    /// Socket the value belongs to.
    pub interface: ValueInterface,
    /// Image metadata, present for image sockets.
    #[serde(default)]
    pub image: Option<ImageRef>,
}

/// A single algorithm job of the submission being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Job {
    /// Job key; names the job's directory under the input root.
    pub pk: String,
    /// Values the job consumed.
    #[serde(default)]
    pub inputs: Vec<JobValue>,
    /// Values the job produced.
    #[serde(default)]
    pub outputs: Vec<JobValue>,
}

impl Job {
    /// The input value bound to `socket`.
    #[must_use]
    pub fn input(&self, socket: Socket) -> Option<&JobValue> {
        find(&self.inputs, socket)
    }

    /// The output value bound to `socket`.
    #[must_use]
    pub fn output(&self, socket: Socket) -> Option<&JobValue> {
        find(&self.outputs, socket)
    }
}

fn find(values: &[JobValue], socket: Socket) -> Option<&JobValue> {
    values
        .iter()
        .find(|value| value.interface.slug == socket.slug())
}

/// Reads the job list at `path`. Job order carries no meaning.
pub fn read_predictions(path: &Utf8Path) -> Result<Vec<Job>, PredictionsError> {
    let text = fs::read_to_string(path).map_err(|source| PredictionsError::Read {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })?;
    serde_json::from_str(&text).map_err(|source| PredictionsError::Parse {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_tolerate_unknown_fields_and_missing_images() {
        let jobs: Vec<Job> = serde_json::from_str(
            r#"[{
                "pk": "job-1",
                "status": "Succeeded",
                "inputs": [{"interface": {"slug": "color-fundus-image", "kind": "Image"}, "image": {"name": "fundus.tif"}}],
                "outputs": [{"interface": {"slug": "binary-vessel-segmentation", "relative_path": "images/binary-vessel-segmentation"}}]
            }]"#,
        )
        .expect("predictions should parse");

        let job = &jobs[0];
        assert_eq!(
            job.input(Socket::ColorFundusImage)
                .and_then(|value| value.image.as_ref())
                .map(|image| image.name.as_str()),
            Some("fundus.tif")
        );
        assert_eq!(
            job.output(Socket::BinaryVesselSegmentation)
                .and_then(|value| value.interface.relative_path.as_deref()),
            Some("images/binary-vessel-segmentation")
        );
        assert!(job.input(Socket::AgeInMonths).is_none());
    }
}
