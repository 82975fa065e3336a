//! Scoring of one job's segmentation.

use std::fs;
use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use harbour_sockets::ImageArray;
use thiserror::Error;
use tracing::info;

const SCORER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::scorer");

/// Ground-truth file the placeholder scorer reports when present.
pub const GROUND_TRUTH_FILE_NAME: &str = "some_resource.txt";

/// Errors raised by a [`Scorer`].
#[derive(Debug, Clone, Error)]
pub enum ScoreError {
    /// Ground truth exists but could not be read.
    #[error("failed to read ground truth '{path}': {source}")]
    GroundTruth {
        /// Ground-truth location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Everything a scorer sees of one job.
#[derive(Debug, Clone, Copy)]
pub struct ScoredJob<'a> {
    /// Job key.
    pub pk: &'a str,
    /// Name of the fundus image the job consumed, for ground-truth lookup.
    pub fundus_image_name: &'a str,
    /// Segmentation the job produced.
    pub segmentation: &'a ImageArray,
}

/// Computes the metric for one job.
pub trait Scorer {
    /// Scores `job`.
    fn score(&self, job: ScoredJob<'_>) -> Result<f64, ScoreError>;
}

/// Stand-in metric: `1.0` when the segmentation marks any pixel, else `0.0`.
#[derive(Debug, Clone)]
pub struct PlaceholderScorer {
    ground_truth_root: Utf8PathBuf,
}

impl PlaceholderScorer {
    /// Builds a scorer reading ground truth from `ground_truth_root`.
    #[must_use]
    pub fn new(ground_truth_root: Utf8PathBuf) -> Self {
        Self { ground_truth_root }
    }
}

impl Scorer for PlaceholderScorer {
    fn score(&self, job: ScoredJob<'_>) -> Result<f64, ScoreError> {
        let path = self.ground_truth_root.join(GROUND_TRUTH_FILE_NAME);
        if path.is_file() {
            let content = fs::read_to_string(&path).map_err(|source| ScoreError::GroundTruth {
                path: path.clone(),
                source: Arc::new(source),
            })?;
            info!(
                target: SCORER_TARGET,
                job = job.pk,
                image = job.fundus_image_name,
                ground_truth = %content.trim_end(),
                "compared against ground truth"
            );
        }
        let marked = job.segmentation.samples().iter().any(|sample| *sample != 0.0);
        Ok(if marked { 1.0 } else { 0.0 })
    }
}
