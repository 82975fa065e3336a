//! Scores every job of a submission and writes the metrics document.

use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use harbour_config::EvaluationConfig;
use harbour_sockets::Socket;
use harbour_sockets::marshal::{self, MarshalError};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::metrics::Metrics;
use crate::predictions::{Job, PredictionsError, read_predictions};
use crate::scorer::{ScoreError, ScoredJob, Scorer};

const EVALUATION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::evaluation");

/// Errors that abort an evaluation.
#[derive(Debug, Clone, Error)]
pub enum EvaluationError {
    /// The input root could not be listed.
    #[error("failed to list inputs under '{path}': {source}")]
    ListInputs {
        /// Directory being listed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// `predictions.json` could not be read.
    #[error(transparent)]
    Predictions(#[from] PredictionsError),
    /// A job lacks a value the evaluation needs.
    #[error("job '{pk}' has no usable value for interface '{slug}'")]
    InterfaceNotFound {
        /// Job key.
        pk: String,
        /// Missing interface.
        slug: &'static str,
    },
    /// A job's segmentation could not be loaded.
    #[error("failed to load the segmentation of job '{pk}': {source}")]
    LoadOutput {
        /// Job key.
        pk: String,
        /// Marshalling failure.
        #[source]
        source: MarshalError,
    },
    /// The scorer failed.
    #[error("failed to score job '{pk}': {source}")]
    Score {
        /// Job key.
        pk: String,
        /// Scorer failure.
        #[source]
        source: ScoreError,
    },
    /// The metrics document could not be written.
    #[error("failed to write metrics: {0}")]
    WriteMetrics(#[source] MarshalError),
}

/// Evaluates the submission mounted under the configured input root and
/// writes `metrics.json` under the output root.
pub fn evaluate(
    config: &EvaluationConfig,
    scorer: &dyn Scorer,
) -> Result<Metrics, EvaluationError> {
    let files = list_files(&config.input_root)?;
    info!(
        target: EVALUATION_TARGET,
        count = files.len(),
        files = ?files,
        "input files"
    );

    let jobs = read_predictions(&config.predictions_path())?;
    let scores = jobs
        .iter()
        .map(|job| score_job(job, &config.input_root, scorer))
        .collect::<Result<Vec<_>, _>>()?;

    let metrics = Metrics::from_scores(&scores);
    let document =
        serde_json::to_value(&metrics).map_err(|source| EvaluationError::WriteMetrics(
            MarshalError::Serialise {
                path: config.metrics_path(),
                source: Arc::new(source),
            },
        ))?;
    marshal::store_json(&config.metrics_path(), &document)
        .map_err(EvaluationError::WriteMetrics)?;
    info!(
        target: EVALUATION_TARGET,
        jobs = metrics.results.len(),
        mean = metrics.aggregates.my_metric,
        "wrote metrics"
    );
    Ok(metrics)
}

/// Scores one job, reading its segmentation from
/// `<input_root>/<pk>/output/<relative_path>`.
pub fn score_job(
    job: &Job,
    input_root: &Utf8Path,
    scorer: &dyn Scorer,
) -> Result<f64, EvaluationError> {
    debug!(target: EVALUATION_TARGET, job = %job.pk, "processing job");
    let output = Socket::BinaryVesselSegmentation;
    let relative_path = job
        .output(output)
        .and_then(|value| value.interface.relative_path.as_deref())
        .ok_or_else(|| not_found(job, output))?;
    let location = input_root.join(&job.pk).join("output").join(relative_path);
    let segmentation =
        marshal::load_image(&location).map_err(|source| EvaluationError::LoadOutput {
            pk: job.pk.clone(),
            source,
        })?;

    let input = Socket::ColorFundusImage;
    let fundus_image_name = job
        .input(input)
        .and_then(|value| value.image.as_ref())
        .map(|image| image.name.as_str())
        .ok_or_else(|| not_found(job, input))?;

    let score = scorer
        .score(ScoredJob {
            pk: &job.pk,
            fundus_image_name,
            segmentation: &segmentation,
        })
        .map_err(|source| EvaluationError::Score {
            pk: job.pk.clone(),
            source,
        })?;
    info!(
        target: EVALUATION_TARGET,
        job = %job.pk,
        image = fundus_image_name,
        score,
        "scored job"
    );
    Ok(score)
}

fn not_found(job: &Job, socket: Socket) -> EvaluationError {
    EvaluationError::InterfaceNotFound {
        pk: job.pk.clone(),
        slug: socket.slug(),
    }
}

/// Every regular file under `root`, sorted. A missing root lists as empty.
pub(crate) fn list_files(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, EvaluationError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) if error.depth() == 0 && is_not_found(&error) => break,
            Err(error) => return Err(list_error(root, error)),
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(file) = Utf8PathBuf::from_path_buf(entry.into_path()) {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

fn is_not_found(error: &walkdir::Error) -> bool {
    error
        .io_error()
        .is_some_and(|source| source.kind() == io::ErrorKind::NotFound)
}

fn list_error(root: &Utf8Path, error: walkdir::Error) -> EvaluationError {
    let path = error
        .path()
        .and_then(Utf8Path::from_path)
        .map_or_else(|| root.to_path_buf(), Utf8Path::to_path_buf);
    EvaluationError::ListInputs {
        path,
        source: Arc::new(io::Error::from(error)),
    }
}
