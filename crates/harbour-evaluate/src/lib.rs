//! Evaluation method for submissions to the vessel segmentation challenge.
//!
//! The platform mounts every job of a submission under the input root together
//! with `predictions.json`, which maps each job to its input and output
//! values. Jobs are scored one after another by a [`Scorer`] and the results
//! are written to `metrics.json` for the leaderboard.

mod evaluation;
mod metrics;
mod predictions;
mod scorer;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use harbour_config::EvaluationConfig;
use harbour_config::telemetry::{self, TelemetryError};
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

pub use evaluation::{EvaluationError, evaluate, score_job};
pub use metrics::{Aggregates, JobMetric, Metrics};
pub use predictions::{ImageRef, Job, JobValue, PredictionsError, ValueInterface, read_predictions};
pub use scorer::{GROUND_TRUTH_FILE_NAME, PlaceholderScorer, ScoreError, ScoredJob, Scorer};

/// Top-level failures of the evaluation binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(#[source] Arc<OrthoError>),
    /// Telemetry could not be initialised.
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    /// The evaluation aborted.
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),
}

/// Runs the evaluation with configuration taken from `args`, the environment
/// and any configuration file, reporting fatal errors to `stderr`.
#[must_use]
pub fn run<I, E>(args: I, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    E: Write,
{
    match try_run(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn try_run<I>(args: I) -> Result<Metrics, AppError>
where
    I: IntoIterator<Item = OsString>,
{
    let config = EvaluationConfig::load_from_iter(args).map_err(AppError::LoadConfiguration)?;
    telemetry::initialise(&config)?;
    let scorer = PlaceholderScorer::new(config.ground_truth_root.clone());
    Ok(evaluate(&config, &scorer)?)
}

#[cfg(test)]
mod tests;
