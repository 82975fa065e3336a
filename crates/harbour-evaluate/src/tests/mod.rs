//! Unit tests for the evaluation method.

use std::fs;

use camino::Utf8PathBuf;
use harbour_config::EvaluationConfig;
use harbour_sockets::marshal::{self, MarshalError};
use harbour_sockets::{ElementType, ImageArray};
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

use crate::evaluation::{EvaluationError, evaluate, list_files};
use crate::predictions::PredictionsError;
use crate::scorer::{PlaceholderScorer, ScoreError, ScoredJob, Scorer};

const SEGMENTATION_PATH: &str = "images/binary-vessel-segmentation";

struct Submission {
    _temp: TempDir,
    config: EvaluationConfig,
}

impl Submission {
    fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp dir");
        let config = EvaluationConfig {
            input_root: root.join("input"),
            output_root: root.join("output"),
            ground_truth_root: root.join("ground_truth"),
            ..EvaluationConfig::default()
        };
        fs::create_dir_all(&config.input_root).expect("create input root");
        Self {
            _temp: temp,
            config,
        }
    }

    fn write_predictions(&self, jobs: &serde_json::Value) {
        fs::write(self.config.predictions_path(), jobs.to_string()).expect("write predictions");
    }

    fn write_segmentation(&self, pk: &str, image: &ImageArray) {
        let directory = self
            .config
            .input_root
            .join(pk)
            .join("output")
            .join(SEGMENTATION_PATH);
        marshal::store_image(&directory, image).expect("store segmentation");
    }

    fn scorer(&self) -> PlaceholderScorer {
        PlaceholderScorer::new(self.config.ground_truth_root.clone())
    }
}

fn job(pk: &str) -> serde_json::Value {
    json!({
        "pk": pk,
        "inputs": [
            {"interface": {"slug": "color-fundus-image"}, "image": {"name": format!("{pk}.tif")}},
            {"interface": {"slug": "age-in-months"}, "value": 36}
        ],
        "outputs": [
            {"interface": {"slug": "binary-vessel-segmentation", "relative_path": SEGMENTATION_PATH}}
        ]
    })
}

fn blank() -> ImageArray {
    ImageArray::new(vec![2, 2], ElementType::U8, vec![0.0; 4]).expect("array")
}

#[fixture]
fn submission() -> Submission {
    Submission::new()
}

#[rstest]
fn scores_every_job_and_writes_metrics(submission: Submission) {
    submission.write_predictions(&json!([job("job-a"), job("job-b")]));
    submission.write_segmentation("job-a", &ImageArray::eye(4, 2));
    submission.write_segmentation("job-b", &blank());

    let metrics = evaluate(&submission.config, &submission.scorer()).expect("evaluation");

    assert_eq!(metrics.results.len(), 2);
    assert!((metrics.aggregates.my_metric - 0.5).abs() < f64::EPSILON);
    let written = marshal::load_json(&submission.config.metrics_path()).expect("metrics json");
    assert_eq!(
        written,
        json!({
            "results": [{"my_metric": 1.0}, {"my_metric": 0.0}],
            "aggregates": {"my_metric": 0.5}
        })
    );
}

#[rstest]
fn no_jobs_yield_a_zero_mean(submission: Submission) {
    submission.write_predictions(&json!([]));

    let metrics = evaluate(&submission.config, &submission.scorer()).expect("evaluation");

    assert!(metrics.results.is_empty());
    assert!(metrics.aggregates.my_metric.abs() < f64::EPSILON);
    assert!(submission.config.metrics_path().is_file());
}

#[rstest]
fn missing_predictions_are_reported(submission: Submission) {
    let error = evaluate(&submission.config, &submission.scorer()).expect_err("no predictions");
    assert!(matches!(
        error,
        EvaluationError::Predictions(PredictionsError::Read { .. })
    ));
}

#[rstest]
#[case::output("outputs", "binary-vessel-segmentation")]
#[case::input("inputs", "color-fundus-image")]
fn missing_interfaces_are_reported(
    submission: Submission,
    #[case] field: &str,
    #[case] slug: &str,
) {
    let mut incomplete = job("job-a");
    incomplete[field] = json!([]);
    submission.write_predictions(&json!([incomplete]));
    submission.write_segmentation("job-a", &ImageArray::eye(2, 2));

    let error = evaluate(&submission.config, &submission.scorer()).expect_err("interface missing");

    assert!(matches!(
        error,
        EvaluationError::InterfaceNotFound { ref pk, slug: found } if pk == "job-a" && found == slug
    ));
    assert!(!submission.config.metrics_path().exists());
}

#[rstest]
fn missing_segmentation_file_is_a_load_failure(submission: Submission) {
    submission.write_predictions(&json!([job("job-a")]));

    let error = evaluate(&submission.config, &submission.scorer()).expect_err("no segmentation");

    assert!(matches!(
        error,
        EvaluationError::LoadOutput {
            source: MarshalError::NoMatchingFile { .. },
            ..
        }
    ));
}

struct FailingScorer;

impl Scorer for FailingScorer {
    fn score(&self, job: ScoredJob<'_>) -> Result<f64, ScoreError> {
        Err(ScoreError::GroundTruth {
            path: Utf8PathBuf::from(job.fundus_image_name),
            source: std::sync::Arc::new(std::io::Error::other("unreadable")),
        })
    }
}

#[rstest]
fn scorer_failures_abort_the_evaluation(submission: Submission) {
    submission.write_predictions(&json!([job("job-a")]));
    submission.write_segmentation("job-a", &ImageArray::eye(2, 2));

    let error = evaluate(&submission.config, &FailingScorer).expect_err("scorer fails");

    assert!(matches!(error, EvaluationError::Score { ref pk, .. } if pk == "job-a"));
}

#[rstest]
fn listing_a_missing_root_is_empty(submission: Submission) {
    let files = list_files(&submission.config.input_root.join("absent")).expect("list files");
    assert!(files.is_empty());
}

#[cfg(unix)]
#[rstest]
fn listing_skips_symlinked_directories(submission: Submission) {
    let root = &submission.config.input_root;
    submission.write_predictions(&json!([]));
    std::os::unix::fs::symlink(root, root.join("loop")).expect("create symlink loop");

    let files = list_files(root).expect("list files");

    assert_eq!(files, vec![submission.config.predictions_path()]);
}
