//! The leaderboard document written to `metrics.json`.

use serde::Serialize;

/// Metric computed for one job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JobMetric {
    /// Score of the job.
    pub my_metric: f64,
}

/// Aggregates over every job of the submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregates {
    /// Mean of the per-job scores.
    pub my_metric: f64,
}

/// Per-job results plus their aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    /// Results in job order.
    pub results: Vec<JobMetric>,
    /// Aggregated scores.
    pub aggregates: Aggregates,
}

impl Metrics {
    /// Builds the document from per-job scores; the mean of no scores is `0.0`.
    #[must_use]
    pub fn from_scores(scores: &[f64]) -> Self {
        let mean = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };
        Self {
            results: scores
                .iter()
                .map(|&my_metric| JobMetric { my_metric })
                .collect(),
            aggregates: Aggregates { my_metric: mean },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[], 0.0)]
    #[case(&[1.0, 0.0], 0.5)]
    #[case(&[1.0, 1.0, 1.0], 1.0)]
    fn aggregates_the_mean(#[case] scores: &[f64], #[case] mean: f64) {
        let metrics = Metrics::from_scores(scores);
        assert_eq!(metrics.results.len(), scores.len());
        assert!((metrics.aggregates.my_metric - mean).abs() < f64::EPSILON);
    }

    #[rstest]
    fn serialises_in_the_leaderboard_shape() {
        let value = serde_json::to_value(Metrics::from_scores(&[1.0])).expect("serialise");
        assert_eq!(
            value,
            serde_json::json!({"results": [{"my_metric": 1.0}], "aggregates": {"my_metric": 1.0}})
        );
    }
}
