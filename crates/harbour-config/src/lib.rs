//! Shared configuration for the harbour binaries.
//!
//! Each binary owns one configuration struct derived with `ortho_config`, so
//! values are layered from built-in defaults, an optional configuration file
//! (`--config-path`), `HARBOUR_*` environment variables and finally CLI flags.
//! The path roots the platform mounts are configuration values rather than
//! process-wide constants, which keeps the socket handling testable against
//! arbitrary directories.

mod defaults;
mod logging;
pub mod telemetry;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_API_URL, DEFAULT_ARCHIVE_SLUG, DEFAULT_CASES_PATH, DEFAULT_GROUND_TRUTH_ROOT,
    DEFAULT_INPUT_ROOT, DEFAULT_LOG_FILTER, DEFAULT_OUTPUT_ROOT, default_api_url,
    default_archive_slug, default_cases_path, default_ground_truth_root, default_input_root,
    default_log_filter_string, default_log_format, default_output_root,
};
pub use logging::{LogFormat, LogFormatParseError, LoggingSettings};
pub use telemetry::{TelemetryError, TelemetryHandle};

/// Configuration for the containerised algorithm.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "HARBOUR")]
pub struct AlgorithmConfig {
    /// Directory holding `inputs.json` and the per-socket inputs.
    #[ortho_config(default = default_input_root())]
    pub input_root: Utf8PathBuf,
    /// Directory the per-socket outputs are written under.
    #[ortho_config(default = default_output_root())]
    pub output_root: Utf8PathBuf,
    /// Optional directory of resources bundled with the algorithm.
    pub resource_root: Option<Utf8PathBuf>,
    /// Whether to log accelerator diagnostics before processing.
    #[ortho_config(default = true)]
    pub probe_accelerators: bool,
    /// Tracing filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Tracing output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            input_root: default_input_root(),
            output_root: default_output_root(),
            resource_root: None,
            probe_accelerators: true,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl AlgorithmConfig {
    /// Path of the platform manifest describing the present input sockets.
    #[must_use]
    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.input_root.join("inputs.json")
    }
}

impl LoggingSettings for AlgorithmConfig {
    fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

/// Configuration for the archive uploader.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "HARBOUR")]
pub struct UploadConfig {
    /// Base URL of the platform REST API.
    #[ortho_config(default = default_api_url())]
    pub api_url: String,
    /// Personal API token; only required when uploading.
    pub api_token: Option<String>,
    /// Slug of the archive receiving the cases.
    #[ortho_config(default = default_archive_slug())]
    pub archive_slug: String,
    /// JSON case table listing the cases and the expected socket sets.
    #[ortho_config(default = default_cases_path())]
    pub cases_path: Utf8PathBuf,
    /// Tracing filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Tracing output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
            archive_slug: default_archive_slug(),
            cases_path: default_cases_path(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl LoggingSettings for UploadConfig {
    fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

/// Configuration for the evaluation method.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "HARBOUR")]
pub struct EvaluationConfig {
    /// Directory holding `predictions.json` and the per-job outputs.
    #[ortho_config(default = default_input_root())]
    pub input_root: Utf8PathBuf,
    /// Directory `metrics.json` is written to.
    #[ortho_config(default = default_output_root())]
    pub output_root: Utf8PathBuf,
    /// Directory holding the ground truth bundled with the evaluation.
    #[ortho_config(default = default_ground_truth_root())]
    pub ground_truth_root: Utf8PathBuf,
    /// Tracing filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Tracing output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            input_root: default_input_root(),
            output_root: default_output_root(),
            ground_truth_root: default_ground_truth_root(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl EvaluationConfig {
    /// Path of the platform's description of the algorithm jobs to score.
    #[must_use]
    pub fn predictions_path(&self) -> Utf8PathBuf {
        self.input_root.join("predictions.json")
    }

    /// Path the aggregated metrics are written to.
    #[must_use]
    pub fn metrics_path(&self) -> Utf8PathBuf {
        self.output_root.join("metrics.json")
    }
}

impl LoggingSettings for EvaluationConfig {
    fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
