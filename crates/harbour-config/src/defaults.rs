use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Root the platform mounts algorithm and evaluation inputs under.
pub const DEFAULT_INPUT_ROOT: &str = "/input";

/// Root the platform collects algorithm and evaluation outputs from.
pub const DEFAULT_OUTPUT_ROOT: &str = "/output";

/// Location ground truth is baked into evaluation containers.
pub const DEFAULT_GROUND_TRUTH_ROOT: &str = "/opt/app/ground_truth";

/// Base URL of the platform REST API.
pub const DEFAULT_API_URL: &str = "https://grand-challenge.org/api/v1/";

/// Archive the uploader targets unless configured otherwise.
pub const DEFAULT_ARCHIVE_SLUG: &str = "demo-challenge";

/// Case table consulted by the uploader.
pub const DEFAULT_CASES_PATH: &str = "cases.json";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default input root as an owned path.
pub fn default_input_root() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_INPUT_ROOT)
}

/// Default output root as an owned path.
pub fn default_output_root() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_OUTPUT_ROOT)
}

/// Default ground truth directory as an owned path.
pub fn default_ground_truth_root() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_GROUND_TRUTH_ROOT)
}

/// Default case table path as an owned path.
pub fn default_cases_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_CASES_PATH)
}

/// Owned API base URL used where allocation is required (e.g. serde).
pub fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

/// Owned archive slug used where allocation is required (e.g. serde).
pub fn default_archive_slug() -> String {
    DEFAULT_ARCHIVE_SLUG.to_owned()
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}
