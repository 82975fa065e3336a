use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for the platform's log collector.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Logging knobs shared by every harbour binary configuration.
pub trait LoggingSettings {
    /// Filter expression handed to `tracing_subscriber::EnvFilter`.
    fn log_filter(&self) -> &str;

    /// Output format of the installed subscriber.
    fn log_format(&self) -> LogFormat;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::LogFormat;

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case("COMPACT", LogFormat::Compact)]
    fn parses_log_formats_case_insensitively(#[case] text: &str, #[case] expected: LogFormat) {
        let parsed: LogFormat = text.parse().expect("log format should parse");
        assert_eq!(parsed, expected);
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!("pretty".parse::<LogFormat>().is_err());
    }
}
