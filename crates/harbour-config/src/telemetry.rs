//! Structured telemetry initialisation shared by the harbour binaries.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::logging::{LogFormat, LoggingSettings};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: the first invocation installs the global
/// subscriber and later invocations return a fresh [`TelemetryHandle`]
/// without touching the global state again. Logs always go to stderr so the
/// platform's stdout capture stays free for the algorithm's own output.
pub fn initialise(settings: &impl LoggingSettings) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(settings))
        .map(|_| TelemetryHandle)
}

fn install_subscriber(settings: &impl LoggingSettings) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(settings.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match settings.log_format() {
        LogFormat::Json => {
            let json_builder = builder(filter.clone()).json();
            let json = json_builder.flatten_event(true).finish();
            Box::new(json)
        }
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
