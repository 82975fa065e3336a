//! Algorithm container entry point.
//!
//! A run reads the platform's `inputs.json`, resolves the listed sockets to a
//! registered [`harbour_sockets::Interface`], loads every input, hands them to
//! a [`Processor`] and writes the declared outputs under the output root. The
//! run is a linear state machine; [`RunReporter`] observes each transition and
//! any failure aborts the run before later stages execute.
//!
//! Accelerator diagnostics are a side channel: when enabled they are logged
//! after inputs load and never change the outcome.

mod diagnostics;
mod handler;
mod processor;
mod reporter;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use harbour_config::AlgorithmConfig;
use harbour_config::telemetry::{self, TelemetryError};
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

pub use diagnostics::{
    AcceleratorDevice, AcceleratorProbe, NvidiaSmiProbe, ProbeError, report_accelerators,
};
pub use handler::{AlgorithmHandler, RunError, RunOutcome};
pub use processor::{PlaceholderProcessor, ProcessError, Processor, RESOURCE_FILE_NAME};
pub use reporter::{RunReporter, RunStage, StructuredRunReporter};

/// Top-level failures of the algorithm binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(#[source] Arc<OrthoError>),
    /// Telemetry could not be initialised.
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    /// The run aborted.
    #[error("algorithm run failed: {0}")]
    Run(#[from] RunError),
}

/// Runs the algorithm with configuration taken from `args`, the environment
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

fn try_run<I>(args: I) -> Result<RunOutcome, AppError>
where
    I: IntoIterator<Item = OsString>,
{
    let config = AlgorithmConfig::load_from_iter(args).map_err(AppError::LoadConfiguration)?;
    telemetry::initialise(&config)?;

    let processor = PlaceholderProcessor::new(config.resource_root.clone());
    let handler = if config.probe_accelerators {
        AlgorithmHandler::new(processor).with_probe(NvidiaSmiProbe::default())
    } else {
        AlgorithmHandler::new(processor)
    };
    Ok(handler.run(&config)?)
}

#[cfg(test)]
mod tests;
