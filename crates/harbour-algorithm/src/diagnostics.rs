//! Best-effort reporting of the accelerators visible to the run.
//!
//! Diagnostics never influence the run's outcome: probe failures, including
//! panics inside a probe, are logged as warnings and swallowed.

use std::ffi::{OsStr, OsString};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{info, warn};

const DIAGNOSTICS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::diagnostics");
const DEFAULT_PROGRAM: &str = "nvidia-smi";
const QUERY_ARGUMENTS: [&str; 2] = [
    "--query-gpu=index,name,memory.total",
    "--format=csv,noheader",
];

/// One accelerator reported by a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceleratorDevice {
    /// Device ordinal.
    pub index: u32,
    /// Marketing name.
    pub name: String,
    /// Total memory as reported by the driver, units included.
    pub memory_total: String,
}

/// Errors raised by an [`AcceleratorProbe`].
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe program could not be started.
    #[error("failed to launch '{program}': {source}")]
    Launch {
        /// Program that failed to launch.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The probe program exited unsuccessfully.
    #[error("'{program}' exited with {status}: {stderr}")]
    Status {
        /// Program that failed.
        program: String,
        /// Rendered exit status.
        status: String,
        /// Captured standard error.
        stderr: String,
    },
    /// A line of probe output could not be interpreted.
    #[error("unrecognised accelerator line '{0}'")]
    Parse(String),
}

/// Source of accelerator information.
pub trait AcceleratorProbe {
    /// Lists the accelerators visible to the process.
    fn probe(&self) -> Result<Vec<AcceleratorDevice>, ProbeError>;
}

/// Probe backed by the `nvidia-smi` query interface.
#[derive(Debug, Clone)]
pub struct NvidiaSmiProbe {
    program: OsString,
}

impl NvidiaSmiProbe {
    /// Builds a probe that runs `program` instead of `nvidia-smi`.
    #[must_use]
    pub fn with_program(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
        }
    }
}

impl Default for NvidiaSmiProbe {
    fn default() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }
}

impl AcceleratorProbe for NvidiaSmiProbe {
    fn probe(&self) -> Result<Vec<AcceleratorDevice>, ProbeError> {
        let program = self.program.to_string_lossy().into_owned();
        let output = Command::new(&self.program)
            .args(QUERY_ARGUMENTS)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ProbeError::Launch {
                program: program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(ProbeError::Status {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        parse_devices(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses `index, name, memory.total` CSV rows, skipping blank lines.
pub(crate) fn parse_devices(text: &str) -> Result<Vec<AcceleratorDevice>, ProbeError> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_device)
        .collect()
}

fn parse_device(line: &str) -> Result<AcceleratorDevice, ProbeError> {
    let mut fields = line.splitn(3, ',').map(str::trim);
    match (fields.next(), fields.next(), fields.next()) {
        (Some(index), Some(name), Some(memory)) if !name.is_empty() => {
            let index = index
                .parse()
                .map_err(|_| ProbeError::Parse(line.to_owned()))?;
            Ok(AcceleratorDevice {
                index,
                name: name.to_owned(),
                memory_total: memory.to_owned(),
            })
        }
        _ => Err(ProbeError::Parse(line.to_owned())),
    }
}

/// Logs the accelerators `probe` reports.
///
/// Returns the devices on success and `None` when the probe failed or
/// panicked; neither case is propagated.
pub fn report_accelerators(probe: &dyn AcceleratorProbe) -> Option<Vec<AcceleratorDevice>> {
    match panic::catch_unwind(AssertUnwindSafe(|| probe.probe())) {
        Ok(Ok(devices)) => {
            info!(
                target: DIAGNOSTICS_TARGET,
                available = !devices.is_empty(),
                count = devices.len(),
                "accelerator probe completed"
            );
            for device in &devices {
                info!(
                    target: DIAGNOSTICS_TARGET,
                    index = device.index,
                    name = %device.name,
                    memory_total = %device.memory_total,
                    "accelerator detected"
                );
            }
            Some(devices)
        }
        Ok(Err(error)) => {
            warn!(
                target: DIAGNOSTICS_TARGET,
                error = %error,
                "accelerator probe failed; continuing without diagnostics"
            );
            None
        }
        Err(_) => {
            warn!(
                target: DIAGNOSTICS_TARGET,
                "accelerator probe panicked; continuing without diagnostics"
            );
            None
        }
    }
}
