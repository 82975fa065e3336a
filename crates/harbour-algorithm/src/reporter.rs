//! Structured reporting of the algorithm run's progress.

use std::fmt;
use std::sync::Arc;

use harbour_sockets::Interface;

use crate::handler::RunError;

const RUN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::run");

/// States of the linear run state machine, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunStage {
    /// Nothing has been read yet.
    Start,
    /// The manifest resolved to a registered interface.
    InterfaceResolved,
    /// Every input socket of the interface was loaded.
    InputsLoaded,
    /// The processor produced the declared outputs.
    Processed,
    /// Every output socket was written.
    OutputsWritten,
    /// The run finished successfully.
    Done,
}

impl RunStage {
    /// Stages in the order a successful run passes through them.
    pub const ORDERED: [Self; 6] = [
        Self::Start,
        Self::InterfaceResolved,
        Self::InputsLoaded,
        Self::Processed,
        Self::OutputsWritten,
        Self::Done,
    ];
}

impl fmt::Display for RunStage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Start => "start",
            Self::InterfaceResolved => "interface_resolved",
            Self::InputsLoaded => "inputs_loaded",
            Self::Processed => "processed",
            Self::OutputsWritten => "outputs_written",
            Self::Done => "done",
        };
        formatter.write_str(label)
    }
}

/// Observer notified as the run moves through its stages.
pub trait RunReporter: Send + Sync {
    /// Invoked when the run enters `stage`.
    fn stage_reached(&self, stage: RunStage);

    /// Invoked once the manifest resolved.
    fn interface_resolved(&self, interface: Interface);

    /// Invoked when the run aborts while in `stage`.
    fn run_failed(&self, stage: RunStage, error: &RunError);
}

impl<T> RunReporter for Arc<T>
where
    T: RunReporter,
{
    fn stage_reached(&self, stage: RunStage) {
        (**self).stage_reached(stage);
    }

    fn interface_resolved(&self, interface: Interface) {
        (**self).interface_resolved(interface);
    }

    fn run_failed(&self, stage: RunStage, error: &RunError) {
        (**self).run_failed(stage, error);
    }
}

/// Default reporter that records run events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredRunReporter;

impl StructuredRunReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RunReporter for StructuredRunReporter {
    fn stage_reached(&self, stage: RunStage) {
        tracing::info!(
            target: RUN_TARGET,
            event = "stage_reached",
            stage = %stage,
            "run reached {stage}"
        );
    }

    fn interface_resolved(&self, interface: Interface) {
        tracing::info!(
            target: RUN_TARGET,
            event = "interface_resolved",
            interface = %interface,
            "resolved input interface"
        );
    }

    fn run_failed(&self, stage: RunStage, error: &RunError) {
        tracing::error!(
            target: RUN_TARGET,
            event = "run_failed",
            stage = %stage,
            error = %error,
            "algorithm run failed"
        );
    }
}
