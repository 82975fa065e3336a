//! The algorithm run: resolve, load, process, check, store.

use std::collections::BTreeSet;
use std::sync::Arc;

use camino::Utf8PathBuf;
use harbour_config::AlgorithmConfig;
use harbour_sockets::marshal::{self, MarshalError};
use harbour_sockets::{Interface, Manifest, ManifestError, ResolveError, Socket, SocketValues};
use thiserror::Error;

use crate::diagnostics::{self, AcceleratorProbe};
use crate::processor::{ProcessError, Processor};
use crate::reporter::{RunReporter, RunStage, StructuredRunReporter};

/// Errors that abort an algorithm run.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    /// `inputs.json` could not be read or parsed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// The manifest's socket combination is not registered.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// An input socket failed to load.
    #[error("failed to load input '{socket}': {source}")]
    LoadInput {
        /// Socket being loaded.
        socket: Socket,
        /// Marshalling failure.
        #[source]
        source: MarshalError,
    },
    /// The processor failed.
    #[error("processing failed: {0}")]
    Process(#[from] ProcessError),
    /// The processor's output set differs from the interface's outputs.
    #[error("processor produced outputs {actual:?} but the interface declares {expected:?}")]
    UnexpectedOutputs {
        /// Outputs the interface declares.
        expected: Vec<Socket>,
        /// Outputs the processor returned.
        actual: Vec<Socket>,
    },
    /// An output socket failed to store.
    #[error("failed to store output '{socket}': {source}")]
    StoreOutput {
        /// Socket being stored.
        socket: Socket,
        /// Marshalling failure.
        #[source]
        source: MarshalError,
    },
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Interface the manifest resolved to.
    pub interface: Interface,
    /// Files written for each output socket.
    pub written: Vec<(Socket, Utf8PathBuf)>,
}

/// Drives one algorithm run with injected collaborators.
pub struct AlgorithmHandler<P> {
    processor: P,
    probe: Option<Box<dyn AcceleratorProbe>>,
    reporter: Arc<dyn RunReporter>,
}

impl<P> AlgorithmHandler<P>
where
    P: Processor,
{
    /// Creates a handler that logs through [`StructuredRunReporter`] and
    /// skips accelerator diagnostics.
    #[must_use]
    pub fn new(processor: P) -> Self {
        Self {
            processor,
            probe: None,
            reporter: Arc::new(StructuredRunReporter::new()),
        }
    }

    /// Reports accelerators through `probe` once inputs are loaded.
    #[must_use]
    pub fn with_probe(mut self, probe: impl AcceleratorProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Replaces the run reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn RunReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Executes the run against the configured input and output roots.
    ///
    /// Nothing is written under the output root unless every earlier stage
    /// succeeded.
    pub fn run(&self, config: &AlgorithmConfig) -> Result<RunOutcome, RunError> {
        let mut stage = RunStage::Start;
        self.reporter.stage_reached(stage);
        match self.advance(config, &mut stage) {
            Ok(outcome) => {
                self.reporter.stage_reached(RunStage::Done);
                Ok(outcome)
            }
            Err(error) => {
                self.reporter.run_failed(stage, &error);
                Err(error)
            }
        }
    }

    fn advance(
        &self,
        config: &AlgorithmConfig,
        stage: &mut RunStage,
    ) -> Result<RunOutcome, RunError> {
        let manifest = Manifest::read(&config.manifest_path())?;
        let interface = harbour_sockets::resolve(&manifest)?;
        self.reporter.interface_resolved(interface);
        self.enter(stage, RunStage::InterfaceResolved);

        let inputs = load_inputs(interface, config)?;
        self.enter(stage, RunStage::InputsLoaded);

        if let Some(probe) = self.probe.as_deref() {
            diagnostics::report_accelerators(probe);
        }

        let outputs = self.processor.process(interface, &inputs)?;
        check_outputs(interface, &outputs)?;
        self.enter(stage, RunStage::Processed);

        let written = store_outputs(interface, &outputs, config)?;
        self.enter(stage, RunStage::OutputsWritten);

        Ok(RunOutcome { interface, written })
    }

    fn enter(&self, stage: &mut RunStage, next: RunStage) {
        *stage = next;
        self.reporter.stage_reached(next);
    }
}

fn load_inputs(interface: Interface, config: &AlgorithmConfig) -> Result<SocketValues, RunError> {
    interface
        .inputs()
        .iter()
        .map(|&socket| {
            marshal::load_socket(socket, &config.input_root)
                .map(|value| (socket, value))
                .map_err(|source| RunError::LoadInput { socket, source })
        })
        .collect()
}

fn check_outputs(interface: Interface, outputs: &SocketValues) -> Result<(), RunError> {
    let expected: BTreeSet<Socket> = interface.outputs().iter().copied().collect();
    let actual: BTreeSet<Socket> = outputs.sockets().collect();
    if expected == actual {
        Ok(())
    } else {
        Err(RunError::UnexpectedOutputs {
            expected: expected.into_iter().collect(),
            actual: actual.into_iter().collect(),
        })
    }
}

fn store_outputs(
    interface: Interface,
    outputs: &SocketValues,
    config: &AlgorithmConfig,
) -> Result<Vec<(Socket, Utf8PathBuf)>, RunError> {
    let mut written = Vec::with_capacity(interface.outputs().len());
    for (socket, value) in outputs.iter() {
        let path = marshal::store_socket(socket, &config.output_root, value)
            .map_err(|source| RunError::StoreOutput { socket, source })?;
        written.push((socket, path));
    }
    Ok(written)
}
