//! The processing step between loading inputs and writing outputs.

use std::fs;
use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use harbour_sockets::{ImageArray, Interface, PayloadValue, Socket, SocketValues};
use thiserror::Error;

const PROCESSOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::processor");

/// Resource the placeholder processor reports when a resource root is set.
pub const RESOURCE_FILE_NAME: &str = "some_resource.txt";

/// Errors raised by a [`Processor`].
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    /// An input the interface declares was not handed to the processor.
    #[error("input socket '{socket}' is missing")]
    MissingInput {
        /// Absent socket.
        socket: Socket,
    },
    /// A bundled resource could not be read.
    #[error("failed to read resource '{path}': {source}")]
    Resource {
        /// Resource location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Turns the loaded inputs of an interface into its outputs.
///
/// Implementations must return exactly the interface's declared output
/// sockets; the handler rejects any other set.
pub trait Processor {
    /// Processes one run's inputs.
    fn process(
        &self,
        interface: Interface,
        inputs: &SocketValues,
    ) -> Result<SocketValues, ProcessError>;
}

/// Stand-in for a real model: reports its inputs and emits a fixed
/// 4 × 2 identity-like segmentation.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderProcessor {
    resource_root: Option<Utf8PathBuf>,
}

impl PlaceholderProcessor {
    /// Builds a processor that reads bundled resources from `resource_root`.
    #[must_use]
    pub fn new(resource_root: Option<Utf8PathBuf>) -> Self {
        Self { resource_root }
    }

    fn report_resource(&self) -> Result<(), ProcessError> {
        let Some(root) = self.resource_root.as_ref() else {
            return Ok(());
        };
        let path = root.join(RESOURCE_FILE_NAME);
        let content = fs::read_to_string(&path).map_err(|source| ProcessError::Resource {
            path: path.clone(),
            source: Arc::new(source),
        })?;
        tracing::info!(
            target: PROCESSOR_TARGET,
            resource = %path,
            content = %content.trim_end(),
            "read bundled resource"
        );
        Ok(())
    }
}

impl Processor for PlaceholderProcessor {
    fn process(
        &self,
        interface: Interface,
        inputs: &SocketValues,
    ) -> Result<SocketValues, ProcessError> {
        self.report_resource()?;
        match interface {
            Interface::ColorFundusWithAge => {
                let fundus = inputs
                    .image(Socket::ColorFundusImage)
                    .ok_or(ProcessError::MissingInput {
                        socket: Socket::ColorFundusImage,
                    })?;
                let age = inputs
                    .json(Socket::AgeInMonths)
                    .ok_or(ProcessError::MissingInput {
                        socket: Socket::AgeInMonths,
                    })?;
                tracing::info!(
                    target: PROCESSOR_TARGET,
                    fundus_shape = ?fundus.shape(),
                    age_in_months = %age,
                    "producing placeholder vessel segmentation"
                );

                let mut outputs = SocketValues::new();
                outputs.insert(
                    Socket::BinaryVesselSegmentation,
                    PayloadValue::Image(ImageArray::eye(4, 2)),
                );
                Ok(outputs)
            }
        }
    }
}
