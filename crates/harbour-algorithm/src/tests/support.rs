//! Test harness utilities for the algorithm run suites.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use harbour_config::AlgorithmConfig;
use harbour_sockets::marshal;
use harbour_sockets::{ElementType, ImageArray, Interface, Socket, SocketValues};
use tempfile::TempDir;

use crate::diagnostics::{AcceleratorDevice, AcceleratorProbe, ProbeError};
use crate::handler::{AlgorithmHandler, RunError, RunOutcome};
use crate::processor::{PlaceholderProcessor, ProcessError, Processor};
use crate::reporter::{RunReporter, RunStage};

/// Input and output roots under a temporary directory.
pub struct Mounts {
    _temp: TempDir,
    pub input_root: Utf8PathBuf,
    pub output_root: Utf8PathBuf,
}

impl Mounts {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp dir");
        let input_root = root.join("input");
        fs::create_dir_all(&input_root).expect("create input root");
        Self {
            _temp: temp,
            output_root: root.join("output"),
            input_root,
        }
    }

    pub fn config(&self) -> AlgorithmConfig {
        AlgorithmConfig {
            input_root: self.input_root.clone(),
            output_root: self.output_root.clone(),
            resource_root: None,
            probe_accelerators: false,
            ..AlgorithmConfig::default()
        }
    }

    pub fn write_manifest(&self, slugs: &[&str]) {
        let entries: Vec<serde_json::Value> = slugs
            .iter()
            .map(|slug| serde_json::json!({"interface": {"slug": slug}}))
            .collect();
        fs::write(
            self.input_root.join("inputs.json"),
            serde_json::Value::Array(entries).to_string(),
        )
        .expect("write manifest");
    }

    pub fn write_fundus(&self) {
        let directory = self.input_root.join(Socket::ColorFundusImage.relative_path());
        let image = ImageArray::with_components(
            vec![2, 2, 3],
            3,
            ElementType::U8,
            vec![0.0, 64.0, 128.0, 255.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0],
        )
        .expect("fundus array");
        marshal::store_image(&directory, &image).expect("store fundus");
    }

    pub fn write_age(&self, months: u32) {
        fs::write(
            self.input_root.join(Socket::AgeInMonths.relative_path()),
            months.to_string(),
        )
        .expect("write age");
    }

    pub fn segmentation_path(&self) -> Utf8PathBuf {
        self.output_root
            .join(Socket::BinaryVesselSegmentation.relative_path())
            .join(marshal::OUTPUT_IMAGE_FILE_NAME)
    }

    pub fn output_is_untouched(&self) -> bool {
        !self.output_root.exists()
    }
}

/// Events captured by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Stage(RunStage),
    Resolved(Interface),
    Failed(RunStage),
}

/// Reporter that stores every event it observes.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().expect("events mutex poisoned").clone()
    }

    pub fn stages(&self) -> Vec<RunStage> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RunEvent::Stage(stage) => Some(stage),
                _ => None,
            })
            .collect()
    }

    pub fn failed_stage(&self) -> Option<RunStage> {
        self.events().into_iter().find_map(|event| match event {
            RunEvent::Failed(stage) => Some(stage),
            _ => None,
        })
    }

    fn push(&self, event: RunEvent) {
        self.events.lock().expect("events mutex poisoned").push(event);
    }
}

impl RunReporter for RecordingReporter {
    fn stage_reached(&self, stage: RunStage) {
        self.push(RunEvent::Stage(stage));
    }

    fn interface_resolved(&self, interface: Interface) {
        self.push(RunEvent::Resolved(interface));
    }

    fn run_failed(&self, stage: RunStage, _error: &RunError) {
        self.push(RunEvent::Failed(stage));
    }
}

/// How a [`ScriptedProbe`] behaves when invoked.
#[derive(Debug, Clone, Copy)]
pub enum ProbeScript {
    Devices,
    Fail,
    Panic,
}

/// Probe with a fixed behaviour that counts invocations.
pub struct ScriptedProbe {
    script: ProbeScript,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    pub fn new(script: ProbeScript) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                script,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl AcceleratorProbe for ScriptedProbe {
    fn probe(&self) -> Result<Vec<AcceleratorDevice>, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            ProbeScript::Devices => Ok(vec![AcceleratorDevice {
                index: 0,
                name: String::from("Test Accelerator"),
                memory_total: String::from("16384 MiB"),
            }]),
            ProbeScript::Fail => Err(ProbeError::Parse(String::from("garbage"))),
            ProbeScript::Panic => panic!("probe exploded"),
        }
    }
}

/// Processor that returns a fixed output set regardless of its inputs.
pub struct FixedProcessor {
    outputs: SocketValues,
}

impl FixedProcessor {
    pub fn new(outputs: SocketValues) -> Self {
        Self { outputs }
    }
}

impl Processor for FixedProcessor {
    fn process(
        &self,
        _interface: Interface,
        _inputs: &SocketValues,
    ) -> Result<SocketValues, ProcessError> {
        Ok(self.outputs.clone())
    }
}

/// Runs the placeholder processor against `mounts` with a recording reporter.
pub fn run_placeholder(
    mounts: &Mounts,
    reporter: &Arc<RecordingReporter>,
) -> Result<RunOutcome, RunError> {
    let reporter: Arc<dyn RunReporter> = reporter.clone();
    AlgorithmHandler::new(PlaceholderProcessor::default())
        .with_reporter(reporter)
        .run(&mounts.config())
}

/// Writes a resource file under a fresh directory inside `root`.
pub fn write_resource(root: &Utf8Path, content: &str) -> Utf8PathBuf {
    let directory = root.join("resources");
    fs::create_dir_all(&directory).expect("create resource dir");
    fs::write(directory.join(crate::processor::RESOURCE_FILE_NAME), content)
        .expect("write resource");
    directory
}

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub mounts: Mounts,
    pub reporter: Arc<RecordingReporter>,
    pub outcome: Option<Result<RunOutcome, RunError>>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self {
            mounts: Mounts::new(),
            reporter: Arc::new(RecordingReporter::default()),
            outcome: None,
        }
    }

    pub fn run(&mut self) {
        self.outcome = Some(run_placeholder(&self.mounts, &self.reporter));
    }

    pub fn outcome(&self) -> &Result<RunOutcome, RunError> {
        self.outcome.as_ref().expect("the algorithm has not run")
    }
}

/// Builds a fresh scenario world.
pub fn world() -> TestWorld {
    TestWorld::new()
}
