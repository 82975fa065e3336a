//! Uploads local cases to a challenge archive.
//!
//! The uploader reads a case table, validates every case against the accepted
//! socket sets and only then talks to the archive. `check` stops after
//! validation; `upload` resolves the archive, creates one item per case and
//! attaches the case's files and values to it.

mod cases;
mod cli;
mod client;
mod http;
mod uploader;
mod validate;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use harbour_config::UploadConfig;
use harbour_config::telemetry::{self, TelemetryError};
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

pub use cases::{Case, CaseTable, CaseTableError, SocketSet, default_expected_socket_sets};
pub use client::{Archive, ArchiveClient, ArchiveItem, ClientError};
pub use http::GrandChallengeClient;
pub use uploader::{UploadError, UploadSummary, upload};
pub use validate::{
    CaseContents, InvalidCase, SocketContent, ValidationError, validate, validate_all,
};

use cli::{Cli, Command, split_arguments};

/// Top-level failures of the upload binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// The command line could not be parsed.
    #[error(transparent)]
    CliUsage(#[from] clap::Error),
    /// Configuration failed to load.
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(#[source] Arc<OrthoError>),
    /// Telemetry could not be initialised.
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    /// The case table could not be read.
    #[error(transparent)]
    CaseTable(#[from] CaseTableError),
    /// A case failed pre-flight validation.
    #[error("pre-flight validation failed: {0}")]
    Invalid(#[from] InvalidCase),
    /// The archive client could not be built.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// The upload failed part way.
    #[error(transparent)]
    Upload(#[from] UploadError),
    /// Writing the report failed.
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

/// Validates every case in `table` and, if all pass, uploads them.
///
/// `client` is not called when any case is invalid.
pub fn upload_table(
    table: &CaseTable,
    client: &dyn ArchiveClient,
    archive_slug: &str,
) -> Result<UploadSummary, AppError> {
    let contents = validate_all(&table.cases, &table.expected_socket_sets)?;
    Ok(upload(&contents, client, archive_slug)?)
}

/// Runs the uploader CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    match try_run(args, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn try_run<I, W>(args: I, stdout: &mut W) -> Result<(), AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_arguments(&args);
    let cli = Cli::try_parse_from(split.cli_arguments)?;
    let config =
        UploadConfig::load_from_iter(split.config_arguments).map_err(AppError::LoadConfiguration)?;
    telemetry::initialise(&config)?;

    let table = CaseTable::read(&config.cases_path)?;
    let contents = validate_all(&table.cases, &table.expected_socket_sets)?;
    match cli.command {
        Command::Check => write_check_report(stdout, &contents).map_err(AppError::Output),
        Command::Upload => {
            let token = config.api_token.as_deref().unwrap_or_default();
            let client = GrandChallengeClient::new(&config.api_url, token)?;
            let summary = upload(&contents, &client, &config.archive_slug)?;
            writeln!(
                stdout,
                "uploaded {} case(s) to {}",
                summary.items.len(),
                summary.archive_title
            )
            .map_err(AppError::Output)
        }
    }
}

fn write_check_report(out: &mut impl Write, contents: &[CaseContents]) -> std::io::Result<()> {
    for (index, case) in contents.iter().enumerate() {
        writeln!(out, "case {index}:")?;
        for (socket, content) in case.iter() {
            match content {
                SocketContent::Files(files) => {
                    writeln!(out, "  {socket}: {} file(s)", files.len())?;
                }
                SocketContent::Value(value) => writeln!(out, "  {socket}: {value}")?,
            }
        }
    }
    writeln!(out, "{} case(s) valid", contents.len())
}

#[cfg(test)]
mod tests;
