//! Command-line surface of the uploader.
//!
//! Configuration flags (see [`CONFIG_CLI_FLAGS`]) must precede the subcommand.
//! They are split off and handed to `ortho_config`, while `clap` parses the
//! remaining tokens.

use std::ffi::{OsStr, OsString};

use clap::{Parser, Subcommand};

/// CLI flags recognised by the configuration loader.
///
/// Keep in sync with the fields of `harbour_config::UploadConfig`.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--api-url",
    "--api-token",
    "--archive-slug",
    "--cases-path",
    "--log-filter",
    "--log-format",
];

/// Uploads local cases to a challenge archive.
#[derive(Debug, Parser)]
#[command(name = "harbour-upload", version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub(crate) enum Command {
    /// Validate every case without contacting the archive.
    Check,
    /// Validate every case, then upload them in order.
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn process_config_flag(argument: &OsStr) -> FlagAction {
    let argument_text = argument.to_string_lossy();
    if !argument_text.starts_with("--") {
        return FlagAction::Skip;
    }

    let mut flag_parts = argument_text.splitn(2, '=');
    let flag = flag_parts.next().unwrap_or_default();
    let has_inline_value = flag_parts.next().is_some();

    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Skip
    }
}

/// Arguments for the configuration loader and for `clap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) cli_arguments: Vec<OsString>,
}

/// Splits the leading configuration flags from the subcommand tokens.
///
/// Both halves keep the program name as their first element.
pub(crate) fn split_arguments(args: &[OsString]) -> ArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ArgumentSplit {
            config_arguments: Vec::new(),
            cli_arguments: Vec::new(),
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut pending_value = false;
    let mut command_start = rest.len();
    for (index, argument) in rest.iter().enumerate() {
        if pending_value {
            config_arguments.push(argument.clone());
            pending_value = false;
            continue;
        }
        match process_config_flag(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                pending_value = needs_value;
            }
            FlagAction::Skip => {
                command_start = index;
                break;
            }
        }
    }

    let mut cli_arguments = vec![program.clone()];
    cli_arguments.extend(rest.iter().skip(command_start).cloned());
    ArgumentSplit {
        config_arguments,
        cli_arguments,
    }
}
