//! Container entry point for the harbour evaluation method.

use std::io::{self, StderrLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    harbour_evaluate::run(std::env::args_os(), &mut stderr)
}
