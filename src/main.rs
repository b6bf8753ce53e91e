//! Sable - code formatter with a pluggable formatting pipeline

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = sable_fmt::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
