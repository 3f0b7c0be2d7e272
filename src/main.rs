//! Pluqqy - compose AI prompts from reusable fragments

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = pluqqy::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
