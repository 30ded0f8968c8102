use std::process::ExitCode;

use clap::Parser;
use shroud_app::{App, CliArgs};

fn main() -> ExitCode {
    if App::run(CliArgs::parse()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
