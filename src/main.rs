#![deny(unsafe_code)]

use std::env;
use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    cli::run(env::args_os())
}
