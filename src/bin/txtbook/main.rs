//! txtbook - compile illustrated text novels into EPUB

mod args;
mod handlers;
mod settings;
mod telemetry;

use std::process::ExitCode;

use clap::Parser;

use args::{Cli, Command};
use handlers::CliError;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = settings::load(&cli)?;
    telemetry::init(&settings.logging)?;

    match cli.command {
        Command::Build(args) => handlers::build(args, &settings),
        Command::Fetch(args) => handlers::fetch(args, &settings),
        Command::Retitle(args) => handlers::retitle(args),
        Command::Batch(args) => handlers::batch(args, &settings),
    }
}
