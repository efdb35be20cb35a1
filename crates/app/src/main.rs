//! Barberbook CLI

use std::process::ExitCode;

use barberbook_app::observability::init_logging;
use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> ExitCode {
    _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();

    if let Err(error) = init_logging(&cli.logging) {
        report(&error.to_string());
        return ExitCode::FAILURE;
    }

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

#[expect(clippy::print_stderr, reason = "errors are reported on stderr")]
fn report(error: &str) {
    eprintln!("{error}");
}
