use clap::Parser;
use cmdl_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Fall back to stderr-only logging when the state dir is unusable.
    if let Err(err) = logging::init_logging(cli.verbose) {
        logging::init_logging_stderr(cli.verbose);
        tracing::debug!("log file unavailable: {:#}", err);
    }

    if let Err(err) = cli.run().await {
        eprintln!("cmdl error: {:#}", err);
        std::process::exit(1);
    }
}
