use std::process::ExitCode;

use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod engine;
mod setup;

/// stdout carries the remote-helper protocol, so logs go to stderr.
fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: cli::Cli) -> anyhow::Result<()> {
    let config = config::HelperConfig::resolve(&cli)?;
    let mut helper = setup::start(&cli, &config).await?;
    let mut stdout = tokio::io::stdout();
    helper.run(BufReader::new(tokio::io::stdin()), &mut stdout).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_logging(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
