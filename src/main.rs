mod bridge;
mod cli;
mod console;
mod i18n;
mod logging;
mod model;
mod ops;
mod orchestrator;
mod runner;
mod settings;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // A broken log directory should not keep the tools from running.
    if let Err(err) = logging::init() {
        eprintln!("file logging disabled: {err:#}");
    }

    cli::run(args).await
}
