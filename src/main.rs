mod cli;
mod engine;
mod error;
mod layout;
mod logging;
mod model;
mod orchestrator;
mod progress;
mod storage;
#[cfg(test)]
mod testing;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let _log_guard = logging::init_logger(&storage::base_dir());
    cli::run(args).await
}
