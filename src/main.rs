//! azm - Azure resource automation CLI

use clap::Parser;
use tracing::{error, info};

use azmanage::cli::Cli;
use azmanage::config::load_config_no_validation;
use azmanage::logging::init_logging;
use azmanage::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Validation is left to commands that talk to Azure
    let config = cli.apply_overrides(load_config_no_validation().await?);
    let _log_guard = init_logging(config.debug, &config.log_file);

    info!("Starting azm {}", env!("VERSION_WITH_GIT"));
    cli.execute(config).await
}
