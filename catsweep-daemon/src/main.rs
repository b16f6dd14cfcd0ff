use anyhow::Result;
use clap::Parser;

use catsweep_daemon::cli::DaemonCli;
use catsweep_daemon::logging;
use catsweep_daemon::orchestrator::{Orchestrator, load_config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let config = load_config(&cli).await?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "catsweep-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config).await?;

    if cli.once {
        orchestrator.run_once(tokio::io::stdout()).await?;
        return Ok(());
    }

    orchestrator.run().await?;

    tracing::info!("catsweep-daemon shut down");
    Ok(())
}
