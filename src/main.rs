//! ccx - inspect and resolve layered configuration
//!
//! Loads a parameter declaration file plus source declaration files and
//! resolves parameters through the config-composer engine.

use clap::Parser;
use config_composer::cli::Cli;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();

    init_logging(cli.debug);

    if let Err(e) = run(cli) {
        error!("Error: {}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    info!("Starting ccx");
    cli.execute()?;
    Ok(())
}

fn init_logging(debug: bool) {
    let default_filter = if debug {
        "ccx=debug,config_composer=debug"
    } else {
        "ccx=info,config_composer=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
