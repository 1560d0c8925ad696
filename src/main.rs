//! pixie-proxy
//!
//! Forwards the routes declared in a TOML file to one upstream host.
//!
//! ```text
//! Client ──▶ axum route ──▶ proxy layer ──▶ upstream
//!        ◀── relay      ◀── status/headers/body ──┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use pixie_proxy::config::load_config;
use pixie_proxy::lifecycle::startup;
use pixie_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "pixie-proxy")]
#[command(about = "Forward selected routes to an upstream HTTP service", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "pixie.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init(&config.observability);

    tracing::info!(
        config = %cli.config.display(),
        upstream = %config.upstream.host,
        routes = config.routes.len(),
        bind_address = %config.listener.bind_address,
        "Configuration loaded"
    );

    if cli.check {
        println!("{}: configuration OK", cli.config.display());
        return Ok(());
    }

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
