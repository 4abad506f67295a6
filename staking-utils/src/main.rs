mod diagnose;
mod refresh;

use clap::{Parser, Subcommand};
use figment::{
    providers::{Format, Toml},
    Figment,
};
use serde::Deserialize;

use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

#[derive(Debug, Parser)]
#[clap(name = "staking-utils")]
#[clap(about = "Operator utilities for the staking relayer", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Verify router fee and adapter whitelist status against App.toml.
    Diagnose,
    /// Queue one manual option refresh outside the regular schedule.
    TriggerRefresh,
}

/// The subset of App.toml the utilities need.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub rpc_http_url: String,
    pub relayer_private_key: String,
    pub router_address: String,
    pub adapters: Vec<AdapterEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AdapterEntry {
    pub protocol: String,
    pub adapter_address: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                "staking_utils=info"
                    .parse()
                    .expect("Error parsing directive"),
            ),
        )
        .with_span_events(FmtSpan::FULL)
        .init();

    let config: Config = Figment::new().merge(Toml::file("App.toml")).extract()?;
    let cli: Cli = Cli::parse();

    match cli.commands {
        Commands::Diagnose => diagnose::run(&config).await?,
        Commands::TriggerRefresh => refresh::run(&config).await?,
    }

    Ok(())
}
