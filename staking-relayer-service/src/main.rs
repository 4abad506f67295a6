mod adapters;
mod config;
mod dto;
mod event_watcher;
mod job_queue;
mod market_data;
mod notify;
mod options_sync;
mod reconciler;
mod sql_stmt;

use figment::{
    providers::{Format, Toml},
    Figment,
};
use sea_orm::DatabaseConnection;
use staking_evm_client::Address;
use std::error::Error;
use tokio::task;
use tracing::info;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use adapters::AdapterRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config: config::Config = Figment::new().merge(Toml::file("App.toml")).extract()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", &config.rust_log);
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                format!("staking_relayer_service={}", &config.relayer_service_log)
                    .parse()
                    .expect("Error parsing directive"),
            ),
        )
        .with_span_events(FmtSpan::FULL)
        .init();

    let router: Address = config
        .router_address
        .parse()
        .map_err(|e| format!("invalid router_address in App.toml: {e}"))?;

    let db: DatabaseConnection = config::get_db_connection(&config).await?;
    let client = reqwest::Client::builder()
        .build()
        .expect("Reqwest client failed to initialize!");

    info!(
        "Relayer service starting - network: {}, router: {router}",
        config.active_network
    );

    {
        let watcher_config = config.clone();
        let watcher_db = db.clone();
        task::spawn(async move {
            event_watcher::run(watcher_config, router, watcher_db).await;
        });
    }

    {
        let sync_registry = AdapterRegistry::from_config(&config);
        let sync_config = config.clone();
        let sync_db = db.clone();
        let sync_client = client.clone();
        task::spawn(async move {
            options_sync::run_scheduler(sync_config, sync_db, sync_registry, sync_client).await;
        });
    }

    let registry = AdapterRegistry::from_config(&config);
    reconciler::run_worker(config, db, registry, client).await;
    Ok(())
}
