use sea_orm::{ConnectOptions, DatabaseConnection};
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub rust_log: String,
    pub relayer_service_log: String,

    pub database_url: String,
    pub sqlx_max_connections: u32,
    pub sqlx_min_connections: Option<u32>,
    pub sqlx_connect_timeout: Option<u64>,
    pub sqlx_idle_timeout: Option<u64>,
    pub sqlx_max_lifetime: Option<u64>,
    pub sqlx_logging: Option<bool>,
    pub relayer_sqlx_logging_level: String,

    pub rpc_ws_url: String,
    pub router_address: String,
    pub active_network: String,

    pub market_data_url: String,
    pub market_data_timeout_secs: Option<u64>,

    pub options_sync_interval_secs: Option<u64>,
    pub watcher_reconnect_secs: Option<u64>,
    pub job_poll_interval_millis: Option<u64>,
    pub job_batch_size: Option<u64>,
    pub job_max_attempts: Option<i32>,
    pub job_backoff_base_secs: Option<i64>,
    pub completed_job_retention_secs: Option<i64>,

    pub slack_notification: bool,
    pub slack_webhook_url: Option<String>,
    pub slack_channel_id: Option<String>,

    pub native_token_symbol: Option<String>,
    pub adapters: Vec<AdapterEntry>,
    pub tokens: Vec<TokenEntry>,
}

/// One configured protocol adapter. `adapter_address` is the deployed
/// on-chain adapter; entries with a missing or zero address are excluded
/// from the registry.
#[derive(Clone, Debug, Deserialize)]
pub struct AdapterEntry {
    pub protocol: String,
    pub protocol_id: String,
    pub adapter_address: String,
    pub kind: String,
    pub market_chain: String,
    pub derivative_symbol: Option<String>,
    pub supported_tokens: Vec<String>,
    pub base_risk: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TokenEntry {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
}

impl Config {
    pub fn market_data_timeout(&self) -> Duration {
        Duration::from_secs(self.market_data_timeout_secs.unwrap_or(30))
    }

    pub fn options_sync_interval(&self) -> Duration {
        Duration::from_secs(self.options_sync_interval_secs.unwrap_or(300))
    }

    pub fn watcher_reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.watcher_reconnect_secs.unwrap_or(5))
    }

    pub fn job_poll_interval(&self) -> Duration {
        Duration::from_millis(self.job_poll_interval_millis.unwrap_or(2_000))
    }

    pub fn job_batch_size(&self) -> u64 {
        self.job_batch_size.unwrap_or(10)
    }

    pub fn job_max_attempts(&self) -> i32 {
        self.job_max_attempts.unwrap_or(3)
    }

    pub fn job_backoff_base_secs(&self) -> i64 {
        self.job_backoff_base_secs.unwrap_or(2)
    }

    pub fn completed_job_retention_secs(&self) -> i64 {
        self.completed_job_retention_secs.unwrap_or(600)
    }

    pub fn native_token_symbol(&self) -> &str {
        self.native_token_symbol.as_deref().unwrap_or("ETH")
    }
}

pub async fn get_db_connection(config: &Config) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let mut options: ConnectOptions = config.database_url.to_owned().into();
    options
        .max_connections(config.sqlx_max_connections)
        .min_connections(match config.sqlx_min_connections {
            Some(v) => v,
            None => 2,
        })
        .connect_timeout(Duration::from_secs(match config.sqlx_connect_timeout {
            Some(v) => v,
            None => 8,
        }))
        .idle_timeout(Duration::from_secs(match config.sqlx_idle_timeout {
            Some(v) => v,
            None => 8,
        }))
        .max_lifetime(Duration::from_secs(match config.sqlx_max_lifetime {
            Some(v) => v,
            None => 8,
        }))
        .sqlx_logging(match config.sqlx_logging {
            Some(v) => v,
            None => false,
        })
        .sqlx_logging_level(
            match config.relayer_sqlx_logging_level.parse::<log::LevelFilter>() {
                Ok(level) => level,
                Err(_) => log::LevelFilter::Info,
            },
        );

    sea_orm::Database::connect(options).await
}
