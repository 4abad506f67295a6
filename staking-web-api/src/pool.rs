use async_trait::async_trait;
use rocket::serde::Deserialize;
use rocket::Config;
use sea_orm::ConnectOptions;
use sea_orm_rocket::{rocket::figment::Figment, Database};
use std::time::Duration;

#[derive(Database, Debug)]
#[database("sea_orm")]
pub struct Db(SeaOrmPool);

#[derive(Debug, Clone)]
pub struct SeaOrmPool {
    pub conn: sea_orm::DatabaseConnection,
}

#[async_trait]
impl sea_orm_rocket::Pool for SeaOrmPool {
    type Error = sea_orm::DbErr;

    type Connection = sea_orm::DatabaseConnection;

    async fn init(_figment: &Figment) -> Result<Self, Self::Error> {
        let config = Config::figment().extract::<StakingConfig>().unwrap();
        let mut options: ConnectOptions = config.database_url.into();
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
                match config
                    .web_api_sqlx_logging_level
                    .parse::<log::LevelFilter>()
                {
                    Ok(level) => level,
                    Err(_) => log::LevelFilter::Info,
                },
            );

        let conn = sea_orm::Database::connect(options).await?;

        Ok(SeaOrmPool { conn })
    }

    fn borrow(&self) -> &Self::Connection {
        &self.conn
    }
}

#[derive(Clone, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct StakingConfig {
    database_url: String,
    sqlx_max_connections: u32,
    sqlx_min_connections: Option<u32>,
    sqlx_connect_timeout: Option<u64>,
    sqlx_idle_timeout: Option<u64>,
    sqlx_max_lifetime: Option<u64>,
    sqlx_logging: Option<bool>,
    web_api_sqlx_logging_level: String,
    pub rust_log: String,
    pub web_api_log: String,
    pub cors_allowed_domains: String,

    pub active_network: String,
    pub rpc_http_url: String,
    pub relayer_private_key: String,
    pub router_address: String,
    pub native_token_symbol: Option<String>,
    pub tokens: Vec<TokenEntry>,
    pub confirm_attempts: Option<u32>,
    pub confirm_timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct TokenEntry {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
}

impl StakingConfig {
    pub fn native_token_symbol(&self) -> &str {
        self.native_token_symbol.as_deref().unwrap_or("ETH")
    }

    pub fn confirm_attempts(&self) -> u32 {
        self.confirm_attempts.unwrap_or(3)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs.unwrap_or(60))
    }

    /// Resolves a token symbol to its on-chain address and decimal count.
    /// The chain's gas token travels as the zero-address sentinel.
    pub fn resolve_token(&self, symbol: &str) -> Option<(String, u8)> {
        if symbol == self.native_token_symbol() {
            return Some((
                "0x0000000000000000000000000000000000000000".to_owned(),
                18,
            ));
        }
        self.tokens
            .iter()
            .find(|t| t.symbol == symbol)
            .map(|t| (t.address.to_owned(), t.decimals))
    }
}
