use std::collections::HashMap;

use sea_orm::DatabaseConnection;
use staking_evm_client::units::format_base_units;
use staking_evm_client::{Address, RouterEvent, RouterEvents, U256};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::job_queue::{self, NewTransactionJob, JOB_STAKE, JOB_UNSTAKE};

#[derive(Clone, Debug)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
}

/// Static address -> (symbol, decimals) table from configuration, keyed
/// by lowercase address.
pub fn token_table(config: &Config) -> HashMap<String, TokenMetadata> {
    config
        .tokens
        .iter()
        .map(|t| {
            (
                t.address.to_lowercase(),
                TokenMetadata {
                    symbol: t.symbol.to_owned(),
                    decimals: t.decimals,
                },
            )
        })
        .collect()
}

/// Long-lived subscription loop for the router's Staked/Unstaked events.
/// Every subscription or stream error falls through to a delayed
/// reconnect; the loop never gives up on its own.
pub async fn run(config: Config, router: Address, db: DatabaseConnection) {
    let tokens = token_table(&config);
    loop {
        match RouterEvents::subscribe(&config.rpc_ws_url, router).await {
            Ok(mut events) => {
                info!("Watching Staked/Unstaked events on {router}");
                while let Some(log) = events.next().await {
                    handle_log(&db, &tokens, &log).await;
                }
                warn!("Router event subscription ended, reconnecting...");
            }
            Err(error) => {
                error!("Failed to start router event subscription: {error}");
            }
        }
        sleep(config.watcher_reconnect_delay()).await;
    }
}

/// Each log is handled on its own so a malformed one cannot take down
/// its siblings or the subscription.
async fn handle_log(
    db: &DatabaseConnection,
    tokens: &HashMap<String, TokenMetadata>,
    log: &staking_evm_client::Log,
) {
    let event = match RouterEvent::decode(log) {
        Ok(Some(event)) => event,
        Ok(None) => return,
        Err(error) => {
            warn!("Dropping router log that failed to decode: {error}");
            return;
        }
    };
    if let Some(job) = job_from_event(&event, tokens) {
        job_queue::enqueue(db, job).await;
    }
}

/// Normalizes a decoded event into a queue payload. Unrecognized token
/// addresses are recorded with an UNKNOWN symbol at 18 decimals rather
/// than dropped; an imperfect job beats a lost event. Protocol identity
/// is resolved later by the reconciler, not here.
pub fn job_from_event(
    event: &RouterEvent,
    tokens: &HashMap<String, TokenMetadata>,
) -> Option<NewTransactionJob> {
    match event {
        RouterEvent::Staked {
            user,
            token,
            amount,
            adapter,
            fee,
            tx_hash,
            block_number,
        } => {
            info!("New Staked event detected: {tx_hash}");
            if amount.is_zero() {
                warn!("Dropping Staked event {tx_hash} with zero amount");
                return None;
            }
            let (symbol, decimals) = resolve_token(tokens, token);
            Some(NewTransactionJob {
                job_kind: JOB_STAKE,
                tx_hash: tx_hash.to_string(),
                user_address: user.to_string(),
                token: symbol,
                token_address: Some(token.to_string()),
                adapter_address: Some(adapter.to_string()),
                amount: format_amount(*amount, decimals, tx_hash)?,
                fee: Some(format_amount(*fee, decimals, tx_hash).unwrap_or_else(|| "0".to_owned())),
                block_number: *block_number as i64,
            })
        }
        RouterEvent::Unstaked {
            user,
            token,
            amount,
            adapter,
            tx_hash,
            block_number,
        } => {
            info!("New Unstaked event detected: {tx_hash}");
            if amount.is_zero() {
                warn!("Dropping Unstaked event {tx_hash} with zero amount");
                return None;
            }
            let (symbol, decimals) = resolve_token(tokens, token);
            Some(NewTransactionJob {
                job_kind: JOB_UNSTAKE,
                tx_hash: tx_hash.to_string(),
                user_address: user.to_string(),
                token: symbol,
                token_address: Some(token.to_string()),
                adapter_address: Some(adapter.to_string()),
                amount: format_amount(*amount, decimals, tx_hash)?,
                fee: None,
                block_number: *block_number as i64,
            })
        }
    }
}

fn resolve_token(tokens: &HashMap<String, TokenMetadata>, address: &Address) -> (String, u8) {
    match tokens.get(&address.to_string().to_lowercase()) {
        Some(metadata) => (metadata.symbol.to_owned(), metadata.decimals),
        None => ("UNKNOWN".to_owned(), 18),
    }
}

fn format_amount(
    amount: U256,
    decimals: u8,
    tx_hash: &staking_evm_client::TxHash,
) -> Option<String> {
    match format_base_units(amount, decimals) {
        Ok(formatted) => Some(formatted),
        Err(error) => {
            warn!("Could not format amount for {tx_hash}: {error}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staking_evm_client::TxHash;

    const WETH: &str = "0x0fe44892c3279c09654f3590cf6CedAc3FC3ccdc";
    const WBTC: &str = "0x8762c93f84dcB6f9782602D842a587409b7Cf6cd";

    fn table() -> HashMap<String, TokenMetadata> {
        let mut tokens = HashMap::new();
        tokens.insert(
            WETH.to_lowercase(),
            TokenMetadata {
                symbol: "WETH".to_owned(),
                decimals: 18,
            },
        );
        tokens.insert(
            WBTC.to_lowercase(),
            TokenMetadata {
                symbol: "WBTC".to_owned(),
                decimals: 8,
            },
        );
        tokens
    }

    fn staked(token: &str, amount: u64, fee: u64) -> RouterEvent {
        RouterEvent::Staked {
            user: "0x742d35Cc6634C0532925a3b844Bc454e4438f44e".parse().unwrap(),
            token: token.parse().unwrap(),
            amount: U256::from(amount),
            adapter: "0x33632938cE371c1e294E5ba5658eb9E02a47Cf2f".parse().unwrap(),
            fee: U256::from(fee),
            tx_hash: TxHash::with_last_byte(7),
            block_number: 1_234,
        }
    }

    #[test]
    fn stake_event_becomes_a_stake_job_in_human_units() {
        let event = staked(WETH, 1_500_000_000_000_000_000, 7_500_000_000_000_000);
        let job = job_from_event(&event, &table()).unwrap();
        assert_eq!(job.job_kind, JOB_STAKE);
        assert_eq!(job.token, "WETH");
        assert_eq!(job.amount, "1.5");
        assert_eq!(job.fee.as_deref(), Some("0.0075"));
        assert_eq!(job.block_number, 1_234);
        assert_eq!(job.token_address.as_deref(), Some(WETH));
    }

    #[test]
    fn token_decimals_come_from_the_table() {
        let event = staked(WBTC, 250_000_000, 0);
        let job = job_from_event(&event, &table()).unwrap();
        assert_eq!(job.token, "WBTC");
        assert_eq!(job.amount, "2.5");
        assert_eq!(job.fee.as_deref(), Some("0"));
    }

    #[test]
    fn unknown_tokens_default_to_18_decimals_instead_of_dropping() {
        let event = staked("0x00000000000000000000000000000000deadbeef", 1_000_000_000_000_000_000, 0);
        let job = job_from_event(&event, &table()).unwrap();
        assert_eq!(job.token, "UNKNOWN");
        assert_eq!(job.amount, "1");
    }

    #[test]
    fn zero_amount_events_are_dropped() {
        let event = staked(WETH, 0, 0);
        assert!(job_from_event(&event, &table()).is_none());
    }

    #[test]
    fn unstake_event_carries_no_fee() {
        let event = RouterEvent::Unstaked {
            user: "0x742d35Cc6634C0532925a3b844Bc454e4438f44e".parse().unwrap(),
            token: WETH.parse().unwrap(),
            amount: U256::from(500_000_000_000_000_000u64),
            adapter: "0x33632938cE371c1e294E5ba5658eb9E02a47Cf2f".parse().unwrap(),
            tx_hash: TxHash::with_last_byte(9),
            block_number: 1_240,
        };
        let job = job_from_event(&event, &table()).unwrap();
        assert_eq!(job.job_kind, JOB_UNSTAKE);
        assert_eq!(job.amount, "0.5");
        assert!(job.fee.is_none());
    }
}
