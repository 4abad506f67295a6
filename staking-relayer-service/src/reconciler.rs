use chrono::Utc;
use sea_orm::{
    entity::Set as EntitySet, ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
};
use staking_db_entity::db::staking_transaction::{
    ActiveModel as StakingTransactionActiveModel, Column as StakingTransactionColumn,
    Entity as StakingTransaction,
};
use staking_db_entity::db::transaction_job::Model as TransactionJobModel;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::adapters::AdapterRegistry;
use crate::config::Config;
use crate::job_queue::{self, JOB_STAKE, JOB_UNSTAKE};
use crate::notify;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_UNSTAKED: &str = "unstaked";

/// Queue consumer loop: claims due jobs, applies them to the ledger
/// concurrently, and settles each one. Jobs that exhaust their attempts
/// are surfaced to operators and left visible as failed rows.
pub async fn run_worker(
    config: Config,
    db: DatabaseConnection,
    registry: AdapterRegistry,
    client: reqwest::Client,
) {
    info!("Transaction reconciler started");
    loop {
        let jobs = job_queue::claim_due(&db, config.job_batch_size()).await;
        if !jobs.is_empty() {
            let tasks = jobs
                .into_iter()
                .map(|job| process_and_settle(&config, &db, &registry, &client, job));
            futures::future::join_all(tasks).await;
        }
        job_queue::prune_completed(&db, config.completed_job_retention_secs()).await;
        sleep(config.job_poll_interval()).await;
    }
}

async fn process_and_settle(
    config: &Config,
    db: &DatabaseConnection,
    registry: &AdapterRegistry,
    client: &reqwest::Client,
    job: TransactionJobModel,
) {
    let result = process_job(db, registry, &config.active_network, &job).await;
    match result {
        Ok(()) => job_queue::mark_completed(db, job).await,
        Err(error) => {
            let text = error.to_string();
            let tx_hash = job.tx_hash.to_owned();
            let job_kind = job.job_kind.to_owned();
            let exhausted = job_queue::retry_or_fail(
                db,
                job,
                &text,
                config.job_max_attempts(),
                config.job_backoff_base_secs(),
            )
            .await;
            if exhausted {
                notify::post_notification(
                    config,
                    client,
                    &format!("{job_kind} job for {tx_hash} failed permanently: {text}"),
                )
                .await;
            }
        }
    }
}

/// Applies one queued job. Database errors bubble up for retry; anything
/// the retry cannot fix (orphan unstakes, unknown job kinds) completes
/// with a warning instead.
pub async fn process_job(
    db: &DatabaseConnection,
    registry: &AdapterRegistry,
    network: &str,
    job: &TransactionJobModel,
) -> Result<(), sea_orm::DbErr> {
    info!("Processing {} job for tx: {}", job.job_kind, job.tx_hash);
    match job.job_kind.as_str() {
        JOB_STAKE => process_stake(db, registry, network, job).await,
        JOB_UNSTAKE => process_unstake(db, job).await,
        other => {
            warn!("Dropping job with unknown kind {other} for tx: {}", job.tx_hash);
            Ok(())
        }
    }
}

/// Confirms the ledger row for a mined stake, creating it when the chain
/// event beat the execution gateway's write. Safe under duplicate
/// delivery: an already-confirmed (or already-unstaked) row is left
/// alone.
pub async fn process_stake(
    db: &DatabaseConnection,
    registry: &AdapterRegistry,
    network: &str,
    job: &TransactionJobModel,
) -> Result<(), sea_orm::DbErr> {
    let adapter_address = job.adapter_address.to_owned().unwrap_or_default();
    let protocol = registry
        .protocol_for(&adapter_address)
        .unwrap_or("Unknown")
        .to_owned();

    let existing = StakingTransaction::find_by_id(job.tx_hash.to_owned())
        .one(db)
        .await?;
    match existing {
        Some(transaction) => match transaction.status.as_str() {
            STATUS_CONFIRMED => {
                info!("Transaction {} already confirmed", job.tx_hash);
            }
            STATUS_UNSTAKED => {
                // the stake was confirmed and later closed out; a stale
                // re-delivery must not wind the state machine backwards
                info!("Transaction {} already unstaked, ignoring stake event", job.tx_hash);
            }
            _ => {
                let tx_hash = transaction.tx_hash.to_owned();
                let mut active = transaction.into_active_model();
                active.status = EntitySet(STATUS_CONFIRMED.to_owned());
                active.update(db).await?;
                info!("Updated transaction {tx_hash} to confirmed");
            }
        },
        None => {
            let transaction = StakingTransactionActiveModel {
                tx_hash: ActiveValue::Set(job.tx_hash.to_owned()),
                user_address: ActiveValue::Set(job.user_address.to_lowercase()),
                token: ActiveValue::Set(job.token.to_owned()),
                token_address: ActiveValue::Set(job.token_address.to_owned().unwrap_or_default()),
                amount: ActiveValue::Set(job.amount.to_owned()),
                protocol: ActiveValue::Set(protocol),
                adapter_address: ActiveValue::Set(adapter_address),
                status: ActiveValue::Set(STATUS_CONFIRMED.to_owned()),
                fee: ActiveValue::Set(job.fee.to_owned().unwrap_or_else(|| "0".to_owned())),
                network: ActiveValue::Set(network.to_owned()),
                created_at: ActiveValue::Set(Utc::now().timestamp()),
                unstake_tx_hash: ActiveValue::Set(None),
                unstaked_at: ActiveValue::Set(None),
            };
            StakingTransaction::insert(transaction).exec(db).await?;
            info!("Created new stake transaction from event: {}", job.tx_hash);
        }
    }
    Ok(())
}

/// Closes out the most recent open stake for (user, token). An unstake
/// with no matching stake is logged and dropped; retrying cannot repair
/// a data mismatch.
pub async fn process_unstake(
    db: &DatabaseConnection,
    job: &TransactionJobModel,
) -> Result<(), sea_orm::DbErr> {
    let existing = StakingTransaction::find()
        .filter(StakingTransactionColumn::UserAddress.eq(job.user_address.to_lowercase()))
        .filter(StakingTransactionColumn::Token.eq(job.token.to_owned()))
        .filter(StakingTransactionColumn::Status.eq(STATUS_CONFIRMED))
        .order_by_desc(StakingTransactionColumn::CreatedAt)
        .one(db)
        .await?;
    match existing {
        Some(transaction) => {
            let stake_hash = transaction.tx_hash.to_owned();
            let mut active = transaction.into_active_model();
            active.status = EntitySet(STATUS_UNSTAKED.to_owned());
            active.unstake_tx_hash = EntitySet(Some(job.tx_hash.to_owned()));
            active.unstaked_at = EntitySet(Some(Utc::now().timestamp()));
            active.update(db).await?;
            info!(
                "Marked transaction as unstaked: {stake_hash} (unstake tx: {})",
                job.tx_hash
            );
        }
        None => {
            warn!(
                "No matching stake transaction found for unstake tx: {}",
                job.tx_hash
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AdapterRegistry;
    use crate::config;
    use figment::{
        providers::{Format, Toml},
        Figment,
    };
    use sea_orm::PaginatorTrait;

    async fn get_db() -> (config::Config, DatabaseConnection) {
        let config: config::Config = Figment::new()
            .merge(Toml::file("App.toml"))
            .extract()
            .unwrap();
        let db = config::get_db_connection(&config).await.unwrap();
        (config, db)
    }

    fn stake_job(tx_hash: &str, user: &str, token: &str, amount: &str) -> TransactionJobModel {
        TransactionJobModel {
            id: 0,
            job_kind: JOB_STAKE.to_owned(),
            tx_hash: tx_hash.to_owned(),
            user_address: user.to_owned(),
            token: token.to_owned(),
            token_address: Some("0x0fe44892c3279c09654f3590cf6CedAc3FC3ccdc".to_owned()),
            adapter_address: Some("0x33632938cE371c1e294E5ba5658eb9E02a47Cf2f".to_owned()),
            amount: amount.to_owned(),
            fee: Some("0.0075".to_owned()),
            block_number: 100,
            status: job_queue::JOB_RUNNING.to_owned(),
            attempts: 0,
            available_at: 0,
            created_at: 0,
            last_error: None,
        }
    }

    fn unstake_job(tx_hash: &str, user: &str, token: &str) -> TransactionJobModel {
        TransactionJobModel {
            job_kind: JOB_UNSTAKE.to_owned(),
            fee: None,
            ..stake_job(tx_hash, user, token, "1.5")
        }
    }

    async fn clear_user(db: &DatabaseConnection, user: &str) {
        StakingTransaction::delete_many()
            .filter(StakingTransactionColumn::UserAddress.eq(user.to_lowercase()))
            .exec(db)
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore = "needs the App.toml database; mutates staking_transaction"]
    async fn duplicate_stake_jobs_yield_exactly_one_confirmed_row() {
        let (config, db) = get_db().await;
        let registry = AdapterRegistry::from_config(&config);
        let user = "0x1000000000000000000000000000000000000aa1";
        clear_user(&db, user).await;

        let job = stake_job("0xidem-stake-1", user, "WETH", "1.5");
        process_stake(&db, &registry, &config.active_network, &job)
            .await
            .unwrap();
        process_stake(&db, &registry, &config.active_network, &job)
            .await
            .unwrap();

        let rows = StakingTransaction::find()
            .filter(StakingTransactionColumn::UserAddress.eq(user))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, STATUS_CONFIRMED);
        assert_eq!(rows[0].amount, "1.5");
    }

    #[tokio::test]
    #[ignore = "needs the App.toml database; mutates staking_transaction"]
    async fn gateway_pending_row_converges_to_confirmed() {
        let (config, db) = get_db().await;
        let registry = AdapterRegistry::from_config(&config);
        let user = "0x1000000000000000000000000000000000000aa2";
        clear_user(&db, user).await;

        let pending = StakingTransactionActiveModel {
            tx_hash: ActiveValue::Set("0xrace-stake-1".to_owned()),
            user_address: ActiveValue::Set(user.to_owned()),
            token: ActiveValue::Set("WETH".to_owned()),
            token_address: ActiveValue::Set(
                "0x0fe44892c3279c09654f3590cf6CedAc3FC3ccdc".to_owned(),
            ),
            amount: ActiveValue::Set("1.5".to_owned()),
            protocol: ActiveValue::Set("Aave V3".to_owned()),
            adapter_address: ActiveValue::Set(
                "0x33632938cE371c1e294E5ba5658eb9E02a47Cf2f".to_owned(),
            ),
            status: ActiveValue::Set(STATUS_PENDING.to_owned()),
            fee: ActiveValue::Set("0.0075".to_owned()),
            network: ActiveValue::Set(config.active_network.to_owned()),
            created_at: ActiveValue::Set(Utc::now().timestamp()),
            unstake_tx_hash: ActiveValue::Set(None),
            unstaked_at: ActiveValue::Set(None),
        };
        StakingTransaction::insert(pending).exec(&db).await.unwrap();

        let job = stake_job("0xrace-stake-1", user, "WETH", "1.5");
        process_stake(&db, &registry, &config.active_network, &job)
            .await
            .unwrap();

        let rows = StakingTransaction::find()
            .filter(StakingTransactionColumn::UserAddress.eq(user))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, STATUS_CONFIRMED);
    }

    #[tokio::test]
    #[ignore = "needs the App.toml database; mutates staking_transaction"]
    async fn unstake_links_to_the_latest_confirmed_stake() {
        let (config, db) = get_db().await;
        let registry = AdapterRegistry::from_config(&config);
        let user = "0x1000000000000000000000000000000000000aa3";
        clear_user(&db, user).await;

        let stake = stake_job("0xlink-stake-1", user, "WETH", "5");
        process_stake(&db, &registry, &config.active_network, &stake)
            .await
            .unwrap();

        let unstake = unstake_job("0xlink-unstake-1", user, "WETH");
        process_unstake(&db, &unstake).await.unwrap();

        let rows = StakingTransaction::find()
            .filter(StakingTransactionColumn::UserAddress.eq(user))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1, "unstake must not create a second row");
        assert_eq!(rows[0].status, STATUS_UNSTAKED);
        assert_eq!(rows[0].unstake_tx_hash.as_deref(), Some("0xlink-unstake-1"));
        assert!(rows[0].unstaked_at.is_some());
        assert_eq!(rows[0].tx_hash, "0xlink-stake-1");
    }

    #[tokio::test]
    #[ignore = "needs the App.toml database"]
    async fn orphan_unstake_mutates_nothing_and_does_not_error() {
        let (config, db) = get_db().await;
        let _ = &config;
        let user = "0x1000000000000000000000000000000000000aa4";
        clear_user(&db, user).await;

        let job = unstake_job("0xorphan-unstake-1", user, "WETH");
        process_unstake(&db, &job).await.unwrap();

        let count = StakingTransaction::find()
            .filter(StakingTransactionColumn::UserAddress.eq(user))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
