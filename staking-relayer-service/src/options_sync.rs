use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    entity::Set as EntitySet, ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter, Statement,
};
use staking_db_entity::db::option_refresh_job::{
    ActiveModel as RefreshJobActiveModel, Column as RefreshJobColumn, Entity as RefreshJob,
    Model as RefreshJobModel,
};
use staking_db_entity::db::staking_option::{
    ActiveModel as StakingOptionActiveModel, Column as StakingOptionColumn, Entity as StakingOption,
};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::adapters::AdapterRegistry;
use crate::config::Config;
use crate::dto::SyncSummary;
use crate::job_queue::{backoff_delay_secs, JOB_COMPLETED, JOB_FAILED, JOB_QUEUED, JOB_RUNNING};
use crate::market_data;
use crate::notify;
use crate::sql_stmt;

pub const TRIGGER_SCHEDULED: &str = "scheduled";
pub const TRIGGER_MANUAL: &str = "manual";

/// Drives the catalog refresh: clears any schedule left over from a
/// previous process, runs once immediately, then keeps one refresh job
/// queued per interval while consuming due jobs (scheduled and manual
/// alike).
pub async fn run_scheduler(
    config: Config,
    db: DatabaseConnection,
    registry: AdapterRegistry,
    client: reqwest::Client,
) {
    clear_stale_scheduled(&db).await;
    enqueue_refresh(&db, TRIGGER_SCHEDULED).await;
    info!(
        "Scheduled option refresh every {}s",
        config.options_sync_interval().as_secs()
    );

    let interval = config.options_sync_interval();
    let mut next_scheduled = Instant::now() + interval;
    loop {
        if Instant::now() >= next_scheduled {
            enqueue_refresh(&db, TRIGGER_SCHEDULED).await;
            next_scheduled += interval;
        }
        if let Some(job) = claim_due_refresh(&db).await {
            run_refresh_attempt(&config, &db, &registry, &client, job).await;
        }
        sleep(config.job_poll_interval()).await;
    }
}

/// A restarted process must not leave a second repeating schedule
/// behind, so pending scheduled rows from earlier lifetimes are removed
/// before a fresh one is installed.
async fn clear_stale_scheduled(db: &DatabaseConnection) {
    let result = RefreshJob::delete_many()
        .filter(RefreshJobColumn::Trigger.eq(TRIGGER_SCHEDULED))
        .filter(RefreshJobColumn::Status.is_in([JOB_QUEUED, JOB_RUNNING]))
        .exec(db)
        .await;
    match result {
        Ok(deleted) if deleted.rows_affected > 0 => {
            info!("Cleared {} stale scheduled refresh jobs", deleted.rows_affected)
        }
        Ok(_) => {}
        Err(error) => warn!("Could not clear stale scheduled refresh jobs: {:?}", error),
    }
}

pub async fn enqueue_refresh(db: &DatabaseConnection, trigger: &str) {
    let now = Utc::now().timestamp();
    let job = RefreshJobActiveModel {
        id: ActiveValue::NotSet,
        trigger: ActiveValue::Set(trigger.to_owned()),
        status: ActiveValue::Set(JOB_QUEUED.to_owned()),
        attempts: ActiveValue::Set(0),
        available_at: ActiveValue::Set(now),
        created_at: ActiveValue::Set(now),
        finished_at: ActiveValue::Set(None),
        result: ActiveValue::Set(None),
        last_error: ActiveValue::Set(None),
    };
    match RefreshJob::insert(job).exec(db).await {
        Ok(_) => info!("Queued {trigger} option refresh job"),
        Err(error) => warn!("Could not enqueue {trigger} refresh job: {:?}", error),
    }
}

async fn claim_due_refresh(db: &DatabaseConnection) -> Option<RefreshJobModel> {
    let now = Utc::now().timestamp();
    let claimed = db
        .query_one(Statement::from_sql_and_values(
            sql_stmt::DB_BACKEND,
            sql_stmt::CLAIM_REFRESH_JOB,
            vec![now.into()],
        ))
        .await;
    let id = match claimed {
        Ok(Some(row)) => row.try_get::<i64>("", "id").ok()?,
        Ok(None) => return None,
        Err(error) => {
            warn!("Error claiming refresh job: {:?}", error);
            return None;
        }
    };
    match RefreshJob::find_by_id(id).one(db).await {
        Ok(job) => job,
        Err(error) => {
            warn!("Error loading claimed refresh job {id}: {:?}", error);
            None
        }
    }
}

async fn run_refresh_attempt(
    config: &Config,
    db: &DatabaseConnection,
    registry: &AdapterRegistry,
    client: &reqwest::Client,
    job: RefreshJobModel,
) {
    let job_id = job.id;
    info!("Processing option refresh job: {job_id}");
    match run_sync(db, registry, client, config).await {
        Ok(summary) => {
            let mut active = job.into_active_model();
            active.status = EntitySet(JOB_COMPLETED.to_owned());
            active.finished_at = EntitySet(Some(Utc::now().timestamp()));
            active.result = EntitySet(serde_json::to_string(&summary).ok());
            active.last_error = EntitySet(None);
            if let Err(error) = active.update(db).await {
                warn!("Could not record refresh job {job_id} result: {:?}", error);
            }
            if summary.skipped {
                info!("Refresh job {job_id} skipped: no adapters configured");
            } else {
                info!(
                    "Updated {} and created {} staking options, deactivated {} - Job: {job_id}",
                    summary.updated, summary.created, summary.deactivated
                );
            }
        }
        Err(error_text) => {
            let attempts = job.attempts + 1;
            let exhausted = attempts >= config.job_max_attempts();
            let mut active = job.into_active_model();
            active.attempts = EntitySet(attempts);
            active.last_error = EntitySet(Some(error_text.to_owned()));
            if exhausted {
                active.status = EntitySet(JOB_FAILED.to_owned());
                active.finished_at = EntitySet(Some(Utc::now().timestamp()));
            } else {
                let delay = backoff_delay_secs(attempts, config.job_backoff_base_secs());
                active.status = EntitySet(JOB_QUEUED.to_owned());
                active.available_at = EntitySet(Utc::now().timestamp() + delay);
            }
            if let Err(error) = active.update(db).await {
                warn!("Could not settle refresh job {job_id}: {:?}", error);
            }
            warn!("Refresh job {job_id} attempt {attempts} failed: {error_text}");
            if exhausted {
                notify::post_notification(
                    config,
                    client,
                    &format!("Option refresh job {job_id} failed permanently: {error_text}"),
                )
                .await;
            }
        }
    }
}

/// One full synchronizer pass. The registry snapshot gates everything: no
/// adapters means no writes at all, and an option only stays active while
/// a quote backed by a non-zero adapter touched it this pass.
pub async fn run_sync(
    db: &DatabaseConnection,
    registry: &AdapterRegistry,
    client: &reqwest::Client,
    config: &Config,
) -> Result<SyncSummary, String> {
    let adapters = registry.configured();
    if adapters.is_empty() {
        info!("No adapters configured, skipping option refresh");
        return Ok(SyncSummary::skipped());
    }

    let quotes = market_data::fetch_all(client, config, adapters).await;
    if quotes.is_empty() {
        // upstream failure or nothing quotable; treat as "no update this
        // cycle" and leave the catalog exactly as it stands
        warn!("No market data this cycle, leaving staking options untouched");
        return Ok(SyncSummary::default());
    }

    let now = Utc::now().timestamp();
    let mut touched: HashSet<String> = HashSet::new();
    let mut updated: u32 = 0;
    let mut created: u32 = 0;

    for (token, token_quotes) in &quotes {
        for quote in token_quotes {
            if quote.adapter_address.is_zero() {
                continue;
            }
            let id = option_id(&quote.protocol, token, &config.active_network);
            let existing = StakingOption::find_by_id(id.to_owned())
                .one(db)
                .await
                .map_err(|e| e.to_string())?;
            match existing {
                Some(option) => {
                    let mut active = option.into_active_model();
                    active.apy = EntitySet(quote.apy_percent);
                    active.tvl = EntitySet(quote.tvl_formatted.to_owned());
                    active.tvl_usd = EntitySet(quote.tvl_usd);
                    active.risk = EntitySet(quote.risk.to_string());
                    active.adapter_address = EntitySet(quote.adapter_address.to_string());
                    active.is_active = EntitySet(true);
                    active.updated_at = EntitySet(now);
                    active.update(db).await.map_err(|e| e.to_string())?;
                    updated += 1;
                }
                None => {
                    let option = StakingOptionActiveModel {
                        id: ActiveValue::Set(id.to_owned()),
                        protocol: ActiveValue::Set(quote.protocol.to_owned()),
                        token: ActiveValue::Set(token.to_owned()),
                        apy: ActiveValue::Set(quote.apy_percent),
                        tvl: ActiveValue::Set(quote.tvl_formatted.to_owned()),
                        tvl_usd: ActiveValue::Set(quote.tvl_usd),
                        risk: ActiveValue::Set(quote.risk.to_string()),
                        adapter_address: ActiveValue::Set(quote.adapter_address.to_string()),
                        is_active: ActiveValue::Set(true),
                        network: ActiveValue::Set(config.active_network.to_owned()),
                        created_at: ActiveValue::Set(now),
                        updated_at: ActiveValue::Set(now),
                    };
                    StakingOption::insert(option).exec(db).await.map_err(|e| e.to_string())?;
                    created += 1;
                }
            }
            touched.insert(id);
        }
    }

    let deactivated = deactivate_stale(db, &config.active_network, &touched).await?;

    Ok(SyncSummary {
        skipped: false,
        updated,
        created,
        deactivated,
    })
}

/// Flips `is_active` off for every option on the network that this pass
/// did not touch. Rows survive for the historical catalog; the adapter
/// coming back simply reactivates them on a later pass.
pub async fn deactivate_stale(
    db: &DatabaseConnection,
    network: &str,
    touched: &HashSet<String>,
) -> Result<u32, String> {
    let active_options = StakingOption::find()
        .filter(StakingOptionColumn::Network.eq(network))
        .filter(StakingOptionColumn::IsActive.eq(true))
        .all(db)
        .await
        .map_err(|e| e.to_string())?;

    let now = Utc::now().timestamp();
    let mut deactivated: u32 = 0;
    for option in active_options {
        if touched.contains(&option.id) {
            continue;
        }
        let id = option.id.to_owned();
        let mut active = option.into_active_model();
        active.is_active = EntitySet(false);
        active.updated_at = EntitySet(now);
        active.update(db).await.map_err(|e| e.to_string())?;
        info!("Deactivated staking option {id}: no backing adapter this pass");
        deactivated += 1;
    }
    Ok(deactivated)
}

pub fn option_id(protocol: &str, token: &str, network: &str) -> String {
    format!("{}-{}-{}", slug(protocol), slug(token), slug(network))
}

fn slug(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use figment::{
        providers::{Format, Toml},
        Figment,
    };

    #[test]
    fn option_ids_are_deterministic_slugs() {
        assert_eq!(
            option_id("Uniswap V3", "WETH", "sepolia"),
            "uniswap-v3-weth-sepolia"
        );
        assert_eq!(option_id("Lido", "WETH", "sepolia"), "lido-weth-sepolia");
        assert_eq!(
            option_id("Some  Spaced   Name", "WBTC", "mainnet"),
            "some-spaced-name-wbtc-mainnet"
        );
    }

    #[test]
    fn skipped_summary_serializes_with_the_skip_flag() {
        let json = serde_json::to_string(&SyncSummary::skipped()).unwrap();
        assert!(json.contains("\"skipped\":true"));
        let json = serde_json::to_string(&SyncSummary {
            skipped: false,
            updated: 2,
            created: 1,
            deactivated: 3,
        })
        .unwrap();
        assert!(json.contains("\"deactivated\":3"));
    }

    async fn get_db() -> (config::Config, DatabaseConnection) {
        let config: config::Config = Figment::new()
            .merge(Toml::file("App.toml"))
            .extract()
            .unwrap();
        let db = config::get_db_connection(&config).await.unwrap();
        (config, db)
    }

    #[tokio::test]
    #[ignore = "needs the App.toml database"]
    async fn empty_registry_skips_the_run_with_zero_writes() {
        let (mut config, db) = get_db().await;
        config.adapters.clear();
        let registry = AdapterRegistry::from_config(&config);
        let client = reqwest::Client::builder().build().unwrap();

        let summary = run_sync(&db, &registry, &client, &config).await.unwrap();
        assert!(summary.skipped);
        assert_eq!(summary.updated + summary.created + summary.deactivated, 0);
    }

    #[tokio::test]
    #[ignore = "needs the App.toml database; mutates staking_option"]
    async fn untouched_options_are_deactivated_not_deleted() {
        let (config, db) = get_db().await;
        let id = option_id("Ghost Protocol", "WETH", &config.active_network);
        StakingOption::delete_by_id(id.to_owned()).exec(&db).await.unwrap();

        let now = Utc::now().timestamp();
        let option = StakingOptionActiveModel {
            id: ActiveValue::Set(id.to_owned()),
            protocol: ActiveValue::Set("Ghost Protocol".to_owned()),
            token: ActiveValue::Set("WETH".to_owned()),
            apy: ActiveValue::Set(4.2),
            tvl: ActiveValue::Set("$12.00M".to_owned()),
            tvl_usd: ActiveValue::Set(12_000_000.0),
            risk: ActiveValue::Set("Medium".to_owned()),
            adapter_address: ActiveValue::Set(
                "0x33632938cE371c1e294E5ba5658eb9E02a47Cf2f".to_owned(),
            ),
            is_active: ActiveValue::Set(true),
            network: ActiveValue::Set(config.active_network.to_owned()),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        StakingOption::insert(option).exec(&db).await.unwrap();

        let deactivated = deactivate_stale(&db, &config.active_network, &HashSet::new())
            .await
            .unwrap();
        assert!(deactivated >= 1);

        let row = StakingOption::find_by_id(id).one(&db).await.unwrap().unwrap();
        assert!(!row.is_active, "row must be deactivated");
    }
}
