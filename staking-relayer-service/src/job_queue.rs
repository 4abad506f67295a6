use chrono::Utc;
use sea_orm::{
    entity::Set as EntitySet, ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter, Statement,
};
use staking_db_entity::db::transaction_job::{
    ActiveModel as TransactionJobActiveModel, Column as TransactionJobColumn,
    Entity as TransactionJob, Model as TransactionJobModel,
};
use tracing::{info, warn};

use crate::sql_stmt;

pub const JOB_STAKE: &str = "process-stake";
pub const JOB_UNSTAKE: &str = "process-unstake";

pub const JOB_QUEUED: &str = "queued";
pub const JOB_RUNNING: &str = "running";
pub const JOB_COMPLETED: &str = "completed";
pub const JOB_FAILED: &str = "failed";

/// Payload produced by the event watcher; everything the reconciler needs
/// to apply one chain event to the ledger.
#[derive(Clone, Debug, PartialEq)]
pub struct NewTransactionJob {
    pub job_kind: &'static str,
    pub tx_hash: String,
    pub user_address: String,
    pub token: String,
    pub token_address: Option<String>,
    pub adapter_address: Option<String>,
    pub amount: String,
    pub fee: Option<String>,
    pub block_number: i64,
}

/// Inserts the job row. The unique (job_kind, tx_hash) index turns
/// re-delivery of an already-enqueued event into an insert conflict,
/// which is logged and ignored; the blockchain remains the durable source
/// for anything dropped here.
pub async fn enqueue(db: &DatabaseConnection, job: NewTransactionJob) {
    let now = Utc::now().timestamp();
    let tx_hash = job.tx_hash.to_owned();
    let job_kind = job.job_kind;
    let model = TransactionJobActiveModel {
        id: ActiveValue::NotSet,
        job_kind: ActiveValue::Set(job.job_kind.to_owned()),
        tx_hash: ActiveValue::Set(job.tx_hash),
        user_address: ActiveValue::Set(job.user_address),
        token: ActiveValue::Set(job.token),
        token_address: ActiveValue::Set(job.token_address),
        adapter_address: ActiveValue::Set(job.adapter_address),
        amount: ActiveValue::Set(job.amount),
        fee: ActiveValue::Set(job.fee),
        block_number: ActiveValue::Set(job.block_number),
        status: ActiveValue::Set(JOB_QUEUED.to_owned()),
        attempts: ActiveValue::Set(0),
        available_at: ActiveValue::Set(now),
        created_at: ActiveValue::Set(now),
        last_error: ActiveValue::Set(None),
    };
    match TransactionJob::insert(model).exec(db).await {
        Ok(_) => info!("{job_kind} job queued for tx: {tx_hash}"),
        Err(db_error) => warn!(
            "Could not enqueue {job_kind} job for {tx_hash}: {:?}",
            db_error.to_string()
        ),
    }
}

/// Claims up to `batch` due jobs, marking them running. Returns the full
/// rows for processing.
pub async fn claim_due(db: &DatabaseConnection, batch: u64) -> Vec<TransactionJobModel> {
    let now = Utc::now().timestamp();
    let claimed = db
        .query_all(Statement::from_sql_and_values(
            sql_stmt::DB_BACKEND,
            sql_stmt::CLAIM_TRANSACTION_JOBS,
            vec![now.into(), (batch as i64).into()],
        ))
        .await;
    let ids: Vec<i64> = match claimed {
        Ok(rows) => rows
            .iter()
            .filter_map(|row| row.try_get::<i64>("", "id").ok())
            .collect(),
        Err(error) => {
            warn!("Error claiming transaction jobs: {:?}", error);
            return vec![];
        }
    };
    if ids.is_empty() {
        return vec![];
    }
    match TransactionJob::find()
        .filter(TransactionJobColumn::Id.is_in(ids))
        .all(db)
        .await
    {
        Ok(jobs) => jobs,
        Err(error) => {
            warn!("Error loading claimed transaction jobs: {:?}", error);
            vec![]
        }
    }
}

/// Exponential backoff for the nth failure: base, 2x base, 4x base, ...
pub fn backoff_delay_secs(failed_attempts: i32, base_secs: i64) -> i64 {
    let shift = failed_attempts.saturating_sub(1).clamp(0, 16) as u32;
    base_secs.saturating_mul(1_i64 << shift)
}

pub async fn mark_completed(db: &DatabaseConnection, job: TransactionJobModel) {
    let mut active = job.into_active_model();
    active.status = EntitySet(JOB_COMPLETED.to_owned());
    active.last_error = EntitySet(None);
    if let Err(error) = active.update(db).await {
        warn!("Could not mark transaction job completed: {:?}", error);
    }
}

/// Re-queues a failed job with backoff, or marks it failed once the
/// attempt budget is spent. Returns true when the job is permanently
/// failed so the caller can raise an operator notification.
pub async fn retry_or_fail(
    db: &DatabaseConnection,
    job: TransactionJobModel,
    error_text: &str,
    max_attempts: i32,
    backoff_base_secs: i64,
) -> bool {
    let attempts = job.attempts + 1;
    let exhausted = attempts >= max_attempts;
    let tx_hash = job.tx_hash.to_owned();
    let mut active = job.into_active_model();
    active.attempts = EntitySet(attempts);
    active.last_error = EntitySet(Some(error_text.to_owned()));
    if exhausted {
        active.status = EntitySet(JOB_FAILED.to_owned());
        warn!("Transaction job for {tx_hash} failed after {attempts} attempts: {error_text}");
    } else {
        let delay = backoff_delay_secs(attempts, backoff_base_secs);
        active.status = EntitySet(JOB_QUEUED.to_owned());
        active.available_at = EntitySet(Utc::now().timestamp() + delay);
        info!("Retrying transaction job for {tx_hash} in {delay}s (attempt {attempts})");
    }
    if let Err(error) = active.update(db).await {
        warn!("Could not settle transaction job for {tx_hash}: {:?}", error);
    }
    exhausted
}

/// Completed jobs are kept briefly for observability, then discarded.
pub async fn prune_completed(db: &DatabaseConnection, retention_secs: i64) {
    let cutoff = Utc::now().timestamp() - retention_secs;
    let result = TransactionJob::delete_many()
        .filter(TransactionJobColumn::Status.eq(JOB_COMPLETED))
        .filter(TransactionJobColumn::CreatedAt.lt(cutoff))
        .exec(db)
        .await;
    if let Err(error) = result {
        warn!("Could not prune completed transaction jobs: {:?}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_failure() {
        assert_eq!(backoff_delay_secs(1, 2), 2);
        assert_eq!(backoff_delay_secs(2, 2), 4);
        assert_eq!(backoff_delay_secs(3, 2), 8);
    }

    #[test]
    fn backoff_handles_out_of_range_attempt_counts() {
        assert_eq!(backoff_delay_secs(0, 2), 2);
        assert!(backoff_delay_secs(40, 2) > 0);
    }
}
