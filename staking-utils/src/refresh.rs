use chrono::Utc;
use sea_orm::{ActiveValue, EntityTrait};
use staking_db_entity::db::option_refresh_job::{
    ActiveModel as RefreshJobActiveModel, Entity as RefreshJob,
};

use crate::Config;

/// Inserts one manual refresh job; the relayer service picks it up on
/// its next poll.
pub async fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let db = sea_orm::Database::connect(config.database_url.to_owned()).await?;
    let now = Utc::now().timestamp();
    let job = RefreshJobActiveModel {
        id: ActiveValue::NotSet,
        trigger: ActiveValue::Set("manual".to_owned()),
        status: ActiveValue::Set("queued".to_owned()),
        attempts: ActiveValue::Set(0),
        available_at: ActiveValue::Set(now),
        created_at: ActiveValue::Set(now),
        finished_at: ActiveValue::Set(None),
        result: ActiveValue::Set(None),
        last_error: ActiveValue::Set(None),
    };
    let inserted = RefreshJob::insert(job).exec(&db).await?;
    println!("queued manual refresh job {}", inserted.last_insert_id);
    Ok(())
}
