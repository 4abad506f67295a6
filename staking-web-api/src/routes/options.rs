use crate::dto::{
    CreateOptionRequest, OptionDetails, ResponseData, RESPONSE_BAD_REQUEST, RESPONSE_CREATED,
    RESPONSE_OK,
};
use crate::pool::Db;
use chrono::Utc;
use rocket::serde::json::Json;
use sea_orm::{ActiveValue, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use sea_orm_rocket::Connection;
use staking_db_entity::db::option_refresh_job::ActiveModel as RefreshJobActiveModel;
use staking_db_entity::db::option_refresh_job::Entity as RefreshJob;
use staking_db_entity::db::staking_option::{
    ActiveModel as StakingOptionActiveModel, Column as StakingOptionColumn, Entity as StakingOption,
};
use tracing::{info, warn};

/// Active catalog entries, optionally narrowed by token and network,
/// best yield first. Deactivated rows never leave through this route.
#[get("/api/options?<token>&<network>")]
pub async fn get_options(
    conn: Connection<'_, Db>,
    token: Option<String>,
    network: Option<String>,
) -> Json<ResponseData<Vec<OptionDetails>>> {
    let db = conn.into_inner();

    let mut query = StakingOption::find().filter(StakingOptionColumn::IsActive.eq(true));
    if let Some(token) = token {
        query = query.filter(StakingOptionColumn::Token.eq(token.to_uppercase()));
    }
    if let Some(network) = network {
        query = query.filter(StakingOptionColumn::Network.eq(network));
    }

    match query
        .order_by_desc(StakingOptionColumn::Apy)
        .all(db)
        .await
    {
        Ok(options) => {
            let details: Vec<OptionDetails> = options.iter().map(OptionDetails::new).collect();
            info!("Found {} active staking options", details.len());
            Json(ResponseData::new(RESPONSE_OK, "".to_owned(), Some(details)))
        }
        Err(error) => {
            warn!("Error fetching staking options: {:?}", error);
            Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                "Failed to fetch staking options".to_owned(),
                None,
            ))
        }
    }
}

/// Administrative override path; the synchronizer owns every other write
/// to the catalog.
#[post("/api/options", data = "<request>")]
pub async fn create_option(
    conn: Connection<'_, Db>,
    request: Json<CreateOptionRequest>,
) -> Json<ResponseData<OptionDetails>> {
    let request = request.into_inner();
    let db = conn.into_inner();

    let id = format!(
        "{}-{}-{}",
        request.protocol.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-"),
        request.token.to_lowercase(),
        request.network
    );
    let now = Utc::now().timestamp();
    let option = StakingOptionActiveModel {
        id: ActiveValue::Set(id.to_owned()),
        protocol: ActiveValue::Set(request.protocol),
        token: ActiveValue::Set(request.token),
        apy: ActiveValue::Set(request.apy),
        tvl: ActiveValue::Set(request.tvl),
        tvl_usd: ActiveValue::Set(request.tvl_usd.unwrap_or(0.0)),
        risk: ActiveValue::Set(request.risk),
        adapter_address: ActiveValue::Set(request.adapter_address),
        is_active: ActiveValue::Set(true),
        network: ActiveValue::Set(request.network),
        created_at: ActiveValue::Set(now),
        updated_at: ActiveValue::Set(now),
    };

    match StakingOption::insert(option).exec(db).await {
        Ok(_) => match StakingOption::find_by_id(id).one(db).await {
            Ok(Some(created)) => Json(ResponseData::new(
                RESPONSE_CREATED,
                "".to_owned(),
                Some(OptionDetails::new(&created)),
            )),
            _ => Json(ResponseData::new(RESPONSE_CREATED, "".to_owned(), None)),
        },
        Err(error) => {
            warn!("Error creating staking option: {:?}", error);
            Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                "Failed to create staking option".to_owned(),
                None,
            ))
        }
    }
}

/// Enqueues one ad hoc synchronizer run outside the regular schedule.
#[post("/api/admin/update-options")]
pub async fn trigger_refresh(conn: Connection<'_, Db>) -> Json<ResponseData<String>> {
    let db = conn.into_inner();
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
    match RefreshJob::insert(job).exec(db).await {
        Ok(_) => {
            info!("Manual update options job triggered");
            Json(ResponseData::new(
                RESPONSE_OK,
                "Update job queued".to_owned(),
                None,
            ))
        }
        Err(error) => {
            warn!("Error queueing manual refresh: {:?}", error);
            Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                "Failed to queue update job".to_owned(),
                None,
            ))
        }
    }
}
