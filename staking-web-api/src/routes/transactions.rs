use crate::dto::{
    CreateTransactionRequest, ResponseData, TransactionDetails, TransactionStatus,
    UpdateStatusRequest, RESPONSE_BAD_REQUEST, RESPONSE_CREATED, RESPONSE_NOT_FOUND, RESPONSE_OK,
};
use crate::pool::{Db, StakingConfig};
use chrono::Utc;
use rocket::{serde::json::Json, State};
use sea_orm::{
    entity::Set as EntitySet, ActiveModelTrait, ActiveValue, ColumnTrait, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder,
};
use sea_orm_rocket::Connection;
use staking_db_entity::db::staking_transaction::{
    ActiveModel as StakingTransactionActiveModel, Column as StakingTransactionColumn,
    Entity as StakingTransaction,
};
use tracing::{info, warn};

/// Records a ledger row directly. The user address is lowercase-
/// normalized on the way in, the same as the reconciler does.
#[post("/api/transactions", data = "<request>")]
pub async fn create_transaction(
    conn: Connection<'_, Db>,
    config: &State<StakingConfig>,
    request: Json<CreateTransactionRequest>,
) -> Json<ResponseData<TransactionDetails>> {
    let request = request.into_inner();
    let db = conn.into_inner();

    let status = request
        .status
        .unwrap_or_else(|| TransactionStatus::Pending.to_string());
    if !TransactionStatus::is_valid(&status) {
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            format!("Unknown transaction status: {status}"),
            None,
        ));
    }

    let tx_hash = request.tx_hash.to_owned();
    let transaction = StakingTransactionActiveModel {
        tx_hash: ActiveValue::Set(request.tx_hash),
        user_address: ActiveValue::Set(request.user_address.to_lowercase()),
        token: ActiveValue::Set(request.token),
        token_address: ActiveValue::Set(request.token_address.unwrap_or_default()),
        amount: ActiveValue::Set(request.amount),
        protocol: ActiveValue::Set(request.protocol),
        adapter_address: ActiveValue::Set(request.adapter_address),
        status: ActiveValue::Set(status),
        fee: ActiveValue::Set(request.fee.unwrap_or_else(|| "0".to_owned())),
        network: ActiveValue::Set(config.active_network.to_owned()),
        created_at: ActiveValue::Set(Utc::now().timestamp()),
        unstake_tx_hash: ActiveValue::Set(None),
        unstaked_at: ActiveValue::Set(None),
    };

    match StakingTransaction::insert(transaction).exec(db).await {
        Ok(_) => match StakingTransaction::find_by_id(tx_hash.to_owned()).one(db).await {
            Ok(Some(created)) => {
                info!("Transaction recorded: {tx_hash}");
                Json(ResponseData::new(
                    RESPONSE_CREATED,
                    "".to_owned(),
                    Some(TransactionDetails::new(&created)),
                ))
            }
            _ => Json(ResponseData::new(RESPONSE_CREATED, "".to_owned(), None)),
        },
        Err(error) => {
            warn!("Error recording transaction {tx_hash}: {:?}", error.to_string());
            Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                "Failed to record transaction".to_owned(),
                None,
            ))
        }
    }
}

/// Newest-first transaction history for one wallet, optionally narrowed
/// by network.
#[get("/api/transactions/<user_address>?<network>")]
pub async fn get_transactions_by_user(
    conn: Connection<'_, Db>,
    user_address: String,
    network: Option<String>,
) -> Json<ResponseData<Vec<TransactionDetails>>> {
    let db = conn.into_inner();

    let mut query = StakingTransaction::find()
        .filter(StakingTransactionColumn::UserAddress.eq(user_address.to_lowercase()));
    if let Some(network) = network {
        query = query.filter(StakingTransactionColumn::Network.eq(network));
    }

    match query
        .order_by_desc(StakingTransactionColumn::CreatedAt)
        .all(db)
        .await
    {
        Ok(transactions) => {
            let details: Vec<TransactionDetails> =
                transactions.iter().map(TransactionDetails::new).collect();
            Json(ResponseData::new(RESPONSE_OK, "".to_owned(), Some(details)))
        }
        Err(error) => {
            warn!("Error fetching transactions for {user_address}: {:?}", error);
            Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                "Failed to fetch transactions".to_owned(),
                None,
            ))
        }
    }
}

/// Explicit status override. This is the only path that can take a row
/// to `failed` outside the gateway's own revert handling.
#[patch("/api/transactions/<tx_hash>/status", data = "<request>")]
pub async fn update_transaction_status(
    conn: Connection<'_, Db>,
    tx_hash: String,
    request: Json<UpdateStatusRequest>,
) -> Json<ResponseData<TransactionDetails>> {
    let request = request.into_inner();
    if !TransactionStatus::is_valid(&request.status) {
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            format!("Unknown transaction status: {}", request.status),
            None,
        ));
    }

    let db = conn.into_inner();
    match StakingTransaction::find_by_id(tx_hash.to_owned()).one(db).await {
        Ok(Some(transaction)) => {
            let mut active = transaction.into_active_model();
            active.status = EntitySet(request.status.to_owned());
            match active.update(db).await {
                Ok(updated) => {
                    info!("Transaction {tx_hash} status set to {}", request.status);
                    Json(ResponseData::new(
                        RESPONSE_OK,
                        "".to_owned(),
                        Some(TransactionDetails::new(&updated)),
                    ))
                }
                Err(error) => {
                    warn!("Error updating transaction {tx_hash}: {:?}", error);
                    Json(ResponseData::new(
                        RESPONSE_BAD_REQUEST,
                        "Failed to update transaction".to_owned(),
                        None,
                    ))
                }
            }
        }
        Ok(None) => Json(ResponseData::new(
            RESPONSE_NOT_FOUND,
            "Transaction not found".to_owned(),
            None,
        )),
        Err(error) => {
            warn!("Error fetching transaction {tx_hash}: {:?}", error);
            Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                "Failed to update transaction".to_owned(),
                None,
            ))
        }
    }
}
