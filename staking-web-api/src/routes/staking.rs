use crate::dto::{
    ExecuteStakeRequest, ExecuteStakeResponse, ExecuteUnstakeRequest, ResponseData,
    StakeQuoteRequest, StakeQuoteResponse, TransactionStatus, RESPONSE_BAD_REQUEST,
    RESPONSE_CREATED, RESPONSE_INTERNAL_ERROR, RESPONSE_NOT_FOUND, RESPONSE_OK,
};
use crate::pool::{Db, StakingConfig};
use chrono::Utc;
use rocket::{serde::json::Json, State};
use sea_orm::{
    entity::Set as EntitySet, ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, QueryFilter,
};
use sea_orm_rocket::Connection;
use staking_db_entity::db::staking_option::{
    Column as StakingOptionColumn, Entity as StakingOption, Model as StakingOptionModel,
};
use staking_db_entity::db::staking_transaction::{
    ActiveModel as StakingTransactionActiveModel, Entity as StakingTransaction,
};
use staking_evm_client::units::format_base_units;
use staking_evm_client::{Address, ChainError, RouterClient, TxHash, U256};
use tracing::{info, warn};

/// Custodial staking path: validates the intent, proves the adapter is
/// whitelisted on-chain, runs the approve-then-stake sequence, and writes
/// the provisional ledger row the reconciler later converges with.
#[post("/api/stake/execute", data = "<request>")]
pub async fn execute_stake(
    conn: Connection<'_, Db>,
    config: &State<StakingConfig>,
    chain: &State<RouterClient>,
    request: Json<ExecuteStakeRequest>,
) -> Json<ResponseData<ExecuteStakeResponse>> {
    let request = request.into_inner();
    if request.user_address.is_empty()
        || request.token.is_empty()
        || request.amount.is_empty()
        || request.option_id.is_empty()
    {
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            "Missing required fields".to_owned(),
            None,
        ));
    }

    let db = conn.into_inner();
    let option = match find_active_option(db, &request.option_id).await {
        Ok(Some(option)) => option,
        Ok(None) => {
            return Json(ResponseData::new(
                RESPONSE_NOT_FOUND,
                "Staking option not found".to_owned(),
                None,
            ))
        }
        Err(error) => {
            warn!("Error looking up staking option: {:?}", error);
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Failed to execute stake".to_owned(),
                None,
            ));
        }
    };

    info!(
        "Executing stake for {} - Token: {}, Amount: {}, Protocol: {}",
        request.user_address, request.token, request.amount, option.protocol
    );

    let Some((token_address_str, decimals)) = config.resolve_token(&request.token) else {
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            format!("Token address not configured for {}", request.token),
            None,
        ));
    };
    let Ok(token_address) = token_address_str.parse::<Address>() else {
        return Json(ResponseData::new(
            RESPONSE_INTERNAL_ERROR,
            format!("Configured address for {} is invalid", request.token),
            None,
        ));
    };
    let Ok(amount) = request.amount.parse::<U256>() else {
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            "Amount must be a base-unit integer string".to_owned(),
            None,
        ));
    };
    let Ok(adapter) = option.adapter_address.parse::<Address>() else {
        return Json(ResponseData::new(
            RESPONSE_INTERNAL_ERROR,
            "Staking option has an invalid adapter address".to_owned(),
            None,
        ));
    };

    // the router's own whitelist is authoritative over the off-chain
    // catalog; nothing is sent before this check passes
    match chain.is_adapter_supported(adapter).await {
        Ok(true) => {}
        Ok(false) => {
            return Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                "Adapter not supported".to_owned(),
                None,
            ))
        }
        Err(error) => {
            warn!("Error checking adapter: {error}");
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Could not verify adapter with the router".to_owned(),
                None,
            ));
        }
    }

    let fee_basis_points = match chain.fee_basis_points().await {
        Ok(bps) => bps,
        Err(error) => {
            warn!("Error getting fee: {error}");
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Could not read the router fee".to_owned(),
                None,
            ));
        }
    };
    let fee = amount * fee_basis_points / U256::from(10_000u64);

    // ERC-20 stakes need the router approved first; the approval receipt
    // is awaited before the stake leaves
    if !token_address.is_zero() {
        match chain.allowance(token_address).await {
            Ok(allowance) if allowance < amount => {
                info!("Insufficient allowance, approving...");
                if let Err(error) = chain.approve(token_address, amount).await {
                    warn!("Error approving token: {error}");
                    return Json(ResponseData::new(
                        RESPONSE_INTERNAL_ERROR,
                        format!("Token approval failed: {error}"),
                        None,
                    ));
                }
            }
            Ok(_) => {}
            Err(error) => {
                warn!("Error checking allowance: {error}");
                return Json(ResponseData::new(
                    RESPONSE_INTERNAL_ERROR,
                    "Could not check token allowance".to_owned(),
                    None,
                ));
            }
        }
    }

    let tx_hash = match chain.submit_stake(token_address, amount, adapter).await {
        Ok(tx_hash) => tx_hash,
        Err(error) => {
            warn!("Error executing stake: {error}");
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                format!("Failed to execute stake: {error}"),
                None,
            ));
        }
    };

    // a hash exists, so the provisional row goes in now; the event
    // pipeline converges it even if this process dies mid-wait
    record_pending_transaction(
        db, config, &request, &option, &token_address_str, amount, fee, decimals, tx_hash,
    )
    .await;

    match chain
        .wait_for_confirmation(tx_hash, config.confirm_attempts(), config.confirm_timeout())
        .await
    {
        Ok(()) => {
            promote_to_confirmed(db, tx_hash).await;
            info!("Stake executed successfully: {tx_hash}");
            Json(ResponseData::new(
                RESPONSE_CREATED,
                "".to_owned(),
                Some(ExecuteStakeResponse {
                    tx_hash: tx_hash.to_string(),
                    fee: fee.to_string(),
                    status: TransactionStatus::Confirmed.to_string(),
                }),
            ))
        }
        Err(ChainError::Reverted(_)) => {
            mark_failed(db, tx_hash).await;
            Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Stake transaction reverted on-chain".to_owned(),
                Some(ExecuteStakeResponse {
                    tx_hash: tx_hash.to_string(),
                    fee: fee.to_string(),
                    status: TransactionStatus::Failed.to_string(),
                }),
            ))
        }
        Err(ChainError::ConfirmationTimeout(_)) => Json(ResponseData::new(
            RESPONSE_OK,
            "Transaction submitted but could not be confirmed within budget; it may still be mined"
                .to_owned(),
            Some(ExecuteStakeResponse {
                tx_hash: tx_hash.to_string(),
                fee: fee.to_string(),
                status: TransactionStatus::Pending.to_string(),
            }),
        )),
        Err(error) => {
            warn!("Error waiting for stake confirmation: {error}");
            Json(ResponseData::new(
                RESPONSE_OK,
                "Transaction submitted; confirmation status unknown".to_owned(),
                Some(ExecuteStakeResponse {
                    tx_hash: tx_hash.to_string(),
                    fee: fee.to_string(),
                    status: TransactionStatus::Pending.to_string(),
                }),
            ))
        }
    }
}

/// Submits the unstake call. The ledger row is not touched here: the
/// Unstaked event owns that transition, keeping a single writer per
/// mutation path.
#[post("/api/unstake/execute", data = "<request>")]
pub async fn execute_unstake(
    conn: Connection<'_, Db>,
    config: &State<StakingConfig>,
    chain: &State<RouterClient>,
    request: Json<ExecuteUnstakeRequest>,
) -> Json<ResponseData<ExecuteStakeResponse>> {
    let request = request.into_inner();
    if request.user_address.is_empty()
        || request.token.is_empty()
        || request.amount.is_empty()
        || request.option_id.is_empty()
    {
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            "Missing required fields".to_owned(),
            None,
        ));
    }

    let db = conn.into_inner();
    let option = match find_active_option(db, &request.option_id).await {
        Ok(Some(option)) => option,
        Ok(None) => {
            return Json(ResponseData::new(
                RESPONSE_NOT_FOUND,
                "Staking option not found".to_owned(),
                None,
            ))
        }
        Err(error) => {
            warn!("Error looking up staking option: {:?}", error);
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Failed to execute unstake".to_owned(),
                None,
            ));
        }
    };

    let Some((token_address_str, _decimals)) = config.resolve_token(&request.token) else {
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            format!("Token address not configured for {}", request.token),
            None,
        ));
    };
    let (Ok(token_address), Ok(amount), Ok(adapter)) = (
        token_address_str.parse::<Address>(),
        request.amount.parse::<U256>(),
        option.adapter_address.parse::<Address>(),
    ) else {
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            "Invalid token, amount or adapter".to_owned(),
            None,
        ));
    };

    match chain.is_adapter_supported(adapter).await {
        Ok(true) => {}
        Ok(false) => {
            return Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                "Adapter not supported".to_owned(),
                None,
            ))
        }
        Err(error) => {
            warn!("Error checking adapter: {error}");
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Could not verify adapter with the router".to_owned(),
                None,
            ));
        }
    }

    let tx_hash = match chain.submit_unstake(token_address, amount, adapter).await {
        Ok(tx_hash) => tx_hash,
        Err(error) => {
            warn!("Error executing unstake: {error}");
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                format!("Failed to execute unstake: {error}"),
                None,
            ));
        }
    };

    match chain
        .wait_for_confirmation(tx_hash, config.confirm_attempts(), config.confirm_timeout())
        .await
    {
        Ok(()) => {
            info!("Unstake executed successfully: {tx_hash}");
            Json(ResponseData::new(
                RESPONSE_OK,
                "".to_owned(),
                Some(ExecuteStakeResponse {
                    tx_hash: tx_hash.to_string(),
                    fee: "0".to_owned(),
                    status: TransactionStatus::Confirmed.to_string(),
                }),
            ))
        }
        Err(ChainError::Reverted(_)) => Json(ResponseData::new(
            RESPONSE_INTERNAL_ERROR,
            "Unstake transaction reverted on-chain".to_owned(),
            Some(ExecuteStakeResponse {
                tx_hash: tx_hash.to_string(),
                fee: "0".to_owned(),
                status: TransactionStatus::Failed.to_string(),
            }),
        )),
        Err(error) => {
            warn!("Error waiting for unstake confirmation: {error}");
            Json(ResponseData::new(
                RESPONSE_OK,
                "Transaction submitted; confirmation status unknown".to_owned(),
                Some(ExecuteStakeResponse {
                    tx_hash: tx_hash.to_string(),
                    fee: "0".to_owned(),
                    status: TransactionStatus::Pending.to_string(),
                }),
            ))
        }
    }
}

/// Fee and net-amount preview computed from the live router fee; nothing
/// is sent on-chain.
#[post("/api/stake/quote", data = "<request>")]
pub async fn get_stake_quote(
    conn: Connection<'_, Db>,
    chain: &State<RouterClient>,
    request: Json<StakeQuoteRequest>,
) -> Json<ResponseData<StakeQuoteResponse>> {
    let request = request.into_inner();
    let db = conn.into_inner();

    let option = match find_active_option(db, &request.option_id).await {
        Ok(Some(option)) => option,
        Ok(None) => {
            return Json(ResponseData::new(
                RESPONSE_NOT_FOUND,
                "Staking option not found".to_owned(),
                None,
            ))
        }
        Err(error) => {
            warn!("Error looking up staking option: {:?}", error);
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Failed to get quote".to_owned(),
                None,
            ));
        }
    };

    let Ok(amount) = request.amount.parse::<U256>() else {
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            "Amount must be a base-unit integer string".to_owned(),
            None,
        ));
    };
    let fee_basis_points = match chain.fee_basis_points().await {
        Ok(bps) => bps,
        Err(error) => {
            warn!("Error getting fee: {error}");
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Could not read the router fee".to_owned(),
                None,
            ));
        }
    };

    let fee = amount * fee_basis_points / U256::from(10_000u64);
    let amount_after_fee = amount.checked_sub(fee).unwrap_or(U256::ZERO);
    let fee_percentage = u64::try_from(fee_basis_points).unwrap_or(0) as f64 / 100.0;

    Json(ResponseData::new(
        RESPONSE_OK,
        "".to_owned(),
        Some(StakeQuoteResponse {
            amount: amount.to_string(),
            fee: fee.to_string(),
            amount_after_fee: amount_after_fee.to_string(),
            fee_percentage,
            protocol: option.protocol,
            apy: option.apy,
            tvl: option.tvl,
            risk: option.risk,
        }),
    ))
}

async fn find_active_option(
    db: &DatabaseConnection,
    option_id: &str,
) -> Result<Option<StakingOptionModel>, sea_orm::DbErr> {
    StakingOption::find()
        .filter(StakingOptionColumn::Id.eq(option_id))
        .filter(StakingOptionColumn::IsActive.eq(true))
        .one(db)
        .await
}

#[allow(clippy::too_many_arguments)]
async fn record_pending_transaction(
    db: &DatabaseConnection,
    config: &StakingConfig,
    request: &ExecuteStakeRequest,
    option: &StakingOptionModel,
    token_address: &str,
    amount: U256,
    fee: U256,
    decimals: u8,
    tx_hash: TxHash,
) {
    let human_amount =
        format_base_units(amount, decimals).unwrap_or_else(|_| amount.to_string());
    let human_fee = format_base_units(fee, decimals).unwrap_or_else(|_| fee.to_string());
    let transaction = StakingTransactionActiveModel {
        tx_hash: ActiveValue::Set(tx_hash.to_string()),
        user_address: ActiveValue::Set(request.user_address.to_lowercase()),
        token: ActiveValue::Set(request.token.to_owned()),
        token_address: ActiveValue::Set(token_address.to_owned()),
        amount: ActiveValue::Set(human_amount),
        protocol: ActiveValue::Set(option.protocol.to_owned()),
        adapter_address: ActiveValue::Set(option.adapter_address.to_owned()),
        status: ActiveValue::Set(TransactionStatus::Pending.to_string()),
        fee: ActiveValue::Set(human_fee),
        network: ActiveValue::Set(config.active_network.to_owned()),
        created_at: ActiveValue::Set(Utc::now().timestamp()),
        unstake_tx_hash: ActiveValue::Set(None),
        unstaked_at: ActiveValue::Set(None),
    };
    match StakingTransaction::insert(transaction).exec(db).await {
        Ok(_) => info!("Transaction recorded: {tx_hash}"),
        Err(error) => {
            // the reconciler may already have written this hash; either
            // way the ledger converges through the event path
            warn!("Could not record transaction {tx_hash}: {:?}", error.to_string());
        }
    }
}

/// Idempotent promotion consistent with the reconciler's upsert: only a
/// still-pending row moves to confirmed.
async fn promote_to_confirmed(db: &DatabaseConnection, tx_hash: TxHash) {
    match StakingTransaction::find_by_id(tx_hash.to_string()).one(db).await {
        Ok(Some(transaction)) => {
            if transaction.status == TransactionStatus::Pending.to_string() {
                let mut active = transaction.into_active_model();
                active.status = EntitySet(TransactionStatus::Confirmed.to_string());
                if let Err(error) = active.update(db).await {
                    warn!("Could not confirm transaction {tx_hash}: {:?}", error);
                }
            }
        }
        Ok(None) => warn!("Transaction {tx_hash} missing while confirming"),
        Err(error) => warn!("Error confirming transaction {tx_hash}: {:?}", error),
    }
}

async fn mark_failed(db: &DatabaseConnection, tx_hash: TxHash) {
    match StakingTransaction::find_by_id(tx_hash.to_string()).one(db).await {
        Ok(Some(transaction)) => {
            let mut active = transaction.into_active_model();
            active.status = EntitySet(TransactionStatus::Failed.to_string());
            if let Err(error) = active.update(db).await {
                warn!("Could not mark transaction {tx_hash} failed: {:?}", error);
            }
        }
        Ok(None) => {}
        Err(error) => warn!("Error marking transaction {tx_hash} failed: {:?}", error),
    }
}
