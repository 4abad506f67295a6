use rocket::serde::{Deserialize, Serialize};
use staking_db_entity::db::staking_option::Model as StakingOptionModel;
use staking_db_entity::db::staking_transaction::Model as StakingTransactionModel;
use staking_db_entity::db::staking_user::Model as StakingUserModel;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ResponseData<T> {
    pub code: Option<u16>,
    #[serde(rename = "statusCode")]
    pub status_code: Option<u16>,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ResponseData<T> {
    pub fn new(code: u16, message: String, data: Option<T>) -> ResponseData<T> {
        ResponseData {
            code: Some(code),
            status_code: None,
            message,
            data,
        }
    }
}

pub const RESPONSE_OK: u16 = 200;
pub const RESPONSE_CREATED: u16 = 201;
pub const RESPONSE_BAD_REQUEST: u16 = 400;
pub const RESPONSE_NOT_FOUND: u16 = 404;
pub const RESPONSE_INTERNAL_ERROR: u16 = 500;

/// Ledger statuses. `Failed` is only reachable through the explicit
/// status-update endpoint or a gateway-observed revert.
#[derive(Clone, Copy, Debug, PartialEq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
    Unstaked,
}

impl TransactionStatus {
    pub fn is_valid(value: &str) -> bool {
        TransactionStatus::from_str(value).is_ok()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct ExecuteStakeRequest {
    pub user_address: String,
    pub token: String,
    /// Base-unit integer string; converted to human units only at the
    /// ledger boundary.
    pub amount: String,
    pub option_id: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct ExecuteUnstakeRequest {
    pub user_address: String,
    pub token: String,
    pub amount: String,
    pub option_id: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct ExecuteStakeResponse {
    pub tx_hash: String,
    pub fee: String,
    pub status: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct StakeQuoteRequest {
    pub amount: String,
    pub option_id: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct StakeQuoteResponse {
    pub amount: String,
    pub fee: String,
    pub amount_after_fee: String,
    pub fee_percentage: f64,
    pub protocol: String,
    pub apy: f64,
    pub tvl: String,
    pub risk: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct OptionDetails {
    pub id: String,
    pub protocol: String,
    pub token: String,
    pub apy: f64,
    pub tvl: String,
    pub risk: String,
    pub adapter_address: String,
    pub is_active: bool,
    pub network: String,
}

impl OptionDetails {
    pub fn new(option: &StakingOptionModel) -> OptionDetails {
        OptionDetails {
            id: option.id.to_owned(),
            protocol: option.protocol.to_owned(),
            token: option.token.to_owned(),
            apy: option.apy,
            tvl: option.tvl.to_owned(),
            risk: option.risk.to_owned(),
            adapter_address: option.adapter_address.to_owned(),
            is_active: option.is_active,
            network: option.network.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct CreateOptionRequest {
    pub protocol: String,
    pub token: String,
    pub apy: f64,
    pub tvl: String,
    pub tvl_usd: Option<f64>,
    pub risk: String,
    pub adapter_address: String,
    pub network: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct TransactionDetails {
    pub tx_hash: String,
    pub user_address: String,
    pub token: String,
    pub token_address: String,
    pub amount: String,
    pub protocol: String,
    pub adapter_address: String,
    pub status: String,
    pub fee: String,
    pub network: String,
    pub timestamp: i64,
    pub unstake_tx_hash: Option<String>,
    pub unstaked_at: Option<i64>,
}

impl TransactionDetails {
    pub fn new(transaction: &StakingTransactionModel) -> TransactionDetails {
        TransactionDetails {
            tx_hash: transaction.tx_hash.to_owned(),
            user_address: transaction.user_address.to_owned(),
            token: transaction.token.to_owned(),
            token_address: transaction.token_address.to_owned(),
            amount: transaction.amount.to_owned(),
            protocol: transaction.protocol.to_owned(),
            adapter_address: transaction.adapter_address.to_owned(),
            status: transaction.status.to_owned(),
            fee: transaction.fee.to_owned(),
            network: transaction.network.to_owned(),
            timestamp: transaction.created_at,
            unstake_tx_hash: transaction.unstake_tx_hash.to_owned(),
            unstaked_at: transaction.unstaked_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub tx_hash: String,
    pub user_address: String,
    pub token: String,
    pub token_address: Option<String>,
    pub amount: String,
    pub protocol: String,
    pub adapter_address: String,
    pub fee: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct LoginRequest {
    pub wallet_address: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct UserDetails {
    pub wallet_address: String,
    pub created_at: i64,
    pub last_login: i64,
    pub total_staked: String,
    pub total_earnings: String,
}

impl UserDetails {
    pub fn new(user: &StakingUserModel) -> UserDetails {
        UserDetails {
            wallet_address: user.wallet_address.to_owned(),
            created_at: user.created_at,
            last_login: user.last_login,
            total_staked: user.total_staked.to_string(),
            total_earnings: user.total_earnings.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(crate = "rocket::serde", rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserDetails,
    pub is_new_user: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_round_trip_as_lowercase_strings() {
        assert_eq!(TransactionStatus::Confirmed.to_string(), "confirmed");
        assert_eq!(
            TransactionStatus::from_str("unstaked").unwrap(),
            TransactionStatus::Unstaked
        );
        assert!(TransactionStatus::is_valid("pending"));
        assert!(TransactionStatus::is_valid("failed"));
        assert!(!TransactionStatus::is_valid("settled"));
    }
}
