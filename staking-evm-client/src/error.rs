use alloy::transports::{RpcError, TransportErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain client configuration error: {0}")]
    Config(String),
    #[error("rpc transport error: {0}")]
    Rpc(#[from] RpcError<TransportErrorKind>),
    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),
    #[error("pending transaction error: {0}")]
    PendingTransaction(#[from] alloy::providers::PendingTransactionError),
    #[error("could not decode router log: {0}")]
    Decode(#[from] alloy::sol_types::Error),
    #[error("transaction {0} reverted on-chain")]
    Reverted(String),
    #[error("transaction {0} was not confirmed within the configured budget")]
    ConfirmationTimeout(String),
}
