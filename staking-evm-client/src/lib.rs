pub mod client;
pub mod contracts;
pub mod error;
pub mod units;

pub use alloy::primitives::{Address, TxHash, U256};
pub use alloy::rpc::types::Log;
pub use client::{RouterClient, RouterEvents};
pub use contracts::RouterEvent;
pub use error::ChainError;
