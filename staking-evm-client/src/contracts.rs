use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;

use crate::error::ChainError;

sol! {
    #[sol(rpc)]
    contract StakingRouter {
        event Staked(address indexed user, address indexed token, uint256 amount, address indexed adapter, uint256 fee);
        event Unstaked(address indexed user, address indexed token, uint256 amount, address indexed adapter);

        function stake(address token, uint256 amount, address adapter) external payable;
        function unstake(address token, uint256 amount, address adapter) external;
        function feeBasisPoints() external view returns (uint256);
        function supportedAdapters(address adapter) external view returns (bool);
    }

    #[sol(rpc)]
    contract Erc20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
    }
}

/// A router log decoded into its typed form, together with the log
/// metadata the reconciliation pipeline keys on.
#[derive(Clone, Debug)]
pub enum RouterEvent {
    Staked {
        user: Address,
        token: Address,
        amount: U256,
        adapter: Address,
        fee: U256,
        tx_hash: TxHash,
        block_number: u64,
    },
    Unstaked {
        user: Address,
        token: Address,
        amount: U256,
        adapter: Address,
        tx_hash: TxHash,
        block_number: u64,
    },
}

impl RouterEvent {
    /// Decodes a raw log from the router subscription. Returns `Ok(None)`
    /// for topics other than `Staked`/`Unstaked` and for logs missing the
    /// transaction hash (pending logs are of no use to the pipeline).
    pub fn decode(log: &Log) -> Result<Option<RouterEvent>, ChainError> {
        let (Some(tx_hash), Some(block_number)) = (log.transaction_hash, log.block_number) else {
            return Ok(None);
        };
        match log.topic0() {
            Some(&StakingRouter::Staked::SIGNATURE_HASH) => {
                let decoded = StakingRouter::Staked::decode_log(&log.inner)?;
                Ok(Some(RouterEvent::Staked {
                    user: decoded.user,
                    token: decoded.token,
                    amount: decoded.amount,
                    adapter: decoded.adapter,
                    fee: decoded.fee,
                    tx_hash,
                    block_number,
                }))
            }
            Some(&StakingRouter::Unstaked::SIGNATURE_HASH) => {
                let decoded = StakingRouter::Unstaked::decode_log(&log.inner)?;
                Ok(Some(RouterEvent::Unstaked {
                    user: decoded.user,
                    token: decoded.token,
                    amount: decoded.amount,
                    adapter: decoded.adapter,
                    tx_hash,
                    block_number,
                }))
            }
            _ => Ok(None),
        }
    }

    pub fn tx_hash(&self) -> TxHash {
        match self {
            RouterEvent::Staked { tx_hash, .. } => *tx_hash,
            RouterEvent::Unstaked { tx_hash, .. } => *tx_hash,
        }
    }
}
