use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder, WsConnect};
use alloy::pubsub::Subscription;
use alloy::rpc::types::{Filter, Log};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolEvent;
use tracing::{info, warn};

use crate::contracts::{Erc20, StakingRouter};
use crate::error::ChainError;

/// How often the confirmation wait polls the node for a receipt.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Signing client for the staking router contract. Constructed once at
/// startup and passed by reference into whatever needs chain access.
pub struct RouterClient {
    provider: DynProvider,
    router: Address,
    relayer: Address,
}

impl RouterClient {
    pub async fn connect(
        rpc_url: &str,
        private_key: &str,
        router_address: &str,
    ) -> Result<Self, ChainError> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| ChainError::Config(format!("invalid relayer signing key: {e}")))?;
        let relayer = signer.address();
        let router = parse_address(router_address)?;
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect(rpc_url)
            .await?
            .erased();
        info!("Router client connected - relayer: {relayer}, router: {router}");
        Ok(Self {
            provider,
            router,
            relayer,
        })
    }

    pub fn relayer_address(&self) -> Address {
        self.relayer
    }

    pub fn router_address(&self) -> Address {
        self.router
    }

    pub async fn fee_basis_points(&self) -> Result<U256, ChainError> {
        let router = StakingRouter::new(self.router, self.provider.clone());
        Ok(router.feeBasisPoints().call().await?)
    }

    /// On-chain whitelist check, authoritative over any off-chain
    /// adapter configuration.
    pub async fn is_adapter_supported(&self, adapter: Address) -> Result<bool, ChainError> {
        let router = StakingRouter::new(self.router, self.provider.clone());
        Ok(router.supportedAdapters(adapter).call().await?)
    }

    pub async fn allowance(&self, token: Address) -> Result<U256, ChainError> {
        let erc20 = Erc20::new(token, self.provider.clone());
        Ok(erc20.allowance(self.relayer, self.router).call().await?)
    }

    /// Submits an approval for the router and blocks until it is mined.
    /// Stake submission must not proceed past an unconfirmed approval.
    pub async fn approve(&self, token: Address, amount: U256) -> Result<TxHash, ChainError> {
        let erc20 = Erc20::new(token, self.provider.clone());
        let receipt = erc20
            .approve(self.router, amount)
            .send()
            .await?
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(ChainError::Reverted(receipt.transaction_hash.to_string()));
        }
        info!("Token approved: {}", receipt.transaction_hash);
        Ok(receipt.transaction_hash)
    }

    /// Submits the stake call and returns as soon as the node has accepted
    /// the transaction. Confirmation is a separate, bounded wait.
    pub async fn submit_stake(
        &self,
        token: Address,
        amount: U256,
        adapter: Address,
    ) -> Result<TxHash, ChainError> {
        let router = StakingRouter::new(self.router, self.provider.clone());
        let call = router.stake(token, amount, adapter);
        // the native asset travels as msg.value, ERC-20s through the
        // approval set up beforehand
        let call = if token.is_zero() { call.value(amount) } else { call };
        let pending = call.send().await?;
        Ok(*pending.tx_hash())
    }

    pub async fn submit_unstake(
        &self,
        token: Address,
        amount: U256,
        adapter: Address,
    ) -> Result<TxHash, ChainError> {
        let router = StakingRouter::new(self.router, self.provider.clone());
        let pending = router.unstake(token, amount, adapter).send().await?;
        Ok(*pending.tx_hash())
    }

    /// Polls for the receipt with an escalating per-attempt budget. A
    /// transaction that never shows a receipt within the budget yields
    /// `ConfirmationTimeout` - it may still be mined later, so callers
    /// must not report it as failed.
    pub async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        attempts: u32,
        base_timeout: Duration,
    ) -> Result<(), ChainError> {
        for attempt in 1..=attempts {
            let budget = base_timeout * attempt;
            let deadline = tokio::time::Instant::now() + budget;
            while tokio::time::Instant::now() < deadline {
                match self.provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => {
                        if receipt.status() {
                            return Ok(());
                        }
                        return Err(ChainError::Reverted(tx_hash.to_string()));
                    }
                    Ok(None) => {}
                    Err(error) => {
                        warn!("Receipt lookup failed for {tx_hash}: {error}");
                    }
                }
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            }
            warn!("No receipt for {tx_hash} within {budget:?} (attempt {attempt}/{attempts})");
        }
        Err(ChainError::ConfirmationTimeout(tx_hash.to_string()))
    }
}

/// Live `Staked`/`Unstaked` log subscription on one router contract. The
/// websocket provider is held alongside the subscription so the backend
/// connection outlives the handshake.
pub struct RouterEvents {
    _provider: DynProvider,
    subscription: Subscription<Log>,
}

impl RouterEvents {
    pub async fn subscribe(ws_url: &str, router: Address) -> Result<Self, ChainError> {
        let provider = ProviderBuilder::new()
            .connect_ws(WsConnect::new(ws_url))
            .await?
            .erased();
        let filter = Filter::new().address(router).event_signature(vec![
            StakingRouter::Staked::SIGNATURE_HASH,
            StakingRouter::Unstaked::SIGNATURE_HASH,
        ]);
        let subscription = provider.subscribe_logs(&filter).await?;
        Ok(Self {
            _provider: provider,
            subscription,
        })
    }

    /// Next raw log, or `None` once the subscription has ended and the
    /// caller should reconnect.
    pub async fn next(&mut self) -> Option<Log> {
        self.subscription.recv().await.ok()
    }
}

pub fn parse_address(value: &str) -> Result<Address, ChainError> {
    value
        .parse::<Address>()
        .map_err(|e| ChainError::Config(format!("invalid address '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_checksummed_and_lowercase_addresses() {
        let checksummed = "0xd965b8FA53a1b33B19079b9e998F4A928354B826";
        let lower = checksummed.to_lowercase();
        assert_eq!(
            parse_address(checksummed).unwrap(),
            parse_address(&lower).unwrap()
        );
    }

    #[test]
    fn rejects_garbage_addresses() {
        assert!(parse_address("not-an-address").is_err());
        assert!(parse_address("0x1234").is_err());
    }
}
