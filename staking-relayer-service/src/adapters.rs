use staking_evm_client::Address;
use std::collections::HashMap;
use std::str::FromStr;
use strum_macros::{Display, EnumString};
use tracing::{info, warn};

use crate::config::Config;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum AdapterKind {
    LiquidStaking,
    Lending,
    Dex,
}

/// One adapter entry that passed configuration validation: its address
/// parsed and is non-zero.
#[derive(Clone, Debug)]
pub struct ConfiguredAdapter {
    pub protocol: String,
    pub protocol_id: String,
    pub adapter: Address,
    pub kind: AdapterKind,
    pub market_chain: String,
    pub derivative_symbol: Option<String>,
    pub supported_tokens: Vec<String>,
    pub base_risk: RiskTier,
}

/// Off-chain source of truth for which (protocol, token) combinations are
/// currently backed by a deployed adapter. Built once from the immutable
/// startup configuration; callers capture the entry set once per sync
/// pass.
pub struct AdapterRegistry {
    entries: Vec<ConfiguredAdapter>,
    protocol_by_adapter: HashMap<String, String>,
}

impl AdapterRegistry {
    pub fn from_config(config: &Config) -> Self {
        let mut entries = Vec::new();
        for entry in &config.adapters {
            let adapter = match entry.adapter_address.parse::<Address>() {
                Ok(address) => address,
                Err(error) => {
                    warn!(
                        "Skipping adapter {} with unparseable address {}: {error}",
                        entry.protocol, entry.adapter_address
                    );
                    continue;
                }
            };
            if adapter.is_zero() {
                warn!("Skipping adapter {} with zero address", entry.protocol);
                continue;
            }
            let kind = match AdapterKind::from_str(&entry.kind) {
                Ok(kind) => kind,
                Err(_) => {
                    warn!("Skipping adapter {} with unknown kind {}", entry.protocol, entry.kind);
                    continue;
                }
            };
            let base_risk = match RiskTier::from_str(&entry.base_risk) {
                Ok(tier) => tier,
                Err(_) => {
                    warn!(
                        "Adapter {} has unknown base risk {}, defaulting to Medium",
                        entry.protocol, entry.base_risk
                    );
                    RiskTier::Medium
                }
            };
            entries.push(ConfiguredAdapter {
                protocol: entry.protocol.to_owned(),
                protocol_id: entry.protocol_id.to_owned(),
                adapter,
                kind,
                market_chain: entry.market_chain.to_owned(),
                derivative_symbol: entry.derivative_symbol.to_owned(),
                supported_tokens: entry.supported_tokens.to_owned(),
                base_risk,
            });
        }

        if entries.is_empty() {
            warn!("No adapters configured! Option refreshes will be skipped until some are.");
        } else {
            let protocols: Vec<&str> = entries.iter().map(|e| e.protocol.as_str()).collect();
            info!("Configured {} adapters: {}", entries.len(), protocols.join(", "));
        }

        let protocol_by_adapter = entries
            .iter()
            .map(|e| (e.adapter.to_string().to_lowercase(), e.protocol.to_owned()))
            .collect();

        Self {
            entries,
            protocol_by_adapter,
        }
    }

    pub fn configured(&self) -> &[ConfiguredAdapter] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_supported(&self, protocol: &str, token: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.protocol == protocol && e.supported_tokens.iter().any(|t| t == token))
    }

    /// Resolves an adapter address (as it arrived in an event payload) to
    /// its protocol display name.
    pub fn protocol_for(&self, adapter_address: &str) -> Option<&str> {
        self.protocol_by_adapter
            .get(&adapter_address.to_lowercase())
            .map(String::as_str)
    }
}

/// Deterministic re-rating of a protocol's base risk tier from pool TVL.
/// Thin pools escalate one step toward High; very deep pools pull Medium
/// back down to Low.
pub fn risk_for(base: RiskTier, tvl_usd: f64) -> RiskTier {
    if tvl_usd < 1_000_000.0 {
        return match base {
            RiskTier::Low => RiskTier::Medium,
            RiskTier::Medium | RiskTier::High => RiskTier::High,
        };
    }
    if tvl_usd > 100_000_000.0 && base == RiskTier::Medium {
        return RiskTier::Low;
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterEntry;

    fn entry(protocol: &str, address: &str) -> AdapterEntry {
        AdapterEntry {
            protocol: protocol.to_owned(),
            protocol_id: protocol.to_lowercase(),
            adapter_address: address.to_owned(),
            kind: "lending".to_owned(),
            market_chain: "Ethereum".to_owned(),
            derivative_symbol: None,
            supported_tokens: vec!["WETH".to_owned(), "WBTC".to_owned()],
            base_risk: "Low".to_owned(),
        }
    }

    fn config_with(adapters: Vec<AdapterEntry>) -> Config {
        Config {
            rust_log: "warn".to_owned(),
            relayer_service_log: "info".to_owned(),
            database_url: "postgres://localhost/staking".to_owned(),
            sqlx_max_connections: 5,
            sqlx_min_connections: None,
            sqlx_connect_timeout: None,
            sqlx_idle_timeout: None,
            sqlx_max_lifetime: None,
            sqlx_logging: None,
            relayer_sqlx_logging_level: "info".to_owned(),
            rpc_ws_url: "ws://127.0.0.1:8545".to_owned(),
            router_address: "0xd965b8FA53a1b33B19079b9e998F4A928354B826".to_owned(),
            active_network: "sepolia".to_owned(),
            market_data_url: "https://yields.llama.fi/pools".to_owned(),
            market_data_timeout_secs: None,
            options_sync_interval_secs: None,
            watcher_reconnect_secs: None,
            job_poll_interval_millis: None,
            job_batch_size: None,
            job_max_attempts: None,
            job_backoff_base_secs: None,
            completed_job_retention_secs: None,
            slack_notification: false,
            slack_webhook_url: None,
            slack_channel_id: None,
            native_token_symbol: None,
            adapters,
            tokens: vec![],
        }
    }

    #[test]
    fn risk_escalates_one_step_under_thin_tvl() {
        assert_eq!(risk_for(RiskTier::Low, 500_000.0), RiskTier::Medium);
        assert_eq!(risk_for(RiskTier::Medium, 500_000.0), RiskTier::High);
        assert_eq!(risk_for(RiskTier::High, 50.0), RiskTier::High);
    }

    #[test]
    fn deep_tvl_only_lowers_medium() {
        assert_eq!(risk_for(RiskTier::Medium, 150_000_000.0), RiskTier::Low);
        assert_eq!(risk_for(RiskTier::Low, 150_000_000.0), RiskTier::Low);
        assert_eq!(risk_for(RiskTier::High, 150_000_000.0), RiskTier::High);
    }

    #[test]
    fn mid_range_tvl_keeps_base_tier() {
        assert_eq!(risk_for(RiskTier::Medium, 50_000_000.0), RiskTier::Medium);
        assert_eq!(risk_for(RiskTier::Low, 2_000_000.0), RiskTier::Low);
    }

    #[test]
    fn zero_address_adapters_are_excluded() {
        let config = config_with(vec![
            entry("Aave V3", "0x33632938cE371c1e294E5ba5658eb9E02a47Cf2f"),
            entry("Lido", "0x0000000000000000000000000000000000000000"),
            entry("Broken", "not-an-address"),
        ]);
        let registry = AdapterRegistry::from_config(&config);
        assert_eq!(registry.configured().len(), 1);
        assert_eq!(registry.configured()[0].protocol, "Aave V3");
        assert!(registry.is_supported("Aave V3", "WETH"));
        assert!(!registry.is_supported("Lido", "WETH"));
    }

    #[test]
    fn protocol_lookup_ignores_address_case() {
        let config = config_with(vec![entry(
            "Aave V3",
            "0x33632938cE371c1e294E5ba5658eb9E02a47Cf2f",
        )]);
        let registry = AdapterRegistry::from_config(&config);
        assert_eq!(
            registry.protocol_for("0x33632938ce371c1e294e5ba5658eb9e02a47cf2f"),
            Some("Aave V3")
        );
        assert_eq!(
            registry.protocol_for("0x33632938CE371C1E294E5BA5658EB9E02A47CF2F"),
            Some("Aave V3")
        );
        assert_eq!(registry.protocol_for("0x0000000000000000000000000000000000000001"), None);
    }
}
