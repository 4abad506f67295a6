use std::collections::HashMap;

use tracing::{info, warn};

use crate::adapters::{risk_for, AdapterKind, ConfiguredAdapter};
use crate::config::Config;
use crate::dto::{PoolQuote, PoolsResponse, UpstreamPool};

/// Minimum TVL for a DEX pool to be considered at all; thin pools quote
/// meaningless APYs.
const DEX_TVL_FLOOR_USD: f64 = 1_000_000.0;

/// Fetches the upstream pool list once and reduces it to one quote per
/// supported (protocol, token) pair. Any upstream failure degrades to an
/// empty map: no update this cycle, never a reason to deactivate the
/// catalog.
pub async fn fetch_all(
    client: &reqwest::Client,
    config: &Config,
    adapters: &[ConfiguredAdapter],
) -> HashMap<String, Vec<PoolQuote>> {
    info!("Fetching yields from {}", config.market_data_url);

    let response = match client
        .get(&config.market_data_url)
        .timeout(config.market_data_timeout())
        .send()
        .await
    {
        Ok(response) => match response.error_for_status() {
            Ok(response) => response,
            Err(error) => {
                warn!("Market data request bad status: {:?}", error);
                return HashMap::new();
            }
        },
        Err(error) => {
            warn!("Market data request failed: {:?}", error);
            return HashMap::new();
        }
    };

    let pools = match response.json::<PoolsResponse>().await {
        Ok(body) => body.data,
        Err(error) => {
            warn!("Could not parse market data payload: {:?}", error);
            return HashMap::new();
        }
    };

    let quotes = select_all(&pools, adapters);
    info!(
        "Market data pass produced quotes for {} tokens from {} upstream pools",
        quotes.len(),
        pools.len()
    );
    quotes
}

/// Pure reduction of the upstream pool list, separated from the network
/// call so selection rules are testable with canned payloads.
pub fn select_all(
    pools: &[UpstreamPool],
    adapters: &[ConfiguredAdapter],
) -> HashMap<String, Vec<PoolQuote>> {
    let mut quotes: HashMap<String, Vec<PoolQuote>> = HashMap::new();
    for adapter in adapters {
        let candidates: Vec<&UpstreamPool> = pools
            .iter()
            .filter(|p| p.project == adapter.protocol_id && p.chain == adapter.market_chain)
            .collect();
        for token in &adapter.supported_tokens {
            let selected = match adapter.kind {
                AdapterKind::LiquidStaking => select_derivative(&candidates, adapter),
                AdapterKind::Lending => select_exact(&candidates, token),
                AdapterKind::Dex => select_deepest(&candidates, token),
            };
            let Some(pool) = selected else {
                continue;
            };
            quotes.entry(token.to_owned()).or_default().push(PoolQuote {
                protocol: adapter.protocol.to_owned(),
                token: token.to_owned(),
                apy_percent: pool.apy.unwrap_or(0.0),
                tvl_formatted: format_tvl(pool.tvl_usd),
                tvl_usd: pool.tvl_usd,
                risk: risk_for(adapter.base_risk, pool.tvl_usd),
                adapter_address: adapter.adapter,
            });
        }
    }
    quotes
}

/// Liquid-staking protocols quote through their derivative token (stETH
/// and friends), not the staked asset itself.
fn select_derivative<'a>(
    candidates: &[&'a UpstreamPool],
    adapter: &ConfiguredAdapter,
) -> Option<&'a UpstreamPool> {
    let derivative = adapter.derivative_symbol.as_deref()?;
    candidates.iter().find(|p| p.symbol == derivative).copied()
}

fn select_exact<'a>(candidates: &[&'a UpstreamPool], token: &str) -> Option<&'a UpstreamPool> {
    candidates.iter().find(|p| p.symbol == token).copied()
}

/// DEX projects list thousands of pools per token; take the deepest one
/// above the TVL floor. Equal-TVL ties keep the first pool encountered.
fn select_deepest<'a>(candidates: &[&'a UpstreamPool], token: &str) -> Option<&'a UpstreamPool> {
    candidates
        .iter()
        .filter(|p| p.symbol.contains(token) && p.tvl_usd > DEX_TVL_FLOOR_USD)
        .copied()
        .fold(None, |best: Option<&UpstreamPool>, p| match best {
            Some(b) if b.tvl_usd >= p.tvl_usd => Some(b),
            _ => Some(p),
        })
}

pub fn format_tvl(tvl_usd: f64) -> String {
    if tvl_usd >= 1e9 {
        format!("${:.2}B", tvl_usd / 1e9)
    } else if tvl_usd >= 1e6 {
        format!("${:.2}M", tvl_usd / 1e6)
    } else {
        format!("${:.0}", tvl_usd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RiskTier;

    fn pool(project: &str, chain: &str, symbol: &str, tvl_usd: f64, apy: f64) -> UpstreamPool {
        UpstreamPool {
            chain: chain.to_owned(),
            project: project.to_owned(),
            symbol: symbol.to_owned(),
            tvl_usd,
            apy: Some(apy),
        }
    }

    fn adapter(
        protocol: &str,
        protocol_id: &str,
        kind: AdapterKind,
        derivative: Option<&str>,
        tokens: &[&str],
        base_risk: RiskTier,
    ) -> ConfiguredAdapter {
        ConfiguredAdapter {
            protocol: protocol.to_owned(),
            protocol_id: protocol_id.to_owned(),
            adapter: "0x33632938cE371c1e294E5ba5658eb9E02a47Cf2f".parse().unwrap(),
            kind,
            market_chain: "Ethereum".to_owned(),
            derivative_symbol: derivative.map(str::to_owned),
            supported_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            base_risk,
        }
    }

    #[test]
    fn liquid_staking_selects_the_derivative_symbol() {
        let pools = vec![
            pool("lido", "Ethereum", "STETH", 2.4e10, 3.1),
            pool("lido", "Ethereum", "WSTETH", 1.0e9, 3.0),
        ];
        let adapters = vec![adapter(
            "Lido",
            "lido",
            AdapterKind::LiquidStaking,
            Some("STETH"),
            &["WETH"],
            RiskTier::Low,
        )];
        let quotes = select_all(&pools, &adapters);
        let weth = &quotes["WETH"];
        assert_eq!(weth.len(), 1);
        assert_eq!(weth[0].protocol, "Lido");
        assert_eq!(weth[0].apy_percent, 3.1);
        assert_eq!(weth[0].tvl_formatted, "$24.00B");
    }

    #[test]
    fn lending_requires_an_exact_symbol_match() {
        let pools = vec![
            pool("aave-v3", "Ethereum", "WETH", 5.0e9, 2.0),
            pool("aave-v3", "Ethereum", "WBTC-WETH", 9.9e9, 9.0),
        ];
        let adapters = vec![adapter(
            "Aave V3",
            "aave-v3",
            AdapterKind::Lending,
            None,
            &["WETH", "WBTC"],
            RiskTier::Low,
        )];
        let quotes = select_all(&pools, &adapters);
        assert_eq!(quotes["WETH"].len(), 1);
        assert_eq!(quotes["WETH"][0].apy_percent, 2.0);
        assert!(quotes.get("WBTC").is_none());
    }

    #[test]
    fn dex_selection_takes_the_deepest_pool_above_the_floor() {
        let pools = vec![
            pool("uniswap-v3", "Ethereum", "USDC-WETH", 4.0e8, 12.0),
            pool("uniswap-v3", "Ethereum", "WBTC-WETH", 6.0e8, 8.0),
            pool("uniswap-v3", "Ethereum", "DAI-WETH", 900_000.0, 45.0),
        ];
        let adapters = vec![adapter(
            "Uniswap V3",
            "uniswap-v3",
            AdapterKind::Dex,
            None,
            &["WETH"],
            RiskTier::Medium,
        )];
        let quotes = select_all(&pools, &adapters);
        let weth = &quotes["WETH"];
        assert_eq!(weth.len(), 1);
        // the 45% APY pool sits under the $1M floor, the deepest of the
        // rest wins
        assert_eq!(weth[0].apy_percent, 8.0);
        assert_eq!(weth[0].risk, RiskTier::Low); // Medium re-rated down at $600M
    }

    #[test]
    fn dex_selection_skips_tokens_with_no_qualifying_pool() {
        let pools = vec![pool("uniswap-v3", "Ethereum", "USDC-WETH", 500_000.0, 30.0)];
        let adapters = vec![adapter(
            "Uniswap V3",
            "uniswap-v3",
            AdapterKind::Dex,
            None,
            &["WETH"],
            RiskTier::Medium,
        )];
        assert!(select_all(&pools, &adapters).is_empty());
    }

    #[test]
    fn other_chains_are_filtered_out() {
        let pools = vec![pool("aave-v3", "Polygon", "WETH", 5.0e9, 2.0)];
        let adapters = vec![adapter(
            "Aave V3",
            "aave-v3",
            AdapterKind::Lending,
            None,
            &["WETH"],
            RiskTier::Low,
        )];
        assert!(select_all(&pools, &adapters).is_empty());
    }

    #[test]
    fn thin_pools_escalate_risk() {
        let pools = vec![pool("aave-v3", "Ethereum", "WBTC", 800_000.0, 1.2)];
        let adapters = vec![adapter(
            "Aave V3",
            "aave-v3",
            AdapterKind::Lending,
            None,
            &["WBTC"],
            RiskTier::Low,
        )];
        let quotes = select_all(&pools, &adapters);
        assert_eq!(quotes["WBTC"][0].risk, RiskTier::Medium);
    }

    #[test]
    fn tvl_formatting_buckets() {
        assert_eq!(format_tvl(1.2e9), "$1.20B");
        assert_eq!(format_tvl(34_500_000.0), "$34.50M");
        assert_eq!(format_tvl(999_999.0), "$999999");
    }
}
