use serde::{Deserialize, Serialize};

use crate::adapters::RiskTier;
use staking_evm_client::Address;

/// Yield aggregator response: one HTTP GET returning every pool it
/// tracks. Only the fields the fetcher filters on are deserialized.
#[derive(Debug, Deserialize)]
pub struct PoolsResponse {
    pub data: Vec<UpstreamPool>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpstreamPool {
    pub chain: String,
    pub project: String,
    pub symbol: String,
    #[serde(rename = "tvlUsd")]
    pub tvl_usd: f64,
    pub apy: Option<f64>,
}

/// One quoted staking opportunity after adapter filtering and risk
/// re-rating.
#[derive(Clone, Debug)]
pub struct PoolQuote {
    pub protocol: String,
    pub token: String,
    pub apy_percent: f64,
    pub tvl_formatted: String,
    pub tvl_usd: f64,
    pub risk: RiskTier,
    pub adapter_address: Address,
}

/// Outcome counts of one options synchronizer run, serialized into the
/// refresh job row for operators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct SyncSummary {
    pub skipped: bool,
    pub updated: u32,
    pub created: u32,
    pub deactivated: u32,
}

impl SyncSummary {
    pub fn skipped() -> Self {
        SyncSummary {
            skipped: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SlackNotificationData {
    pub channel: String,
    pub text: String,
}
