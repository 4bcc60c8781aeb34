//! Application configuration loaded from environment variables.

use std::time::Duration;

use alloy_primitives::{utils::parse_ether, Address};

use crate::contract::CampaignParams;
use crate::errors::{DashboardError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Wallet provider JSON-RPC endpoint (e.g. a local Ganache on :7545)
    pub rpc_url: String,
    /// The crowdfunding contract address
    pub contract_address: Address,
    /// Chain id the dashboard expects the wallet to be on
    pub expected_chain_id: u64,
    /// Port for the HTTP server
    pub api_port: u16,
    /// Countdown scheduler period
    pub tick_interval: Duration,
    /// First block scanned for contract events
    pub history_start_block: u64,
    /// Maximum number of blocks covered by one `eth_getLogs` request
    pub log_block_range: u64,
    pub request_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub receipt_timeout: Duration,
    /// Constructor parameters used by deploy tooling
    pub campaign: CampaignParams,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            rpc_url: env_var("RPC_URL").unwrap_or_else(|_| "http://127.0.0.1:7545".to_string()),
            contract_address: env_var("CONTRACT_ADDRESS")
                .map_err(|_| {
                    DashboardError::Config(
                        "CONTRACT_ADDRESS environment variable is required".to_string(),
                    )
                })?
                .parse()
                .map_err(|_| DashboardError::Config("Invalid CONTRACT_ADDRESS".to_string()))?,
            expected_chain_id: parse_chain_id(
                &env_var("EXPECTED_CHAIN_ID").unwrap_or_else(|_| "1337".to_string()),
            )
            .ok_or_else(|| DashboardError::Config("Invalid EXPECTED_CHAIN_ID".to_string()))?,
            api_port: parse_or("API_PORT", 3000)?,
            tick_interval: interval_ms("TICK_INTERVAL_MS", 1000)?,
            history_start_block: parse_or("HISTORY_START_BLOCK", 0)?,
            log_block_range: parse_or::<u64>("LOG_BLOCK_RANGE", 5000)?.max(1),
            request_timeout: Duration::from_secs(parse_or("REQUEST_TIMEOUT_SECS", 30)?),
            receipt_poll_interval: interval_ms("RECEIPT_POLL_MS", 500)?,
            receipt_timeout: Duration::from_secs(parse_or("RECEIPT_TIMEOUT_SECS", 120)?),
            campaign: campaign_from_env()?,
        })
    }
}

/// Deployment parameters only; usable before a contract address exists.
pub fn campaign_from_env() -> Result<CampaignParams> {
    let goal_eth = env_var("CAMPAIGN_GOAL_ETH").unwrap_or_else(|_| "10".to_string());
    Ok(CampaignParams {
        goal_wei: parse_ether(goal_eth.trim())
            .map_err(|_| DashboardError::Config("Invalid CAMPAIGN_GOAL_ETH".to_string()))?,
        duration_minutes: parse_or("CAMPAIGN_DURATION_MINUTES", 2)?,
    })
}

/// Accepts both `1337` and `0x539`.
pub fn parse_chain_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

/// Millisecond period, never zero.
fn interval_ms(key: &str, default: u64) -> Result<Duration> {
    Ok(Duration::from_millis(parse_or::<u64>(key, default)?.max(1)))
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env_var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DashboardError::Config(format!("Invalid {key}"))),
        Err(_) => Ok(default),
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| DashboardError::Config(format!("Missing env var: {key}")))
}
