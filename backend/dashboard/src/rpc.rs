//! JSON-RPC transport to the wallet provider, plus the typed Ethereum
//! methods the dashboard needs on top of it.
//!
//! Failures are surfaced once; nothing in this module retries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{DashboardError, Result};

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// EIP-1193 / MetaMask: the requested chain has not been added to the wallet.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Returned by some dev nodes for methods they know but do not support.
pub const METHOD_NOT_SUPPORTED: i64 = -32004;

/// Anything that answers EIP-1193 style requests.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Issue one request. A `null` result is returned as [`Value::Null`].
    async fn request(&self, method: &str, params: Value) -> Result<Value>;
}

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RpcError {
    /// Dev nodes put the revert reason either in `message` or in `data`.
    fn full_message(&self) -> String {
        match self.data.as_ref().and_then(|d| d.get("message").or(Some(d))) {
            Some(Value::String(extra)) if !self.message.contains(extra.as_str()) => {
                format!("{} ({extra})", self.message)
            }
            _ => self.message.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<U64>,
    pub log_index: Option<U64>,
    pub transaction_hash: Option<B256>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<U64>,
    /// `0x1` success, `0x0` revert.
    pub status: Option<U64>,
    pub gas_used: Option<U256>,
}

// ─────────────────────────────────────────────────────────
// HTTP provider
// ─────────────────────────────────────────────────────────

/// A wallet provider reached over HTTP (dev node with unlocked accounts, or a
/// wallet bridge exposing the same methods).
pub struct HttpProvider {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpProvider {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl WalletProvider for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    DashboardError::ProviderUnavailable(format!("{}: {e}", self.url))
                } else {
                    DashboardError::Http(e)
                }
            })?;

        let body: RpcResponse = response.json().await?;

        if let Some(err) = body.error {
            debug!("{method} failed with {}: {}", err.code, err.message);
            return Err(DashboardError::Rpc {
                code: err.code,
                message: err.full_message(),
            });
        }

        Ok(body.result.unwrap_or(Value::Null))
    }
}

// ─────────────────────────────────────────────────────────
// Typed methods
// ─────────────────────────────────────────────────────────

pub fn quantity(n: u64) -> String {
    format!("{n:#x}")
}

pub fn parse_quantity(value: &Value) -> Result<u64> {
    let raw = value
        .as_str()
        .ok_or_else(|| DashboardError::Decode(format!("expected hex quantity, got {value}")))?;
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| DashboardError::Decode(format!("quantity without 0x prefix: {raw}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| DashboardError::Decode(format!("bad quantity {raw}: {e}")))
}

pub async fn chain_id<P: WalletProvider + ?Sized>(provider: &P) -> Result<u64> {
    parse_quantity(&provider.request("eth_chainId", json!([])).await?)
}

pub async fn block_number<P: WalletProvider + ?Sized>(provider: &P) -> Result<u64> {
    parse_quantity(&provider.request("eth_blockNumber", json!([])).await?)
}

/// `eth_call` against the latest block.
pub async fn call<P: WalletProvider + ?Sized>(
    provider: &P,
    to: Address,
    data: &Bytes,
) -> Result<Bytes> {
    let result = provider
        .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
        .await?;
    Ok(serde_json::from_value(result)?)
}

/// Logs emitted by `address` whose first topic is `topic0`, in
/// `[from_block, to_block]` (both inclusive).
pub async fn get_logs<P: WalletProvider + ?Sized>(
    provider: &P,
    address: Address,
    topic0: B256,
    from_block: u64,
    to_block: u64,
) -> Result<Vec<RawLog>> {
    let result = provider
        .request(
            "eth_getLogs",
            json!([{
                "address": address,
                "topics": [topic0],
                "fromBlock": quantity(from_block),
                "toBlock": quantity(to_block),
            }]),
        )
        .await?;
    let logs: Vec<RawLog> = serde_json::from_value(result)?;
    debug!(
        "Fetched {} logs for topic {topic0} in blocks {from_block}..={to_block}",
        logs.len()
    );
    Ok(logs)
}

/// Hand an unsigned transaction to the wallet for signing and broadcast.
/// Returns the transaction hash.
pub async fn send_transaction<P: WalletProvider + ?Sized>(
    provider: &P,
    from: Address,
    to: Address,
    data: &Bytes,
    value: U256,
) -> Result<B256> {
    let mut tx = json!({ "from": from, "to": to, "data": data });
    if !value.is_zero() {
        tx["value"] = json!(format!("0x{value:x}"));
    }
    let result = provider.request("eth_sendTransaction", json!([tx])).await?;
    Ok(serde_json::from_value(result)?)
}

pub async fn get_receipt<P: WalletProvider + ?Sized>(
    provider: &P,
    tx_hash: B256,
) -> Result<Option<RawReceipt>> {
    let result = provider
        .request("eth_getTransactionReceipt", json!([tx_hash]))
        .await?;
    if result.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(result)?))
}

/// Poll for a receipt until it shows up or `timeout` elapses.
pub async fn wait_for_receipt<P: WalletProvider + ?Sized>(
    provider: &P,
    tx_hash: B256,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<RawReceipt> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(receipt) = get_receipt(provider, tx_hash).await? {
            return Ok(receipt);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(DashboardError::TxRejected(format!(
                "no receipt for {tx_hash} after {}s",
                timeout.as_secs()
            )));
        }
        tokio::time::sleep(poll_interval).await;
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
