//! Write side: donate, withdraw and refund transactions.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{utils::parse_ether, Address, Bytes, B256, U256};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::contract::{calldata, donateCall, refundCall, withdrawCall};
use crate::countdown::{Affordances, Phase};
use crate::errors::{DashboardError, Result};
use crate::rpc::{self, WalletProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Donate,
    Withdraw,
    Refund,
}

impl Action {
    pub fn pending_message(self) -> &'static str {
        match self {
            Action::Donate => "Processing donation...",
            Action::Withdraw => "Processing withdrawal...",
            Action::Refund => "Requesting refund...",
        }
    }

    pub fn enabled_in(self, affordances: Affordances) -> bool {
        match self {
            Action::Donate => affordances.donate,
            Action::Withdraw => affordances.withdraw,
            Action::Refund => affordances.refund,
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            Action::Donate => "Donation received!",
            Action::Withdraw => "Funds withdrawn successfully",
            Action::Refund => "Refund sent",
        }
    }
}

/// Turn a failed action into the message shown to the user.
///
/// Reverts are recognised by the word "revert" in the provider's error text.
/// That is approximate: an unrelated failure mentioning it gets the revert
/// message too.
pub fn translate_tx_error(action: Action, err: &DashboardError) -> String {
    match err {
        DashboardError::InvalidAmount(_) => return "Enter a valid amount".to_string(),
        DashboardError::NotConnected => return "Connect your wallet first".to_string(),
        DashboardError::NotLoaded => return "Could not load campaign data".to_string(),
        DashboardError::ActionUnavailable(phase) => {
            return match (action, phase) {
                (Action::Donate, _) => "Campaign closed",
                (_, Phase::Active) => "The campaign is still running",
                (Action::Withdraw, _) => "The goal was not reached",
                (Action::Refund, _) => "The goal was reached, refunds are not available",
            }
            .to_string()
        }
        _ => {}
    }

    let reverted = err.to_string().to_lowercase().contains("revert");
    match action {
        Action::Donate => "Transaction failed",
        Action::Withdraw if reverted => "Only the owner can withdraw",
        Action::Refund if reverted => "You have no balance to refund",
        Action::Withdraw | Action::Refund => "Operation rejected",
    }
    .to_string()
}

/// Validate a donation typed in ether and convert it to wei.
pub fn parse_donation(amount: &str) -> Result<U256> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(DashboardError::InvalidAmount("amount is required".to_string()));
    }
    if amount.starts_with('-') {
        return Err(DashboardError::InvalidAmount(format!(
            "{amount} is negative"
        )));
    }
    let wei = parse_ether(amount)
        .map_err(|e| DashboardError::InvalidAmount(format!("{amount}: {e}")))?;
    if wei.is_zero() {
        return Err(DashboardError::InvalidAmount(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(wei)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

fn into_tx_rejected(err: DashboardError) -> DashboardError {
    match err {
        DashboardError::ProviderUnavailable(_) | DashboardError::TxRejected(_) => err,
        other => DashboardError::TxRejected(other.to_string()),
    }
}

/// Hands transactions to the wallet and waits for them to be mined.
#[derive(Clone)]
pub struct TxSubmitter {
    provider: Arc<dyn WalletProvider>,
    contract: Address,
    poll_interval: Duration,
    timeout: Duration,
}

impl TxSubmitter {
    pub fn new(provider: Arc<dyn WalletProvider>, config: &Config) -> Self {
        Self::with_timing(
            provider,
            config.contract_address,
            config.receipt_poll_interval,
            config.receipt_timeout,
        )
    }

    pub fn with_timing(
        provider: Arc<dyn WalletProvider>,
        contract: Address,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            contract,
            poll_interval,
            timeout,
        }
    }

    /// Donate `amount` ether. Bad amounts are refused before anything is
    /// sent to the wallet.
    pub async fn donate(&self, from: Address, amount: &str) -> Result<TxReceipt> {
        let value = parse_donation(amount)?;
        self.submit(Action::Donate, from, calldata(&donateCall {}), value)
            .await
    }

    pub async fn withdraw(&self, from: Address) -> Result<TxReceipt> {
        self.submit(Action::Withdraw, from, calldata(&withdrawCall {}), U256::ZERO)
            .await
    }

    pub async fn refund(&self, from: Address) -> Result<TxReceipt> {
        self.submit(Action::Refund, from, calldata(&refundCall {}), U256::ZERO)
            .await
    }

    async fn submit(
        &self,
        action: Action,
        from: Address,
        data: Bytes,
        value: U256,
    ) -> Result<TxReceipt> {
        info!("{action:?}: sending from {from} with value {value} wei");

        let tx_hash = rpc::send_transaction(&*self.provider, from, self.contract, &data, value)
            .await
            .map_err(into_tx_rejected)?;

        let receipt =
            rpc::wait_for_receipt(&*self.provider, tx_hash, self.poll_interval, self.timeout)
                .await
                .map_err(into_tx_rejected)?;

        if receipt.status.map(|s| s.to::<u64>()) == Some(0) {
            warn!("{action:?}: transaction {tx_hash} reverted");
            return Err(DashboardError::TxRejected(format!(
                "transaction {tx_hash} reverted"
            )));
        }

        info!("{action:?}: transaction {tx_hash} mined");
        Ok(TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|b| b.to::<u64>()),
            gas_used: receipt.gas_used,
        })
    }
}
