//! Decoded contract events shown in the history lists.
//!
//! These mirror the three events of the crowdfunding contract:
//! `ContributionMade`, `GoalReached` and `RefundIssued`.

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::contract::{ContributionMade, GoalReached, RefundIssued};
use crate::rpc::RawLog;

/// A donation, in on-chain emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionEvent {
    pub donor: Address,
    pub amount: U256,
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: Option<B256>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    /// The owner collected the funds of a successful campaign (`GoalReached`).
    Withdrawal,
    /// A donor got their contribution back (`RefundIssued`).
    Refund,
}

/// Money leaving the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementEvent {
    pub kind: SettlementKind,
    /// `None` for withdrawals: `GoalReached` carries no address and the
    /// recipient is always the campaign owner.
    pub counterparty: Option<Address>,
    pub amount: U256,
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: Option<B256>,
}

fn position(raw: &RawLog) -> (u64, u64) {
    (
        raw.block_number.map(|b| b.to::<u64>()).unwrap_or(0),
        raw.log_index.map(|i| i.to::<u64>()).unwrap_or(0),
    )
}

fn decode<E: SolEvent>(raw: &RawLog, contract: Address) -> Option<E> {
    if raw.address != contract || raw.topics.first() != Some(&E::SIGNATURE_HASH) {
        return None;
    }
    match E::decode_raw_log(raw.topics.iter().copied(), &raw.data) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Skipping malformed {} log: {e}", E::SIGNATURE);
            None
        }
    }
}

/// Decode `ContributionMade` logs, preserving input order. Logs from other
/// contracts or with other signatures are dropped.
pub fn decode_contributions(raw: &[RawLog], contract: Address) -> Vec<ContributionEvent> {
    raw.iter()
        .filter_map(|log| {
            let event = decode::<ContributionMade>(log, contract)?;
            let (block_number, log_index) = position(log);
            Some(ContributionEvent {
                donor: event.donor,
                amount: event.amount,
                block_number,
                log_index,
                tx_hash: log.transaction_hash,
            })
        })
        .collect()
}

/// Decode `GoalReached` logs into withdrawals.
pub fn decode_withdrawals(raw: &[RawLog], contract: Address) -> Vec<SettlementEvent> {
    raw.iter()
        .filter_map(|log| {
            let event = decode::<GoalReached>(log, contract)?;
            let (block_number, log_index) = position(log);
            Some(SettlementEvent {
                kind: SettlementKind::Withdrawal,
                counterparty: None,
                amount: event.totalRaised,
                block_number,
                log_index,
                tx_hash: log.transaction_hash,
            })
        })
        .collect()
}

/// Decode `RefundIssued` logs into refunds.
pub fn decode_refunds(raw: &[RawLog], contract: Address) -> Vec<SettlementEvent> {
    raw.iter()
        .filter_map(|log| {
            let event = decode::<RefundIssued>(log, contract)?;
            let (block_number, log_index) = position(log);
            Some(SettlementEvent {
                kind: SettlementKind::Refund,
                counterparty: Some(event.recipient),
                amount: event.amount,
                block_number,
                log_index,
                tx_hash: log.transaction_hash,
            })
        })
        .collect()
}

/// Merge withdrawals and refunds, newest block first. Within a block the
/// input order (withdrawals, then refunds) is kept.
pub fn merge_settlements(
    withdrawals: Vec<SettlementEvent>,
    refunds: Vec<SettlementEvent>,
) -> Vec<SettlementEvent> {
    let mut all: Vec<_> = withdrawals.into_iter().chain(refunds).collect();
    all.sort_by(|a, b| b.block_number.cmp(&a.block_number));
    all
}
