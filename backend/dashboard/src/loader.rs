//! Read side: contract getters and event history.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::{SolCall, SolEvent};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::contract::{
    calldata, collectedCall, completedCall, contributionsCall, deadlineCall, decode_return,
    goalCall, ContributionMade, GoalReached, RefundIssued,
};
use crate::countdown::CampaignState;
use crate::errors::Result;
use crate::events::{
    decode_contributions, decode_refunds, decode_withdrawals, merge_settlements,
    ContributionEvent, SettlementEvent,
};
use crate::rpc::{self, RawLog, WalletProvider};

/// Issues read-only queries against the deployed contract. Every call is a
/// fresh read; nothing is cached here.
#[derive(Clone)]
pub struct DataLoader {
    provider: Arc<dyn WalletProvider>,
    contract: Address,
    start_block: u64,
    block_range: u64,
}

impl DataLoader {
    pub fn new(provider: Arc<dyn WalletProvider>, config: &Config) -> Self {
        Self::with_range(
            provider,
            config.contract_address,
            config.history_start_block,
            config.log_block_range,
        )
    }

    pub fn with_range(
        provider: Arc<dyn WalletProvider>,
        contract: Address,
        start_block: u64,
        block_range: u64,
    ) -> Self {
        Self {
            provider,
            contract,
            start_block,
            block_range: block_range.max(1),
        }
    }

    async fn read<C: SolCall>(&self, call: C, getter: &'static str) -> Result<C::Return> {
        let raw = rpc::call(&*self.provider, self.contract, &calldata(&call))
            .await
            .map_err(|e| e.into_read_failure(getter))?;
        decode_return::<C>(&raw).map_err(|e| e.into_read_failure(getter))
    }

    /// The four campaign getters, issued concurrently. The first failure
    /// aborts the whole load.
    pub async fn load_state(&self) -> Result<CampaignState> {
        let (goal, collected, completed, deadline) = tokio::try_join!(
            self.read(goalCall {}, "goal"),
            self.read(collectedCall {}, "collected"),
            self.read(completedCall {}, "completed"),
            self.read(deadlineCall {}, "deadline"),
        )?;

        debug!("Loaded campaign: goal={goal} collected={collected} deadline={deadline}");
        Ok(CampaignState {
            goal,
            collected,
            deadline: deadline.saturating_to::<u64>(),
            completed,
        })
    }

    /// Amount `donor` currently has in the campaign.
    pub async fn load_contribution_of(&self, donor: Address) -> Result<U256> {
        self.read(contributionsCall { donor }, "contributions").await
    }

    pub async fn latest_block(&self) -> Result<u64> {
        rpc::block_number(&*self.provider).await
    }

    /// All `E` logs in `[from, to]`, fetched in windows of at most
    /// `block_range` blocks.
    async fn scan<E: SolEvent>(&self, from: u64, to: u64) -> Result<Vec<RawLog>> {
        let mut logs = Vec::new();
        let mut start = from;
        while start <= to {
            let end = start.saturating_add(self.block_range - 1).min(to);
            logs.extend(
                rpc::get_logs(&*self.provider, self.contract, E::SIGNATURE_HASH, start, end)
                    .await?,
            );
            match end.checked_add(1) {
                Some(next) => start = next,
                None => break,
            }
        }
        Ok(logs)
    }

    async fn contributions_between(&self, from: u64, to: u64) -> Result<Vec<ContributionEvent>> {
        let raw = self.scan::<ContributionMade>(from, to).await?;
        Ok(decode_contributions(&raw, self.contract))
    }

    async fn settlements_between(
        &self,
        from: u64,
        to: u64,
    ) -> Result<(Vec<SettlementEvent>, Vec<SettlementEvent>)> {
        let (withdrawals, refunds) = tokio::try_join!(
            self.scan::<GoalReached>(from, to),
            self.scan::<RefundIssued>(from, to),
        )?;
        Ok((
            decode_withdrawals(&withdrawals, self.contract),
            decode_refunds(&refunds, self.contract),
        ))
    }

    /// Every donation since the start block, oldest first.
    pub async fn load_contribution_history(&self) -> Result<Vec<ContributionEvent>> {
        let latest = self.latest_block().await?;
        self.contributions_between(self.start_block, latest).await
    }

    /// Every withdrawal and refund since the start block, newest block first.
    pub async fn load_settlement_history(&self) -> Result<Vec<SettlementEvent>> {
        let latest = self.latest_block().await?;
        let (withdrawals, refunds) = self.settlements_between(self.start_block, latest).await?;
        Ok(merge_settlements(withdrawals, refunds))
    }
}

/// Event history kept across reloads so each reload only asks for blocks it
/// has not seen yet. Lives in memory only.
#[derive(Debug, Clone, Default)]
pub struct HistorySync {
    scanned_to: Option<u64>,
    contributions: Vec<ContributionEvent>,
    withdrawals: Vec<SettlementEvent>,
    refunds: Vec<SettlementEvent>,
}

impl HistorySync {
    /// Pull logs for the blocks after the last scan. Returns `true` when new
    /// events arrived. On error nothing is changed.
    pub async fn refresh(&mut self, loader: &DataLoader) -> Result<bool> {
        let latest = loader.latest_block().await?;

        let (from, reset) = match self.scanned_to {
            Some(scanned) if latest < scanned => {
                warn!("Chain head went back from {scanned} to {latest}, rescanning history");
                (loader.start_block, true)
            }
            Some(scanned) if latest == scanned => return Ok(false),
            Some(scanned) => ((scanned + 1).max(loader.start_block), false),
            None => (loader.start_block, false),
        };

        let (contributions, (withdrawals, refunds)) = tokio::try_join!(
            loader.contributions_between(from, latest),
            loader.settlements_between(from, latest),
        )?;

        if reset {
            *self = Self::default();
        }

        let fresh = contributions.len() + withdrawals.len() + refunds.len();
        if fresh > 0 {
            info!("History: {fresh} new events in blocks {from}..={latest}");
        }

        self.contributions.extend(contributions);
        self.withdrawals.extend(withdrawals);
        self.refunds.extend(refunds);
        self.scanned_to = Some(latest);
        Ok(fresh > 0)
    }

    pub fn scanned_to(&self) -> Option<u64> {
        self.scanned_to
    }

    /// Emission order, oldest first.
    pub fn contributions(&self) -> &[ContributionEvent] {
        &self.contributions
    }

    /// Newest block first, withdrawals before refunds within a block.
    pub fn settlements(&self) -> Vec<SettlementEvent> {
        merge_settlements(self.withdrawals.clone(), self.refunds.clone())
    }
}
