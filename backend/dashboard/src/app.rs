//! Application state and the user actions that mutate it.
//!
//! Every failure is caught here, logged, and turned into a one-shot
//! notification. A failed load leaves the previously loaded data in place.

use std::collections::VecDeque;
use std::sync::Arc;

use alloy_primitives::U256;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::countdown::{
    evaluate, progress_percent, status_label, CampaignState, Countdown, Phase,
};
use crate::errors::{DashboardError, Result};
use crate::events::{ContributionEvent, SettlementEvent};
use crate::loader::{DataLoader, HistorySync};
use crate::render::{
    deadline_label, format_eth, render_contributions, render_settlements, CampaignView,
    DashboardView,
};
use crate::rpc::WalletProvider;
use crate::tx::{parse_donation, translate_tx_error, Action, TxReceipt, TxSubmitter};
use crate::wallet::{self, ConnectionState};

const MAX_PENDING_NOTIFICATIONS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }
}

pub fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// Everything the page is rendered from.
#[derive(Debug, Default)]
pub struct AppState {
    pub connection: ConnectionState,
    /// Last successfully loaded contract state.
    pub snapshot: Option<CampaignState>,
    pub your_contribution: Option<U256>,
    pub history: HistorySync,
    /// Last countdown evaluation, refreshed by the ticker.
    pub countdown: Option<Countdown>,
    notifications: VecDeque<Notification>,
}

impl AppState {
    /// State for a one-shot load, with nothing connected.
    pub fn with_snapshot(snapshot: CampaignState) -> Self {
        Self {
            snapshot: Some(snapshot),
            ..Self::default()
        }
    }

    pub fn notify(&mut self, notification: Notification) {
        if self.notifications.len() == MAX_PENDING_NOTIFICATIONS {
            self.notifications.pop_front();
        }
        self.notifications.push_back(notification);
    }

    /// Notifications are shown once.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    /// Re-evaluate the countdown from the cached snapshot. Returns the old and
    /// new phase when the phase changed.
    pub fn tick(&mut self, now: u64) -> Option<(Phase, Phase)> {
        let snapshot = self.snapshot?;
        let countdown = Countdown::compute(&snapshot, now);
        let previous = self.countdown.replace(countdown.clone())?.phase;
        (previous != countdown.phase).then_some((previous, countdown.phase))
    }

    pub fn view(&self) -> DashboardView {
        let campaign = match (&self.snapshot, &self.countdown) {
            (Some(snapshot), Some(countdown)) => Some(CampaignView {
                goal: format_eth(snapshot.goal),
                collected: format_eth(snapshot.collected),
                progress: progress_percent(snapshot.collected, snapshot.goal),
                status: status_label(snapshot.completed),
                deadline: deadline_label(snapshot.deadline),
                countdown: countdown.clone(),
                your_contribution: self.your_contribution.map(format_eth),
            }),
            _ => None,
        };

        DashboardView {
            account: self.connection.address,
            chain_id: self.connection.chain_id,
            campaign,
            donations: render_contributions(self.history.contributions()),
            settlements: render_settlements(&self.history.settlements()),
        }
    }
}

fn connect_error_message(err: &DashboardError) -> String {
    match err {
        DashboardError::ProviderUnavailable(_) => {
            "No wallet provider found. Install or start a wallet to use this dashboard".to_string()
        }
        DashboardError::UserRejected => "Wallet connection was rejected".to_string(),
        DashboardError::NetworkUnknown(id) => {
            format!("Network {id} not found. Add it to your wallet first")
        }
        DashboardError::NetworkMismatch { expected, .. } => {
            format!("Wrong network. Switch your wallet to chain {expected}")
        }
        _ => "Could not connect the wallet".to_string(),
    }
}

/// The dashboard: shared state plus the collaborators that read and write
/// the chain.
pub struct Dashboard {
    state: RwLock<AppState>,
    provider: Arc<dyn WalletProvider>,
    loader: DataLoader,
    submitter: TxSubmitter,
    expected_chain_id: u64,
}

impl Dashboard {
    pub fn new(provider: Arc<dyn WalletProvider>, config: &Config) -> Self {
        Self::from_parts(
            provider.clone(),
            DataLoader::new(provider.clone(), config),
            TxSubmitter::new(provider, config),
            config.expected_chain_id,
        )
    }

    pub fn from_parts(
        provider: Arc<dyn WalletProvider>,
        loader: DataLoader,
        submitter: TxSubmitter,
        expected_chain_id: u64,
    ) -> Self {
        Self {
            state: RwLock::new(AppState::default()),
            provider,
            loader,
            submitter,
            expected_chain_id,
        }
    }

    /// Switch network if needed, ask for the account, then load. A failed
    /// load after a successful connection keeps the account.
    pub async fn connect(&self) -> Notification {
        let note = match self.try_connect().await {
            Ok(()) => match self.reload().await {
                Ok(()) => Notification::success("Wallet connected"),
                Err(e) => {
                    error!("Loading contract data failed: {e}");
                    Notification::error("Could not load campaign data")
                }
            },
            Err(e) => {
                error!("Wallet connection failed: {e}");
                Notification::error(connect_error_message(&e))
            }
        };
        self.state.write().await.notify(note.clone());
        note
    }

    async fn try_connect(&self) -> Result<()> {
        wallet::ensure_network(&*self.provider, self.expected_chain_id).await?;
        let address = wallet::connect(&*self.provider).await?;
        self.state.write().await.connection = ConnectionState {
            address: Some(address),
            chain_id: Some(self.expected_chain_id),
        };
        Ok(())
    }

    /// Re-read contract state and pull any new events.
    pub async fn reload(&self) -> Result<()> {
        let snapshot = self.loader.load_state().await?;

        let (account, mut history) = {
            let state = self.state.read().await;
            (state.connection.address, state.history.clone())
        };

        let your_contribution = match account {
            Some(account) => match self.loader.load_contribution_of(account).await {
                Ok(amount) => Some(amount),
                Err(e) => {
                    warn!("Could not read contribution of {account}: {e}");
                    None
                }
            },
            None => None,
        };

        let history_result = history.refresh(&self.loader).await;

        let mut state = self.state.write().await;
        state.snapshot = Some(snapshot);
        state.your_contribution = your_contribution;
        state.tick(unix_now());
        match history_result {
            Ok(_) => state.history = history,
            Err(e) => error!("Could not load event history: {e}"),
        }
        Ok(())
    }

    /// Reload, turning a failure into a notification.
    pub async fn reload_or_notify(&self) {
        if let Err(e) = self.reload().await {
            error!("Loading contract data failed: {e}");
            self.state
                .write()
                .await
                .notify(Notification::error("Could not load campaign data"));
        }
    }

    async fn try_submit(&self, action: Action, amount: &str) -> Result<TxReceipt> {
        if action == Action::Donate {
            parse_donation(amount)?;
        }
        let (from, snapshot) = {
            let state = self.state.read().await;
            let from = state.connection.address.ok_or(DashboardError::NotConnected)?;
            (from, state.snapshot.ok_or(DashboardError::NotLoaded)?)
        };

        let phase = evaluate(&snapshot, unix_now());
        if !action.enabled_in(phase.affordances()) {
            return Err(DashboardError::ActionUnavailable(phase));
        }

        info!("{}", action.pending_message());
        match action {
            Action::Donate => self.submitter.donate(from, amount).await,
            Action::Withdraw => self.submitter.withdraw(from).await,
            Action::Refund => self.submitter.refund(from).await,
        }
    }

    /// Run one transaction. On success the whole state is reloaded.
    pub async fn submit(&self, action: Action, amount: &str) -> Notification {
        let note = match self.try_submit(action, amount).await {
            Ok(receipt) => {
                info!("{action:?} confirmed in {}", receipt.tx_hash);
                self.reload_or_notify().await;
                Notification::success(action.success_message())
            }
            Err(e) => {
                warn!("{action:?} failed: {e}");
                Notification::error(translate_tx_error(action, &e))
            }
        };
        self.state.write().await.notify(note.clone());
        note
    }

    pub async fn donate(&self, amount: &str) -> Notification {
        self.submit(Action::Donate, amount).await
    }

    pub async fn withdraw(&self) -> Notification {
        self.submit(Action::Withdraw, "").await
    }

    pub async fn refund(&self) -> Notification {
        self.submit(Action::Refund, "").await
    }

    pub async fn tick(&self, now: u64) -> Option<(Phase, Phase)> {
        self.state.write().await.tick(now)
    }

    pub async fn view(&self) -> DashboardView {
        self.state.read().await.view()
    }

    /// Last scanned block, contributions oldest first, settlements newest
    /// first.
    pub async fn history(&self) -> (Option<u64>, Vec<ContributionEvent>, Vec<SettlementEvent>) {
        let state = self.state.read().await;
        (
            state.history.scanned_to(),
            state.history.contributions().to_vec(),
            state.history.settlements(),
        )
    }

    pub async fn drain_notifications(&self) -> Vec<Notification> {
        self.state.write().await.drain_notifications()
    }
}
