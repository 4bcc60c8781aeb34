//! Application-wide error types.

use thiserror::Error;

use crate::countdown::Phase;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// The wallet provider endpoint could not be reached at all.
    #[error("Wallet provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Request rejected by the user")]
    UserRejected,

    #[error("Network {0:#x} is not registered in the wallet")]
    NetworkUnknown(u64),

    #[error("Wrong network: expected {expected:#x}, wallet is on {actual:#x}")]
    NetworkMismatch { expected: u64, actual: u64 },

    /// One of the parallel contract reads failed.
    #[error("Failed to read `{getter}` from the contract: {reason}")]
    ReadFailure { getter: &'static str, reason: String },

    /// Submission reverted, ran out of gas, or was refused by the provider.
    #[error("Transaction rejected: {0}")]
    TxRejected(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("No wallet connected")]
    NotConnected,

    #[error("Campaign state has not been loaded")]
    NotLoaded,

    /// The action is closed in the campaign's current phase.
    #[error("Action not available while the campaign is {0:?}")]
    ActionUnavailable(Phase),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DashboardError {
    /// Attribute a failure to the getter it came from, keeping the
    /// provider's own text as the reason.
    pub fn into_read_failure(self, getter: &'static str) -> Self {
        match self {
            DashboardError::ReadFailure { .. } => self,
            other => DashboardError::ReadFailure {
                getter,
                reason: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
