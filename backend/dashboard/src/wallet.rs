//! Wallet/network adapter: account access and chain selection.

use alloy_primitives::Address;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::errors::{DashboardError, Result};
use crate::rpc::{
    self, WalletProvider, METHOD_NOT_FOUND, METHOD_NOT_SUPPORTED, UNRECOGNIZED_CHAIN,
    USER_REJECTED,
};

/// Who is connected, and on which network. Only the explicit connect action
/// writes this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
}

fn is_unsupported(err: &DashboardError) -> bool {
    matches!(
        err,
        DashboardError::Rpc {
            code: METHOD_NOT_FOUND | METHOD_NOT_SUPPORTED,
            ..
        }
    )
}

fn map_rejection(err: DashboardError) -> DashboardError {
    match err {
        DashboardError::Rpc {
            code: USER_REJECTED,
            ..
        } => DashboardError::UserRejected,
        other => other,
    }
}

/// Ask the wallet for account access and return the selected account.
///
/// Wallets prompt on `eth_requestAccounts`; dev nodes that only know
/// `eth_accounts` are asked that instead.
pub async fn connect<P: WalletProvider + ?Sized>(provider: &P) -> Result<Address> {
    let accounts = match provider.request("eth_requestAccounts", json!([])).await {
        Err(e) if is_unsupported(&e) => provider.request("eth_accounts", json!([])).await,
        other => other,
    }
    .map_err(map_rejection)?;

    let accounts: Vec<Address> = serde_json::from_value(accounts)?;
    let account = accounts.into_iter().next().ok_or(DashboardError::UserRejected)?;
    info!("Wallet connected: {account}");
    Ok(account)
}

/// Make sure the wallet is on `expected`, asking it to switch if not.
pub async fn ensure_network<P: WalletProvider + ?Sized>(provider: &P, expected: u64) -> Result<()> {
    let current = rpc::chain_id(provider).await?;
    if current == expected {
        return Ok(());
    }

    warn!("Wallet is on chain {current:#x}, requesting switch to {expected:#x}");
    let switched = provider
        .request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": rpc::quantity(expected) }]),
        )
        .await;

    match switched {
        Ok(_) => {}
        Err(DashboardError::Rpc {
            code: UNRECOGNIZED_CHAIN,
            ..
        }) => return Err(DashboardError::NetworkUnknown(expected)),
        Err(e) if is_unsupported(&e) => {
            return Err(DashboardError::NetworkMismatch {
                expected,
                actual: current,
            })
        }
        Err(e) => return Err(map_rejection(e)),
    }

    let actual = rpc::chain_id(provider).await?;
    if actual != expected {
        return Err(DashboardError::NetworkMismatch { expected, actual });
    }
    info!("Switched wallet to chain {expected:#x}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockWallet, Reply};

    #[tokio::test]
    async fn connect_returns_first_account() {
        let wallet = MockWallet::new();
        let account = Address::repeat_byte(0x42);
        wallet.reply(
            "eth_requestAccounts",
            Reply::Ok(json!([account, Address::repeat_byte(0x43)])),
        );

        assert_eq!(connect(&wallet).await.unwrap(), account);
    }

    #[tokio::test]
    async fn connect_falls_back_to_eth_accounts() {
        let wallet = MockWallet::new();
        let account = Address::repeat_byte(0x01);
        wallet.reply(
            "eth_requestAccounts",
            Reply::Err(METHOD_NOT_FOUND, "method not found"),
        );
        wallet.reply("eth_accounts", Reply::Ok(json!([account])));

        assert_eq!(connect(&wallet).await.unwrap(), account);
        assert_eq!(wallet.methods(), vec!["eth_requestAccounts", "eth_accounts"]);
    }

    #[tokio::test]
    async fn dismissed_prompt_is_user_rejected() {
        let wallet = MockWallet::new();
        wallet.reply(
            "eth_requestAccounts",
            Reply::Err(USER_REJECTED, "User rejected the request."),
        );

        assert!(matches!(
            connect(&wallet).await,
            Err(DashboardError::UserRejected)
        ));
    }

    #[tokio::test]
    async fn no_accounts_is_user_rejected() {
        let wallet = MockWallet::new();
        wallet.reply("eth_requestAccounts", Reply::Ok(json!([])));

        assert!(matches!(
            connect(&wallet).await,
            Err(DashboardError::UserRejected)
        ));
    }

    #[tokio::test]
    async fn missing_wallet_is_provider_unavailable() {
        let wallet = MockWallet::new();
        wallet.reply("eth_requestAccounts", Reply::Unreachable);

        assert!(matches!(
            connect(&wallet).await,
            Err(DashboardError::ProviderUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn right_network_needs_no_switch() {
        let wallet = MockWallet::new();
        wallet.reply("eth_chainId", Reply::Ok(json!("0x539")));

        ensure_network(&wallet, 1337).await.unwrap();
        assert_eq!(wallet.methods(), vec!["eth_chainId"]);
    }

    #[tokio::test]
    async fn wrong_network_is_switched() {
        let wallet = MockWallet::new();
        wallet.reply_sequence(
            "eth_chainId",
            vec![Reply::Ok(json!("0x1")), Reply::Ok(json!("0x539"))],
        );
        wallet.reply("wallet_switchEthereumChain", Reply::Ok(json!(null)));

        ensure_network(&wallet, 1337).await.unwrap();
        let switch = wallet.params_of("wallet_switchEthereumChain").unwrap();
        assert_eq!(switch, json!([{ "chainId": "0x539" }]));
    }

    #[tokio::test]
    async fn unregistered_network_is_network_unknown() {
        let wallet = MockWallet::new();
        wallet.reply("eth_chainId", Reply::Ok(json!("0x1")));
        wallet.reply(
            "wallet_switchEthereumChain",
            Reply::Err(UNRECOGNIZED_CHAIN, "Unrecognized chain ID"),
        );

        assert!(matches!(
            ensure_network(&wallet, 1337).await,
            Err(DashboardError::NetworkUnknown(1337))
        ));
    }

    #[tokio::test]
    async fn node_without_switch_support_is_mismatch() {
        let wallet = MockWallet::new();
        wallet.reply("eth_chainId", Reply::Ok(json!("0x1")));
        wallet.reply(
            "wallet_switchEthereumChain",
            Reply::Err(METHOD_NOT_FOUND, "method not found"),
        );

        assert!(matches!(
            ensure_network(&wallet, 1337).await,
            Err(DashboardError::NetworkMismatch {
                expected: 1337,
                actual: 1
            })
        ));
    }
}
