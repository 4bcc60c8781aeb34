//! CrowdChain dashboard entry point.
//!
//! Talks to a wallet provider over JSON-RPC, keeps the crowdfunding
//! contract's state and event history in memory, and serves the dashboard
//! page plus a small JSON API. A background task re-evaluates the deadline
//! countdown every tick.

mod api;
mod app;
mod config;
mod contract;
mod countdown;
mod errors;
mod events;
mod loader;
mod render;
mod rpc;
mod ticker;
mod tx;
mod wallet;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::{unix_now, AppState, Dashboard};
use config::Config;
use loader::DataLoader;
use rpc::{HttpProvider, WalletProvider};

#[derive(Parser, Debug)]
#[command(name = "crowdchain")]
#[command(about = "Dashboard for a single crowdfunding contract", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serves the dashboard (default).
    Serve,
    /// Loads the campaign once and prints it.
    Status,
    /// Prints the ABI-encoded constructor arguments for a deployment.
    ConstructorArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Some(Commands::ConstructorArgs) = cli.command {
        let params = config::campaign_from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("0x{}", hex::encode(params.constructor_args()));
        return Ok(());
    }

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let client = Client::builder().timeout(config.request_timeout).build()?;
    let provider: Arc<dyn WalletProvider> = Arc::new(HttpProvider::new(client, &config.rpc_url));

    match cli.command {
        Some(Commands::Status) => status(provider, &config).await,
        _ => serve(provider, config).await,
    }
}

async fn status(provider: Arc<dyn WalletProvider>, config: &Config) -> anyhow::Result<()> {
    let loader = DataLoader::new(provider, config);

    let mut state = AppState::with_snapshot(loader.load_state().await?);
    state.tick(unix_now());

    let mut view = state.view();
    view.donations = render::render_contributions(&loader.load_contribution_history().await?);
    view.settlements = render::render_settlements(&loader.load_settlement_history().await?);

    print!("{}", render::render_text(&view));
    Ok(())
}

async fn serve(provider: Arc<dyn WalletProvider>, config: Config) -> anyhow::Result<()> {
    info!(
        "Contract {} on chain {} via {}",
        config.contract_address, config.expected_chain_id, config.rpc_url
    );
    info!(
        "Deployment parameters: goal {} wei, {} minutes",
        config.campaign.goal_wei, config.campaign.duration_minutes
    );

    let dashboard = Arc::new(Dashboard::new(provider, &config));
    let shutdown = CancellationToken::new();

    // ─── Countdown scheduler ──────────────────────────────
    let ticker = tokio::spawn(ticker::run(
        dashboard.clone(),
        config.tick_interval,
        shutdown.clone(),
    ));

    // ─── HTTP server ──────────────────────────────────────
    let app = api::router(api::ApiState { dashboard });

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("Dashboard listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let stop = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
            stop.cancel();
        })
        .await?;

    shutdown.cancel();
    ticker.await?;
    Ok(())
}
