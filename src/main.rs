// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use chainsentry::analyzer::honeypot::HoneypotDetector;
use chainsentry::analyzer::liquidity::LiquidityProbe;
use chainsentry::analyzer::token_info::TokenInfoReader;
use chainsentry::api;
use chainsentry::app::config::Settings;
use chainsentry::app::logging::setup_logging;
use chainsentry::app::proxy::install_global_proxy;
use chainsentry::common::error::AppError;
use chainsentry::data::db::Database;
use chainsentry::monitor::deploy_plugin::ContractDeploymentPlugin;
use chainsentry::monitor::follower::BlockFollower;
use chainsentry::monitor::mev::{MevDetector, MevOracle};
use chainsentry::monitor::pair_plugin::PairCreatedPlugin;
use chainsentry::monitor::plugin::PluginRegistry;
use chainsentry::monitor::transfer_plugin::{
    Erc20TransferPlugin, NativeTransferPlugin, TokenConfig, TransferMonitor,
};
use chainsentry::monitor::watchlist::WatchedAddresses;
use chainsentry::network::provider::ConnectionFactory;
use chainsentry::network::rpc::RpcClient;
use chainsentry::notify::{NotificationService, Notifier, PushPlusNotifier, ServerChanNotifier};
use chainsentry::scheduler::liquidity_scanner::LiquidityScanner;
use chainsentry::scheduler::safety_scanner::SafetyScanner;
use chainsentry::scheduler::run_periodic;
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Ethereum mainnet observability and triage pipeline")]
struct Cli {
    /// Path to config file (default: config.{toml,yaml,...})
    #[arg(long)]
    config: Option<String>,

    /// Override the head-poll interval in seconds
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Emit JSON-formatted logs
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Disable the read-only query API
    #[arg(long, default_value_t = false)]
    no_api: bool,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::load_with_path(cli.config.as_deref())?;
    setup_logging(if settings.debug { "debug" } else { "info" }, cli.json_logs);

    // Must happen before any HTTP/RPC client is constructed.
    if let Some(proxy) = settings.http_proxy.as_deref().filter(|p| !p.is_empty()) {
        install_global_proxy(proxy)?;
    }

    let db = Database::new(&settings.sqlite_url()).await?;
    info!(path = %settings.db_path, "Database ready");

    let rpc = Arc::new(RpcClient::new(
        &settings.http_rpc_url(),
        Duration::from_secs(settings.rpc_timeout_secs),
    )?);
    info!(endpoint = rpc.endpoint(), "RPC client ready");

    let watchlist = Arc::new(WatchedAddresses::from_entries(&settings.watched_addresses)?);
    info!(
        addresses = ?watchlist.describe(),
        "Watched-address set loaded"
    );

    let notifier: Option<Arc<dyn Notifier>> =
        if let Some(token) = settings.pushplus_token.as_deref().filter(|t| !t.is_empty()) {
            Some(Arc::new(PushPlusNotifier::new(token)?))
        } else if let Some(key) = settings.serverchan_key.as_deref().filter(|k| !k.is_empty()) {
            Some(Arc::new(ServerChanNotifier::new(key)?))
        } else {
            warn!("No notifier provider configured; running in audit-only mode");
            None
        };
    let notifications = Arc::new(NotificationService::new(db.clone(), notifier));

    let mev_oracle: Option<Arc<dyn MevOracle>> = if settings.mev_filter_enabled {
        Some(Arc::new(MevDetector::new(rpc.clone())))
    } else {
        None
    };

    // Plugin wiring; the registry is read-only once dispatch starts.
    let transfer_monitor = Arc::new(TransferMonitor::new(
        watchlist.clone(),
        notifications.clone(),
        mev_oracle,
        settings.eth_threshold,
    ));
    let token_reader = Arc::new(TokenInfoReader::new(rpc.clone()));

    let mut registry = PluginRegistry::new();
    registry.register_tx_plugin(Arc::new(NativeTransferPlugin::new(transfer_monitor.clone())));
    for entry in &settings.watched_tokens {
        let token = TokenConfig::from_entry(entry)?;
        info!(symbol = %token.symbol, address = %format!("{:#x}", token.address), "ERC-20 transfer plugin registered");
        registry.register_log_plugin(Arc::new(Erc20TransferPlugin::new(
            transfer_monitor.clone(),
            token,
        )));
    }
    if settings.pair_watch_enabled {
        registry.register_log_plugin(Arc::new(PairCreatedPlugin::new(db.clone())));
        info!("Uniswap V2 PairCreated plugin registered");
    }
    if settings.deployment_watch_enabled {
        registry.register_tx_receipt_plugin(Arc::new(ContractDeploymentPlugin::new(
            db.clone(),
            Some(token_reader.clone()),
            settings.analysis_worker_limit,
        )));
        info!("Contract deployment plugin registered");
    }
    let registry = Arc::new(registry);

    let shutdown = CancellationToken::new();

    // Task family 1: the block follower.
    let poll_interval = Duration::from_secs(cli.poll_interval.unwrap_or(settings.poll_interval_secs));
    let follower = BlockFollower::new(rpc.clone(), registry, poll_interval, shutdown.clone());
    let ws_url = settings.ws_rpc_url();
    let follower_handle = tokio::spawn(async move {
        match ws_url {
            Some(url) => match ConnectionFactory::ws(&url).await {
                Ok(ws) => follower.run_push(ws).await,
                Err(e) => {
                    warn!(error = %e, "WS connection failed; falling back to polling");
                    follower.run().await
                }
            },
            None => follower.run().await,
        }
    });

    // Task family 2: the liquidity scanner.
    let liquidity_scanner = Arc::new(LiquidityScanner::new(
        db.clone(),
        Arc::new(LiquidityProbe::new(rpc.clone(), settings.eth_price_usd)),
        token_reader.clone(),
        settings.min_liquidity_usd,
    ));
    let liquidity_handle = {
        let scanner = liquidity_scanner.clone();
        let shutdown = shutdown.clone();
        let interval = Duration::from_secs(settings.liquidity_scan_interval_secs);
        tokio::spawn(async move {
            run_periodic("liquidity-scan", interval, shutdown, move || {
                let scanner = scanner.clone();
                async move { scanner.run_once().await }
            })
            .await;
        })
    };

    // Task family 3: the safety scanner.
    let safety_scanner = Arc::new(SafetyScanner::new(
        db.clone(),
        Arc::new(HoneypotDetector::new(settings.goplus_api_key.clone())?),
        notifications.clone(),
    ));
    let safety_handle = {
        let scanner = safety_scanner.clone();
        let shutdown = shutdown.clone();
        let interval = Duration::from_secs(settings.safety_scan_interval_secs);
        tokio::spawn(async move {
            run_periodic("safety-scan", interval, shutdown, move || {
                let scanner = scanner.clone();
                async move { scanner.run_once().await }
            })
            .await;
        })
    };

    // Read-only projection.
    let api_handle = if settings.api_enabled && !cli.no_api {
        let app = api::create_router(db.clone());
        let addr = format!("{}:{}", settings.server_host, settings.server_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::Initialization(format!("API bind failed on {addr}: {e}")))?;
        info!(%addr, "Query API listening");
        let server_shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    server_shutdown.cancelled().await;
                })
                .await
            {
                tracing::error!(target: "api", error = %e, "Query API server error");
            }
        }))
    } else {
        None
    };

    shutdown_signal().await;
    info!("Initiating graceful shutdown");
    shutdown.cancel();

    let grace = Duration::from_secs(10);

    tokio::select! {
        _ = tokio::time::sleep(grace) => warn!(task = "block follower", "Shutdown timed out; detaching"),
        _ = follower_handle => info!(task = "block follower", "Shut down cleanly"),
    }
    tokio::select! {
        _ = tokio::time::sleep(grace) => warn!(task = "liquidity scanner", "Shutdown timed out; detaching"),
        _ = liquidity_handle => info!(task = "liquidity scanner", "Shut down cleanly"),
    }
    tokio::select! {
        _ = tokio::time::sleep(grace) => warn!(task = "safety scanner", "Shutdown timed out; detaching"),
        _ = safety_handle => info!(task = "safety scanner", "Shut down cleanly"),
    }
    if let Some(handle) = api_handle {
        tokio::select! {
            _ = tokio::time::sleep(grace) => warn!(task = "query api", "Shutdown timed out; detaching"),
            _ = handle => info!(task = "query api", "Shut down cleanly"),
        }
    }

    info!("All components stopped");
    Ok(())
}
