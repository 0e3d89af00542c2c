//! Momentum volume bot: entry point.
//!
//! Loads configuration, initialises structured logging, derives the
//! signing identity, wires the ledger client and pool protocol into a
//! `RunController`, and runs until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use momentum_bot::config::AppConfig;
use momentum_bot::engine::controller::{RunController, StartResult};
use momentum_bot::engine::events::{log_event, EventBus};
use momentum_bot::keys::SigningIdentity;
use momentum_bot::ledger::rpc::SuiRpcClient;
use momentum_bot::ledger::LedgerClient;
use momentum_bot::pool::momentum::MomentumClmm;
use momentum_bot::pool::PoolProtocol;

const BANNER: &str = r#"
 __  __  ___  __  __ _____ _   _ _____ _   _ __  __
|  \/  |/ _ \|  \/  | ____| \ | |_   _| | | |  \/  |
| |\/| | | | | |\/| |  _| |  \| | | | | | | | |\/| |
| |  | | |_| | |  | | |___| |\  | | | | |_| | |  | |
|_|  |_|\___/|_|  |_|_____|_| \_| |_|  \___/|_|  |_|

  CLMM volume bot for Sui
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load_default()?;

    init_logging();

    println!("{BANNER}");
    info!(
        bot_name = %cfg.bot.name,
        network = %cfg.network.network,
        pool = %cfg.pool.pool_id,
        base = %cfg.trade.base_token,
        quote = %cfg.trade.quote_token,
        amount = %cfg.trade.amount,
        interval_secs = cfg.bot.swap_interval_secs,
        "Momentum bot starting up"
    );

    // -- Initialise components -------------------------------------------

    let identity = Arc::new(
        SigningIdentity::load(&cfg.private_key()?).context("Failed to load signing key")?,
    );
    info!(address = %identity.address(), "Wallet loaded");

    let trading = cfg.trading_configuration()?;
    let ledger: Arc<dyn LedgerClient> =
        Arc::new(SuiRpcClient::new(&trading.rpc_url, cfg.request_timeout())?);
    info!(rpc = %trading.rpc_url, "Connected to Sui RPC");

    let pool: Arc<dyn PoolProtocol> = Arc::new(MomentumClmm::new(
        &cfg.pool.clmm_package_id,
        &cfg.pool.global_config,
    ));

    let events = EventBus::new();
    let renderer = spawn_event_renderer(&events);

    let controller = Arc::new(RunController::new(
        trading,
        identity,
        ledger,
        pool,
        events,
        cfg.controller_settings(),
    ));

    // -- Run -------------------------------------------------------------

    match controller.start().await {
        StartResult::Started => {}
        StartResult::PreflightFailed(reason) => {
            error!(reason = %reason, "Bot did not start");
            drain(renderer).await;
            std::process::exit(1);
        }
        other => {
            error!(result = ?other, "Unexpected start result");
            drain(renderer).await;
            std::process::exit(1);
        }
    }

    info!("Bot running. Press Ctrl+C to stop.");
    shutdown_signal().await;
    info!("Shutdown signal received.");

    controller.stop().await;
    drop(controller);
    drain(renderer).await;

    info!("Momentum bot shut down cleanly.");
    Ok(())
}

/// Forward every engine event to the log until the bus closes.
fn spawn_event_renderer(events: &EventBus) -> tokio::task::JoinHandle<()> {
    use tokio::sync::broadcast::error::RecvError;

    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(missed)) => warn!(missed, "Event renderer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Give the renderer a moment to flush the final events.
async fn drain(renderer: tokio::task::JoinHandle<()>) {
    let _ = tokio::time::timeout(std::time::Duration::from_millis(500), renderer).await;
}

/// Resolve on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("momentum_bot=info"));

    let json_logging = std::env::var("MOMENTUM_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
