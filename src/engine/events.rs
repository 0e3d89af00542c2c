//! Structured engine events.
//!
//! The engine never formats console output itself. It publishes
//! `SwapEvent`s on a broadcast channel and whoever subscribes decides how
//! to present them; `log_event` is the `tracing` renderer the binary uses.

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::types::{RouteTaken, RunStatistics, SwapDirection, SwapOutcome, WalletSnapshot};

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SwapEvent {
    Started {
        address: String,
        network: String,
        pool_id: String,
        direction: SwapDirection,
        trade_size: String,
        interval_secs: u64,
    },
    PreflightFailed {
        reason: String,
    },
    LowGasWarning {
        gas_balance: Decimal,
        recommended: Decimal,
    },
    CycleStarted {
        cycle: u64,
        direction: SwapDirection,
    },
    BalanceSnapshot {
        snapshot: WalletSnapshot,
    },
    /// Not enough of the source asset; the direction flips.
    Ineligible {
        direction: SwapDirection,
        symbol: String,
        balance: Decimal,
        required: Option<Decimal>,
    },
    CycleAborted {
        direction: SwapDirection,
        reason: String,
    },
    /// A tick fired while the previous cycle was still running.
    CycleSkipped {
        cycle: u64,
    },
    FallbackRouteTaken {
        direction: SwapDirection,
        primary_error: String,
        price_limit: String,
        configured_slippage: Decimal,
    },
    SwapCompleted {
        outcome: SwapOutcome,
        route: Option<RouteTaken>,
    },
    Statistics {
        stats: RunStatistics,
    },
    Stopped {
        stats: RunStatistics,
    },
}

/// Publisher side of the event channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SwapEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SwapEvent> {
        self.tx.subscribe()
    }

    /// Publish to current subscribers. Events with no listener are dropped.
    pub fn emit(&self, event: SwapEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Render one event as a `tracing` record.
pub fn log_event(event: &SwapEvent) {
    match event {
        SwapEvent::Started {
            address,
            network,
            pool_id,
            direction,
            trade_size,
            interval_secs,
        } => info!(
            address = %address,
            network = %network,
            pool = %pool_id,
            direction = %direction,
            trade_size = %trade_size,
            interval_secs,
            "Bot started"
        ),
        SwapEvent::PreflightFailed { reason } => error!(reason = %reason, "Pre-flight check failed"),
        SwapEvent::LowGasWarning {
            gas_balance,
            recommended,
        } => warn!(
            gas = %gas_balance,
            recommended = %recommended,
            "SUI gas is low"
        ),
        SwapEvent::CycleStarted { cycle, direction } => {
            info!(cycle, direction = %direction, "Swap cycle started")
        }
        SwapEvent::BalanceSnapshot { snapshot } => info!(balances = %snapshot, "Balances"),
        SwapEvent::Ineligible {
            direction,
            symbol,
            balance,
            required,
        } => warn!(
            direction = %direction,
            symbol = %symbol,
            balance = %balance,
            required = ?required,
            "Insufficient balance, switching direction"
        ),
        SwapEvent::CycleAborted { direction, reason } => warn!(
            direction = %direction,
            reason = %reason,
            "Cycle aborted, switching direction"
        ),
        SwapEvent::CycleSkipped { cycle } => {
            warn!(cycle, "Previous cycle still running, skipping tick")
        }
        SwapEvent::FallbackRouteTaken {
            direction,
            primary_error,
            price_limit,
            configured_slippage,
        } => warn!(
            direction = %direction,
            primary_error = %primary_error,
            price_limit = %price_limit,
            configured_slippage = %configured_slippage,
            "Primary swap call failed, using manual trade call (configured slippage ignored)"
        ),
        SwapEvent::SwapCompleted { outcome, route } => {
            if outcome.success {
                info!(
                    digest = outcome.tx_digest.as_deref().unwrap_or("-"),
                    amount = %outcome.amount,
                    from = %outcome.from_symbol(),
                    to = %outcome.to_symbol(),
                    gas = ?outcome.gas_fee,
                    route = ?route,
                    "Swap succeeded"
                )
            } else {
                error!(
                    amount = %outcome.amount,
                    from = %outcome.from_symbol(),
                    to = %outcome.to_symbol(),
                    error = outcome.error.as_deref().unwrap_or("unknown error"),
                    "Swap failed"
                )
            }
        }
        SwapEvent::Statistics { stats } => info!(stats = %stats, "Run statistics"),
        SwapEvent::Stopped { stats } => info!(stats = %stats, "Bot stopped"),
    }
    debug!(event = ?event, "event");
}
