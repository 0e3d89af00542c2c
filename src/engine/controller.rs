//! Run controller: the alternating-direction swap loop.
//!
//! Lifecycle is `Idle → Running → Stopped`, one way. `start()` runs a
//! pre-flight balance check, executes the first cycle immediately and then
//! schedules one cycle per interval until `stop()`. A cycle that fires
//! while the previous one still holds the direction lock is skipped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::engine::accountant::{Accountant, PriceTable};
use crate::engine::builder::TransactionBuilder;
use crate::engine::events::{EventBus, SwapEvent};
use crate::engine::inspector::BalanceInspector;
use crate::engine::resolver::{is_eligible, resolve};
use crate::engine::submitter::Submitter;
use crate::keys::SigningIdentity;
use crate::ledger::LedgerClient;
use crate::pool::PoolProtocol;
use crate::types::{
    RouteTaken, RunStatistics, SwapDirection, SwapError, SwapOutcome, TradeSize, TradingConfiguration,
    WalletSnapshot,
};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MIN_GAS: Decimal = dec!(0.05);
pub const DEFAULT_LOW_GAS_WARNING: Decimal = dec!(0.1);
/// 0.05 SUI in MIST.
pub const DEFAULT_GAS_BUDGET: u64 = 50_000_000;

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub interval: Duration,
    /// Gas balance (SUI) below which the bot refuses to start.
    pub min_gas: Decimal,
    /// Gas balance (SUI) below which a warning is emitted.
    pub low_gas_warning: Decimal,
    /// MIST per transaction.
    pub gas_budget: u64,
    pub initial_direction: SwapDirection,
    pub prices: PriceTable,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            min_gas: DEFAULT_MIN_GAS,
            low_gas_warning: DEFAULT_LOW_GAS_WARNING,
            gas_budget: DEFAULT_GAS_BUDGET,
            initial_direction: SwapDirection::BaseToQuote,
            prices: PriceTable::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartResult {
    Started,
    AlreadyRunning,
    /// A stopped controller cannot be restarted.
    AlreadyStopped,
    PreflightFailed(String),
}

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleReport {
    NotRunning,
    /// Another cycle was still in flight.
    Skipped,
    /// Source balance too low; direction flipped.
    Ineligible,
    /// No spendable coins at build time; direction flipped.
    Aborted,
    /// A swap was attempted (or its balance read failed).
    Completed(SwapOutcome),
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct RunController {
    config: TradingConfiguration,
    address: String,
    settings: ControllerSettings,
    inspector: BalanceInspector,
    builder: TransactionBuilder,
    submitter: Submitter,
    events: EventBus,
    lifecycle: Mutex<ControllerState>,
    /// Held for the whole cycle; doubles as the cycle-in-progress guard.
    direction: Mutex<SwapDirection>,
    stats: Mutex<RunStatistics>,
    cycles: AtomicU64,
    stop_tx: watch::Sender<bool>,
}

impl RunController {
    pub fn new(
        config: TradingConfiguration,
        identity: Arc<SigningIdentity>,
        ledger: Arc<dyn LedgerClient>,
        pool: Arc<dyn PoolProtocol>,
        events: EventBus,
        settings: ControllerSettings,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            address: identity.address().to_string(),
            inspector: BalanceInspector::new(Arc::clone(&ledger)),
            builder: TransactionBuilder::new(
                Arc::clone(&ledger),
                pool,
                events.clone(),
                settings.gas_budget,
            ),
            submitter: Submitter::new(ledger, identity, settings.gas_budget),
            direction: Mutex::new(settings.initial_direction),
            lifecycle: Mutex::new(ControllerState::Idle),
            stats: Mutex::new(RunStatistics::new()),
            cycles: AtomicU64::new(0),
            stop_tx,
            config,
            settings,
            events,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn state(&self) -> ControllerState {
        *self.lifecycle.lock().await
    }

    /// Current direction. Waits for an in-flight cycle to finish.
    pub async fn direction(&self) -> SwapDirection {
        *self.direction.lock().await
    }

    pub async fn statistics(&self) -> RunStatistics {
        self.stats.lock().await.clone()
    }

    /// Pre-flight, first cycle, then the interval scheduler.
    pub async fn start(self: &Arc<Self>) -> StartResult {
        let mut stop_rx = self.stop_tx.subscribe();
        {
            let mut state = self.lifecycle.lock().await;
            match *state {
                ControllerState::Running => {
                    warn!("Bot is already running");
                    return StartResult::AlreadyRunning;
                }
                ControllerState::Stopped => {
                    warn!("Bot has been stopped and cannot restart");
                    return StartResult::AlreadyStopped;
                }
                ControllerState::Idle => {}
            }

            if let Err(reason) = self.preflight().await {
                self.events.emit(SwapEvent::PreflightFailed {
                    reason: reason.clone(),
                });
                return StartResult::PreflightFailed(reason);
            }
            *state = ControllerState::Running;
        }

        self.events.emit(SwapEvent::Started {
            address: self.address.clone(),
            network: self.config.network.to_string(),
            pool_id: self.config.pool_id.clone(),
            direction: self.direction().await,
            trade_size: self.config.trade_size.to_string(),
            interval_secs: self.settings.interval.as_secs(),
        });

        self.run_cycle().await;

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let period = this.settings.interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let cycle = Arc::clone(&this);
                        tokio::spawn(async move {
                            cycle.run_cycle().await;
                        });
                    }
                    _ = stop_rx.changed() => {
                        debug!("Scheduler stopped");
                        break;
                    }
                }
            }
        });

        info!(interval_secs = self.settings.interval.as_secs(), "Swap scheduler armed");
        StartResult::Started
    }

    /// Stop scheduling new cycles. In-flight cycles finish on their own.
    /// Returns false (and changes nothing) unless the bot was running.
    pub async fn stop(&self) -> bool {
        let mut state = self.lifecycle.lock().await;
        if *state != ControllerState::Running {
            debug!(state = ?*state, "Stop ignored, bot not running");
            return false;
        }
        *state = ControllerState::Stopped;
        self.stop_tx.send_replace(true);

        let stats = self.statistics().await;
        self.events.emit(SwapEvent::Stopped { stats });
        true
    }

    /// Gas floor, low-gas warning, and at least one tradeable side.
    async fn preflight(&self) -> Result<WalletSnapshot, String> {
        let snapshot = self
            .inspector
            .inspect(&self.address, &self.config)
            .await
            .map_err(|e| e.to_string())?;
        self.events.emit(SwapEvent::BalanceSnapshot {
            snapshot: snapshot.clone(),
        });

        let gas = snapshot.gas.amount;
        if gas < self.settings.min_gas {
            return Err(format!(
                "SUI gas {gas} is below the {} SUI minimum",
                self.settings.min_gas
            ));
        }
        if gas < self.settings.low_gas_warning {
            self.events.emit(SwapEvent::LowGasWarning {
                gas_balance: gas,
                recommended: self.settings.low_gas_warning,
            });
        }

        let strategy = self.config.trade_size;
        if !is_eligible(strategy, &snapshot.base) && !is_eligible(strategy, &snapshot.quote) {
            let need = match strategy {
                TradeSize::FixedAmount(x) => format!("at least {x}"),
                TradeSize::UseEntireBalance => "a non-zero balance".to_string(),
            };
            return Err(format!(
                "Not enough tokens to swap: need {need} {} or {}",
                snapshot.base.symbol, snapshot.quote.symbol
            ));
        }

        Ok(snapshot)
    }

    /// One balance → eligibility → swap → record pass.
    pub async fn run_cycle(&self) -> CycleReport {
        let Ok(mut direction) = self.direction.try_lock() else {
            let cycle = self.cycles.load(Ordering::Relaxed) + 1;
            self.events.emit(SwapEvent::CycleSkipped { cycle });
            return CycleReport::Skipped;
        };

        if self.state().await != ControllerState::Running {
            return CycleReport::NotRunning;
        }

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let current = *direction;
        self.events.emit(SwapEvent::CycleStarted {
            cycle,
            direction: current,
        });

        let source = current.source(&self.config);
        let destination = current.destination(&self.config);
        let strategy = self.config.trade_size;

        let snapshot = match self.inspector.inspect(&self.address, &self.config).await {
            Ok(s) => s,
            Err(e) => {
                let attempted = match strategy {
                    TradeSize::FixedAmount(x) => x,
                    TradeSize::UseEntireBalance => Decimal::ZERO,
                };
                let outcome = SwapOutcome::failed(e.to_string(), attempted, source, destination);
                return self.finish(outcome, None).await;
            }
        };
        self.events.emit(SwapEvent::BalanceSnapshot {
            snapshot: snapshot.clone(),
        });

        let balance = snapshot.source(current);
        if !is_eligible(strategy, balance) {
            self.events.emit(SwapEvent::Ineligible {
                direction: current,
                symbol: balance.symbol.clone(),
                balance: balance.amount,
                required: match strategy {
                    TradeSize::FixedAmount(x) => Some(x),
                    TradeSize::UseEntireBalance => None,
                },
            });
            *direction = current.flipped();
            return CycleReport::Ineligible;
        }

        let amount = match resolve(strategy, balance) {
            Ok(a) => a,
            Err(e) => {
                let outcome = SwapOutcome::failed(e.to_string(), balance.amount, source, destination);
                return self.finish(outcome, None).await;
            }
        };

        let pending = match self
            .builder
            .build(&self.address, &self.config, current, amount, strategy.is_use_all())
            .await
        {
            Ok(p) => p,
            Err(e @ SwapError::InsufficientHoldings { .. }) => {
                self.events.emit(SwapEvent::CycleAborted {
                    direction: current,
                    reason: e.to_string(),
                });
                *direction = current.flipped();
                return CycleReport::Aborted;
            }
            Err(e) => {
                let outcome = SwapOutcome::failed(e.to_string(), amount.decimal, source, destination);
                return self.finish(outcome, None).await;
            }
        };

        let route = pending.route;
        let outcome = self.submitter.submit(pending).await;
        if outcome.success {
            *direction = current.flipped();
        }
        self.finish(outcome, Some(route)).await
    }

    async fn finish(
        &self,
        outcome: SwapOutcome,
        route: Option<RouteTaken>,
    ) -> CycleReport {
        let stats = {
            let mut stats = self.stats.lock().await;
            Accountant::record(&mut stats, &outcome, &self.settings.prices);
            stats.clone()
        };
        self.events.emit(SwapEvent::SwapCompleted {
            outcome: outcome.clone(),
            route,
        });
        self.events.emit(SwapEvent::Statistics { stats });
        CycleReport::Completed(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
