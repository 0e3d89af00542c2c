//! Shared types for the Momentum volume bot.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that ledger, pool, and engine
//! modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully-qualified type of the native gas coin.
pub const SUI_COIN_TYPE: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI";

/// Decimal places of the native gas coin (1 SUI = 10⁹ MIST).
pub const SUI_DECIMALS: u8 = 9;

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Target Sui network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Public fullnode used when no RPC endpoint is configured.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://fullnode.mainnet.sui.io:443",
            Network::Testnet => "https://fullnode.testnet.sui.io:443",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(SwapError::Config(format!("Unknown network: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Trading configuration
// ---------------------------------------------------------------------------

/// How much to trade each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSize {
    /// A fixed human-scale quantity of the source asset.
    FixedAmount(Decimal),
    /// Sell the whole source balance.
    UseEntireBalance,
}

impl TradeSize {
    pub fn is_use_all(&self) -> bool {
        matches!(self, TradeSize::UseEntireBalance)
    }
}

impl fmt::Display for TradeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSize::FixedAmount(x) => write!(f, "{x} tokens"),
            TradeSize::UseEntireBalance => write!(f, "ALL BALANCE"),
        }
    }
}

/// Parses `ALL` (any case) or a decimal quantity.
impl std::str::FromStr for TradeSize {
    type Err = SwapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(TradeSize::UseEntireBalance);
        }
        let amount = Decimal::from_str(s)
            .map_err(|e| SwapError::Config(format!("Invalid swap amount '{s}': {e}")))?;
        Ok(TradeSize::FixedAmount(amount))
    }
}

/// Everything the engine needs to know about the pool and pair.
/// Immutable for the lifetime of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfiguration {
    pub pool_id: String,
    /// Pool X side.
    pub base_token: String,
    /// Pool Y side.
    pub quote_token: String,
    pub trade_size: TradeSize,
    /// Fraction, e.g. 0.02 for 2%.
    pub slippage_tolerance: Decimal,
    pub network: Network,
    pub rpc_url: String,
    pub clmm_package_id: String,
    /// Protocol version object passed to every pool entry point.
    pub global_config: String,
}

impl TradingConfiguration {
    pub fn base_symbol(&self) -> String {
        symbol_of(&self.base_token, "BASE")
    }

    pub fn quote_symbol(&self) -> String {
        symbol_of(&self.quote_token, "QUOTE")
    }
}

/// Last `::` segment of a coin type, or `fallback` when empty.
pub fn symbol_of(coin_type: &str, fallback: &str) -> String {
    match coin_type.rsplit("::").next() {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => fallback.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Which side of the pair is sold this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapDirection {
    BaseToQuote,
    QuoteToBase,
}

impl SwapDirection {
    /// The opposite direction.
    pub fn flipped(&self) -> Self {
        match self {
            SwapDirection::BaseToQuote => SwapDirection::QuoteToBase,
            SwapDirection::QuoteToBase => SwapDirection::BaseToQuote,
        }
    }

    /// Pool orientation flag: base is X, quote is Y.
    pub fn is_x_to_y(&self) -> bool {
        matches!(self, SwapDirection::BaseToQuote)
    }

    /// Coin type being sold.
    pub fn source<'a>(&self, config: &'a TradingConfiguration) -> &'a str {
        match self {
            SwapDirection::BaseToQuote => &config.base_token,
            SwapDirection::QuoteToBase => &config.quote_token,
        }
    }

    /// Coin type being bought.
    pub fn destination<'a>(&self, config: &'a TradingConfiguration) -> &'a str {
        match self {
            SwapDirection::BaseToQuote => &config.quote_token,
            SwapDirection::QuoteToBase => &config.base_token,
        }
    }

    /// Which construction paths are available for this direction.
    pub fn route(&self) -> SwapRoute {
        match self {
            SwapDirection::BaseToQuote => SwapRoute::SdkWithManualFallback,
            SwapDirection::QuoteToBase => SwapRoute::SdkOnly,
        }
    }
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapDirection::BaseToQuote => write!(f, "BASE_TO_QUOTE"),
            SwapDirection::QuoteToBase => write!(f, "QUOTE_TO_BASE"),
        }
    }
}

/// Construction strategy for the exchange call.
///
/// Only base→quote has a hand-built fallback; quote→base failures on the
/// protocol entry point propagate as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapRoute {
    SdkOnly,
    SdkWithManualFallback,
}

/// Which path actually produced the exchange call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteTaken {
    Primary,
    ManualFallback,
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

/// One asset's holdings at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub coin_type: String,
    pub symbol: String,
    /// Smallest indivisible units.
    pub raw: u128,
    pub decimals: u8,
    /// `raw / 10^decimals`.
    pub amount: Decimal,
}

impl AssetBalance {
    pub fn new(coin_type: &str, symbol: &str, raw: u128, decimals: u8) -> Self {
        Self {
            coin_type: coin_type.to_string(),
            symbol: symbol.to_string(),
            raw,
            decimals,
            amount: raw_to_decimal(raw, decimals),
        }
    }

    pub fn zero(coin_type: &str, symbol: &str, decimals: u8) -> Self {
        Self::new(coin_type, symbol, 0, decimals)
    }
}

/// Point-in-time read of gas, base and quote holdings.
/// Recomputed every cycle; never carried across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub gas: AssetBalance,
    pub base: AssetBalance,
    pub quote: AssetBalance,
    pub taken_at: DateTime<Utc>,
}

impl WalletSnapshot {
    pub fn base_symbol(&self) -> &str {
        &self.base.symbol
    }

    pub fn quote_symbol(&self) -> &str {
        &self.quote.symbol
    }

    /// Holdings of the asset sold in `direction`.
    pub fn source(&self, direction: SwapDirection) -> &AssetBalance {
        match direction {
            SwapDirection::BaseToQuote => &self.base,
            SwapDirection::QuoteToBase => &self.quote,
        }
    }
}

impl fmt::Display for WalletSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6} {} | {:.6} {} | gas {:.4} {}",
            self.base.amount,
            self.base.symbol,
            self.quote.amount,
            self.quote.symbol,
            self.gas.amount,
            self.gas.symbol,
        )
    }
}

/// Convert raw integer units into a human-scale decimal.
///
/// Saturates at `Decimal::MAX` for values beyond 96 bits.
pub fn raw_to_decimal(raw: u128, decimals: u8) -> Decimal {
    i128::try_from(raw)
        .ok()
        .and_then(|r| Decimal::try_from_i128_with_scale(r, u32::from(decimals.min(28))).ok())
        .map(|d| d.normalize())
        .unwrap_or(Decimal::MAX)
}

/// `10^decimals` as a decimal.
pub fn decimal_scale(decimals: u8) -> Decimal {
    Decimal::from_i128_with_scale(10i128.pow(u32::from(decimals.min(28))), 0)
}

// ---------------------------------------------------------------------------
// Swap outcome
// ---------------------------------------------------------------------------

/// Result of one attempted swap. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapOutcome {
    pub success: bool,
    pub tx_digest: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Human-scale amount of the source asset.
    pub amount: Decimal,
    pub from_token: String,
    pub to_token: String,
    /// Network-reported gas cost in SUI, when known.
    pub gas_fee: Option<Decimal>,
}

impl SwapOutcome {
    pub fn succeeded(
        tx_digest: String,
        amount: Decimal,
        from_token: &str,
        to_token: &str,
        gas_fee: Option<Decimal>,
    ) -> Self {
        Self {
            success: true,
            tx_digest: Some(tx_digest),
            error: None,
            timestamp: Utc::now(),
            amount,
            from_token: from_token.to_string(),
            to_token: to_token.to_string(),
            gas_fee,
        }
    }

    pub fn failed(error: impl Into<String>, amount: Decimal, from_token: &str, to_token: &str) -> Self {
        Self {
            success: false,
            tx_digest: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
            amount,
            from_token: from_token.to_string(),
            to_token: to_token.to_string(),
            gas_fee: None,
        }
    }

    pub fn from_symbol(&self) -> String {
        symbol_of(&self.from_token, "UNKNOWN").to_uppercase()
    }

    pub fn to_symbol(&self) -> String {
        symbol_of(&self.to_token, "UNKNOWN").to_uppercase()
    }
}

impl fmt::Display for SwapOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(
                f,
                "✅ {} {} -> {} [{}]",
                self.amount,
                self.from_symbol(),
                self.to_symbol(),
                self.tx_digest.as_deref().unwrap_or("-"),
            )
        } else {
            write!(
                f,
                "❌ {} {} -> {}: {}",
                self.amount,
                self.from_symbol(),
                self.to_symbol(),
                self.error.as_deref().unwrap_or("unknown error"),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Run statistics
// ---------------------------------------------------------------------------

/// Counters accumulated over the whole run. Never reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub total_swaps: u64,
    pub successful_swaps: u64,
    pub failed_swaps: u64,
    /// Sum of source-asset amounts of successful swaps.
    pub total_volume: Decimal,
    pub total_volume_usd: Decimal,
    /// SUI spent on gas.
    pub total_gas_spent: Decimal,
    pub start_time: DateTime<Utc>,
    pub last_swap_time: Option<DateTime<Utc>>,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self {
            total_swaps: 0,
            successful_swaps: 0,
            failed_swaps: 0,
            total_volume: Decimal::ZERO,
            total_volume_usd: Decimal::ZERO,
            total_gas_spent: Decimal::ZERO,
            start_time: Utc::now(),
            last_swap_time: None,
        }
    }

    /// Success rate as a percentage. 0 when nothing has been attempted.
    pub fn success_rate(&self) -> Decimal {
        if self.total_swaps == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(self.successful_swaps) * Decimal::ONE_HUNDRED
                / Decimal::from(self.total_swaps)
        }
    }

    /// Whole minutes since the run started.
    pub fn runtime_minutes(&self) -> i64 {
        (Utc::now() - self.start_time).num_minutes()
    }
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "runtime={}m | swaps={} (ok {} / failed {}) | success={:.1}% | volume={:.4} (${:.2}) | gas={:.4} SUI",
            self.runtime_minutes(),
            self.total_swaps,
            self.successful_swaps,
            self.failed_swaps,
            self.success_rate(),
            self.total_volume,
            self.total_volume_usd,
            self.total_gas_spent,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the swap engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SwapError {
    #[error("Invalid private key format: {0}")]
    InvalidKeyFormat(String),

    #[error("No {coin_type} coins available to swap")]
    InsufficientHoldings { coin_type: String },

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    #[error("Transaction failed: {0}")]
    ProtocolExecution(String),

    #[error("Pool call construction failed: {0}")]
    PoolCall(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SwapError {
    fn from(e: reqwest::Error) -> Self {
        SwapError::Infrastructure(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
