//! Accountant: run statistics and volume pricing.
//!
//! Folds each swap outcome into the run's `RunStatistics`: attempt
//! counts, traded volume (native and USD), and gas spent.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use crate::types::{RunStatistics, SwapOutcome};

/// Gas charged per successful swap when the network reports no cost.
pub const ESTIMATED_GAS_PER_SWAP: Decimal = dec!(0.0015);

// ---------------------------------------------------------------------------
// Price table
// ---------------------------------------------------------------------------

/// Static USD prices keyed by upper-case symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    prices: HashMap<String, Decimal>,
}

impl PriceTable {
    pub fn new(prices: HashMap<String, Decimal>) -> Self {
        Self {
            prices: prices
                .into_iter()
                .map(|(k, v)| (k.to_uppercase(), v))
                .collect(),
        }
    }

    /// USD price of `symbol`; unknown symbols are valued 1:1.
    pub fn usd_price(&self, symbol: &str) -> Decimal {
        self.prices
            .get(&symbol.to_uppercase())
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    pub fn usd_value(&self, symbol: &str, amount: Decimal) -> Decimal {
        amount * self.usd_price(symbol)
    }

    /// This table with `overrides` replacing or adding entries.
    pub fn with_overrides(mut self, overrides: &HashMap<String, Decimal>) -> Self {
        for (symbol, price) in overrides {
            self.prices.insert(symbol.to_uppercase(), *price);
        }
        self
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::new(HashMap::from([
            ("SUI".to_string(), dec!(3.5)),
            ("USDT".to_string(), dec!(1.0)),
            ("USDC".to_string(), dec!(1.0)),
        ]))
    }
}

// ---------------------------------------------------------------------------
// Accountant
// ---------------------------------------------------------------------------

pub struct Accountant;

impl Accountant {
    /// Record one attempted swap.
    pub fn record(stats: &mut RunStatistics, outcome: &SwapOutcome, prices: &PriceTable) {
        stats.total_swaps += 1;
        stats.last_swap_time = Some(outcome.timestamp);

        if outcome.success {
            stats.successful_swaps += 1;
            stats.total_volume += outcome.amount;
            stats.total_volume_usd += prices.usd_value(&outcome.from_symbol(), outcome.amount);
            stats.total_gas_spent += outcome.gas_fee.unwrap_or(ESTIMATED_GAS_PER_SWAP);
        } else {
            stats.failed_swaps += 1;
        }

        info!(
            swaps = stats.total_swaps,
            ok = stats.successful_swaps,
            failed = stats.failed_swaps,
            volume_usd = format!("${:.2}", stats.total_volume_usd),
            gas = format!("{:.4} SUI", stats.total_gas_spent),
            "Swap recorded"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
