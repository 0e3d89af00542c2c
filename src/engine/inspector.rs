//! Balance inspector.
//!
//! Reads gas, base and quote holdings concurrently and scales them using
//! per-asset decimal precision. Precision comes from on-chain coin
//! metadata (memoized, since it never changes) and falls back to a
//! type-name heuristic when metadata is missing.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::ledger::LedgerClient;
use crate::types::{
    AssetBalance, SwapError, TradingConfiguration, WalletSnapshot, SUI_COIN_TYPE, SUI_DECIMALS,
};

const STABLE_DECIMALS: u8 = 6;
const DEFAULT_DECIMALS: u8 = 9;

/// Decimal precision guessed from the type identifier alone.
pub fn heuristic_decimals(coin_type: &str) -> u8 {
    if coin_type.contains("::sui::SUI") {
        SUI_DECIMALS
    } else if coin_type.contains("::usdc::") || coin_type.contains("::USDC") {
        STABLE_DECIMALS
    } else if coin_type.contains("::usdt::") || coin_type.contains("::USDT") {
        STABLE_DECIMALS
    } else {
        DEFAULT_DECIMALS
    }
}

pub struct BalanceInspector {
    ledger: Arc<dyn LedgerClient>,
    decimals: RwLock<HashMap<String, u8>>,
}

impl BalanceInspector {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            ledger,
            decimals: RwLock::new(HashMap::new()),
        }
    }

    /// Take a fresh snapshot of `owner`'s holdings.
    ///
    /// A failed base or quote read counts as zero; a failed gas read is
    /// returned as an error.
    pub async fn inspect(
        &self,
        owner: &str,
        config: &TradingConfiguration,
    ) -> Result<WalletSnapshot, SwapError> {
        let base_symbol = config.base_symbol();
        let quote_symbol = config.quote_symbol();

        let (gas, base, quote) = futures::join!(
            self.read(owner, SUI_COIN_TYPE, "SUI"),
            self.read(owner, &config.base_token, &base_symbol),
            self.read(owner, &config.quote_token, &quote_symbol),
        );

        let gas = gas?;
        let base = base.unwrap_or_else(|e| self.zero_on_error(&config.base_token, &base_symbol, e));
        let quote =
            quote.unwrap_or_else(|e| self.zero_on_error(&config.quote_token, &quote_symbol, e));

        Ok(WalletSnapshot {
            gas,
            base,
            quote,
            taken_at: Utc::now(),
        })
    }

    async fn read(&self, owner: &str, coin_type: &str, symbol: &str) -> Result<AssetBalance, SwapError> {
        let (raw, decimals) =
            futures::join!(self.ledger.get_balance(owner, coin_type), self.decimals_for(coin_type));
        Ok(AssetBalance::new(coin_type, symbol, raw?, decimals))
    }

    fn zero_on_error(&self, coin_type: &str, symbol: &str, err: SwapError) -> AssetBalance {
        warn!(coin_type, error = %err, "Balance read failed, treating as zero");
        AssetBalance::zero(coin_type, symbol, heuristic_decimals(coin_type))
    }

    /// Metadata precision, else the heuristic. Only metadata hits are cached.
    pub async fn decimals_for(&self, coin_type: &str) -> u8 {
        if let Some(d) = self.decimals.read().await.get(coin_type) {
            return *d;
        }

        match self.ledger.get_coin_decimals(coin_type).await {
            Ok(Some(d)) => {
                self.decimals.write().await.insert(coin_type.to_string(), d);
                d
            }
            Ok(None) => {
                debug!(coin_type, "No coin metadata, using heuristic decimals");
                heuristic_decimals(coin_type)
            }
            Err(e) => {
                debug!(coin_type, error = %e, "Coin metadata lookup failed, using heuristic decimals");
                heuristic_decimals(coin_type)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
