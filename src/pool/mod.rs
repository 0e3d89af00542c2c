//! Liquidity-pool integrations.
//!
//! Defines the `PoolProtocol` trait and the Momentum Finance CLMM
//! implementation in `momentum`.

pub mod momentum;

use crate::ledger::transaction::{Argument, ProgrammableTransaction};
use crate::types::{SwapDirection, SwapError};

/// Everything a pool needs to append one exchange to a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub pool_id: String,
    /// Pool X side.
    pub base_type: String,
    /// Pool Y side.
    pub quote_type: String,
    /// Raw units of the source asset.
    pub amount: u64,
    /// Coin holding exactly the amount being sold (or the whole balance).
    pub input_coin: Argument,
    pub direction: SwapDirection,
    pub recipient: String,
    /// Square-root price bound; 0 means unbounded.
    pub sqrt_price_limit: u128,
}

impl SwapRequest {
    pub fn source_type(&self) -> &str {
        match self.direction {
            SwapDirection::BaseToQuote => &self.base_type,
            SwapDirection::QuoteToBase => &self.quote_type,
        }
    }

    pub fn destination_type(&self) -> &str {
        match self.direction {
            SwapDirection::BaseToQuote => &self.quote_type,
            SwapDirection::QuoteToBase => &self.base_type,
        }
    }
}

/// Abstraction over an on-chain liquidity pool protocol.
///
/// Implementors only assemble commands; nothing touches the network.
#[cfg_attr(test, mockall::automock)]
pub trait PoolProtocol: Send + Sync {
    /// Append the protocol's native exchange call, delivering the output
    /// to `request.recipient`.
    fn append_swap(
        &self,
        tx: &mut ProgrammableTransaction,
        request: &SwapRequest,
    ) -> Result<(), SwapError>;

    /// Append the hand-built trade-module call used when `append_swap`
    /// fails for base→quote.
    fn append_manual_swap(
        &self,
        tx: &mut ProgrammableTransaction,
        request: &SwapRequest,
    ) -> Result<(), SwapError>;

    /// Protocol name for logging.
    fn name(&self) -> &str;
}
