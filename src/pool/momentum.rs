//! Momentum Finance (MMT) concentrated-liquidity pools.
//!
//! The native exchange is a flash swap followed by repayment in the same
//! transaction:
//!
//! ```text
//! (recv_x, recv_y, receipt) = trade::flash_swap<X, Y>(pool, x_to_y, true, amount, limit, clock, version)
//! (debt_x, debt_y)          = trade::swap_receipt_debts(&receipt)
//! pay                       = balance::split(coin::into_balance(input), debt)
//! trade::repay_flash_swap<X, Y>(pool, receipt, pay_x, pay_y, version)
//! ```
//!
//! The output balance and any unspent input are turned back into coins and
//! sent to the recipient.

use tracing::debug;

use super::{PoolProtocol, SwapRequest};
use crate::ledger::transaction::ProgrammableTransaction;
use crate::types::{SwapDirection, SwapError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const PROTOCOL_NAME: &str = "momentum";

const TRADE_MODULE: &str = "trade";
const FLASH_SWAP: &str = "flash_swap";
const SWAP_RECEIPT_DEBTS: &str = "swap_receipt_debts";
const REPAY_FLASH_SWAP: &str = "repay_flash_swap";

const COIN_INTO_BALANCE: &str = "0x2::coin::into_balance";
const COIN_FROM_BALANCE: &str = "0x2::coin::from_balance";
const BALANCE_SPLIT: &str = "0x2::balance::split";
const BALANCE_ZERO: &str = "0x2::balance::zero";
const BALANCE_DESTROY_ZERO: &str = "0x2::balance::destroy_zero";

/// Shared network clock.
pub const CLOCK_OBJECT: &str = "0x6";

/// Tick-math bounds of the pool's sqrt price (Q64.64).
pub const MIN_SQRT_PRICE: u128 = 4_295_048_016;
pub const MAX_SQRT_PRICE: u128 = 79_226_673_515_401_279_992_447_579_055;

/// Price limit used by the manual trade-module call. Fixed, independent
/// of the configured slippage tolerance.
pub const FALLBACK_SQRT_PRICE_LIMIT: u128 = 1000;

/// Pool-state object passed to the manual trade-module call.
pub const FALLBACK_VERSION_OBJECT: &str =
    "0x2375a0b1ec12010aaea3b2545acfa2ad34cfbba03ce4b59f4c39e1e25eed1b2a";

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

/// Momentum CLMM entry points under a deployed package.
#[derive(Debug, Clone)]
pub struct MomentumClmm {
    package_id: String,
    /// Protocol `Version` object required by every trade entry point.
    version_object: String,
}

impl MomentumClmm {
    pub fn new(package_id: &str, version_object: &str) -> Self {
        Self {
            package_id: package_id.to_string(),
            version_object: version_object.to_string(),
        }
    }

    fn trade_fn(&self, function: &str) -> String {
        format!("{}::{TRADE_MODULE}::{function}", self.package_id)
    }

    /// The caller's limit, or the widest bound for the direction.
    pub fn effective_price_limit(direction: SwapDirection, requested: u128) -> u128 {
        if requested != 0 {
            return requested;
        }
        match direction {
            SwapDirection::BaseToQuote => MIN_SQRT_PRICE + 1,
            SwapDirection::QuoteToBase => MAX_SQRT_PRICE - 1,
        }
    }
}

impl PoolProtocol for MomentumClmm {
    fn append_swap(
        &self,
        tx: &mut ProgrammableTransaction,
        request: &SwapRequest,
    ) -> Result<(), SwapError> {
        let x_to_y = request.direction.is_x_to_y();
        let pair = [request.base_type.as_str(), request.quote_type.as_str()];
        let source = request.source_type();
        let destination = request.destination_type();

        let pool = tx.shared_object(&request.pool_id, true)?;
        let clock = tx.shared_object(CLOCK_OBJECT, false)?;
        let version = tx.shared_object(&self.version_object, false)?;
        let is_x_to_y = tx.pure_bool(x_to_y)?;
        let by_amount_in = tx.pure_bool(true)?;
        let amount = tx.pure_u64(request.amount)?;
        let limit = tx.pure_u128(Self::effective_price_limit(
            request.direction,
            request.sqrt_price_limit,
        ))?;

        let swap = tx.move_call(
            &self.trade_fn(FLASH_SWAP),
            &pair,
            vec![pool, is_x_to_y, by_amount_in, amount, limit, clock, version],
        )?;
        let (recv_x, recv_y, receipt) = (swap.nested(0), swap.nested(1), swap.nested(2));

        let debts = tx.move_call(&self.trade_fn(SWAP_RECEIPT_DEBTS), &[], vec![receipt])?;
        let debt = if x_to_y { debts.nested(0) } else { debts.nested(1) };

        let input_balance = tx
            .move_call(COIN_INTO_BALANCE, &[source], vec![request.input_coin])?
            .nested(0);
        let payment = tx
            .move_call(BALANCE_SPLIT, &[source], vec![input_balance, debt])?
            .nested(0);
        let nothing = tx.move_call(BALANCE_ZERO, &[destination], vec![])?.nested(0);

        let (pay_x, pay_y) = if x_to_y {
            (payment, nothing)
        } else {
            (nothing, payment)
        };
        tx.move_call(
            &self.trade_fn(REPAY_FLASH_SWAP),
            &pair,
            vec![pool, receipt, pay_x, pay_y, version],
        )?;

        // The side being sold receives nothing back from the pool.
        let (empty, output) = if x_to_y { (recv_x, recv_y) } else { (recv_y, recv_x) };
        tx.move_call(BALANCE_DESTROY_ZERO, &[source], vec![empty])?;

        let output_coin = tx
            .move_call(COIN_FROM_BALANCE, &[destination], vec![output])?
            .nested(0);
        let leftover_coin = tx
            .move_call(COIN_FROM_BALANCE, &[source], vec![input_balance])?
            .nested(0);
        tx.transfer_objects(vec![output_coin, leftover_coin], &request.recipient)?;

        debug!(
            pool = %request.pool_id,
            x_to_y,
            amount = request.amount,
            commands = tx.commands.len(),
            "Appended Momentum flash swap"
        );
        Ok(())
    }

    fn append_manual_swap(
        &self,
        tx: &mut ProgrammableTransaction,
        request: &SwapRequest,
    ) -> Result<(), SwapError> {
        let pool = tx.shared_object(&request.pool_id, true)?;
        let is_x_to_y = tx.pure_bool(true)?;
        let by_amount_in = tx.pure_bool(true)?;
        let amount = tx.pure_u64(request.amount)?;
        let limit = tx.pure_u128(FALLBACK_SQRT_PRICE_LIMIT)?;
        let clock = tx.shared_object(CLOCK_OBJECT, false)?;
        let version = tx.shared_object(FALLBACK_VERSION_OBJECT, false)?;

        tx.move_call(
            &self.trade_fn(FLASH_SWAP),
            &[request.base_type.as_str(), request.quote_type.as_str()],
            vec![pool, is_x_to_y, by_amount_in, amount, limit, clock, version],
        )?;

        debug!(
            pool = %request.pool_id,
            amount = request.amount,
            "Appended manual trade::flash_swap"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        PROTOCOL_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
