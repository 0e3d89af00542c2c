//! Trade sizing and the eligibility gate.

use rust_decimal::prelude::*;

use crate::types::{decimal_scale, raw_to_decimal, AssetBalance, SwapError, TradeSize};

/// Quantity to trade in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAmount {
    pub raw: u128,
    pub decimal: Decimal,
    /// Precision used to scale between the two.
    pub decimals: u8,
}

/// Compute the exact quantity for `strategy` against `balance`.
///
/// `FixedAmount(x)` ignores the balance: `raw = floor(x · 10^decimals)`.
/// `UseEntireBalance` takes the full raw balance.
pub fn resolve(strategy: TradeSize, balance: &AssetBalance) -> Result<ResolvedAmount, SwapError> {
    match strategy {
        TradeSize::UseEntireBalance => Ok(ResolvedAmount {
            raw: balance.raw,
            decimal: raw_to_decimal(balance.raw, balance.decimals),
            decimals: balance.decimals,
        }),
        TradeSize::FixedAmount(x) => {
            let scaled = x
                .checked_mul(decimal_scale(balance.decimals))
                .ok_or_else(|| SwapError::Config(format!("Swap amount {x} overflows")))?;
            let raw = scaled
                .floor()
                .to_u128()
                .ok_or_else(|| SwapError::Config(format!("Swap amount {x} is not a valid quantity")))?;
            Ok(ResolvedAmount {
                raw,
                decimal: x,
                decimals: balance.decimals,
            })
        }
    }
}

/// Whether the source balance can cover `strategy`.
///
/// Fixed amounts need `balance >= x`; the whole-balance mode needs
/// anything above zero.
pub fn is_eligible(strategy: TradeSize, balance: &AssetBalance) -> bool {
    match strategy {
        TradeSize::UseEntireBalance => balance.amount > Decimal::ZERO,
        TradeSize::FixedAmount(x) => balance.amount >= x,
    }
}
