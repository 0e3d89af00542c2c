//! Transaction builder.
//!
//! Assembles one swap transaction: consolidate the source coins, carve
//! out the trade amount, append the pool's exchange call (with the manual
//! fallback for base→quote) and send any remainder back to the payer.
//! Reads coin listings but never submits anything.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::engine::events::{EventBus, SwapEvent};
use crate::engine::resolver::ResolvedAmount;
use crate::ledger::transaction::{same_type, Argument, ObjectRef, ProgrammableTransaction};
use crate::ledger::{CoinObject, LedgerClient};
use crate::pool::momentum::FALLBACK_SQRT_PRICE_LIMIT;
use crate::pool::{PoolProtocol, SwapRequest};
use crate::types::{
    raw_to_decimal, RouteTaken, SwapDirection, SwapError, SwapRoute, TradingConfiguration,
    SUI_COIN_TYPE, SUI_DECIMALS,
};

/// A fully assembled, unsigned swap.
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub kind: ProgrammableTransaction,
    pub direction: SwapDirection,
    pub from_token: String,
    pub to_token: String,
    /// Raw units handed to the pool.
    pub amount_raw: u64,
    /// Human-scale amount actually traded.
    pub amount: Decimal,
    pub route: RouteTaken,
    /// Preselected gas payment when the gas coin itself funds the trade.
    pub gas_payment: Option<Vec<ObjectRef>>,
}

/// Whether `coin_type` names the native gas coin, in any address form.
pub fn is_gas_asset(coin_type: &str) -> bool {
    same_type(coin_type, SUI_COIN_TYPE)
}

pub struct TransactionBuilder {
    ledger: Arc<dyn LedgerClient>,
    pool: Arc<dyn PoolProtocol>,
    events: EventBus,
    gas_budget: u64,
}

impl TransactionBuilder {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        pool: Arc<dyn PoolProtocol>,
        events: EventBus,
        gas_budget: u64,
    ) -> Self {
        Self {
            ledger,
            pool,
            events,
            gas_budget,
        }
    }

    /// Assemble the swap for `direction`.
    ///
    /// Fails with `InsufficientHoldings` when the payer has no coins of the
    /// source asset (or, for the gas asset, nothing beyond the gas budget).
    pub async fn build(
        &self,
        sender: &str,
        config: &TradingConfiguration,
        direction: SwapDirection,
        amount: ResolvedAmount,
        use_all: bool,
    ) -> Result<PendingTransaction, SwapError> {
        let source = direction.source(config);
        let destination = direction.destination(config);

        let mut coins = self.ledger.get_coins(sender, source).await?;
        if coins.is_empty() {
            return Err(SwapError::InsufficientHoldings {
                coin_type: source.to_string(),
            });
        }
        coins.sort_by(|a, b| b.balance.cmp(&a.balance));

        let mut tx = ProgrammableTransaction::new();
        let (input_coin, remainder, amount_raw, gas_payment) = if is_gas_asset(source) {
            let (input, raw) = self.carve_from_gas(&mut tx, &coins, amount, use_all)?;
            let payment = coins.iter().map(|c| c.object_ref).collect();
            (input, None, raw, Some(payment))
        } else {
            let (input, remainder, raw) = self.carve_from_coins(&mut tx, &coins, amount, use_all)?;
            (input, remainder, raw, None)
        };

        let request = SwapRequest {
            pool_id: config.pool_id.clone(),
            base_type: config.base_token.clone(),
            quote_type: config.quote_token.clone(),
            amount: amount_raw,
            input_coin,
            direction,
            recipient: sender.to_string(),
            sqrt_price_limit: 0,
        };

        let route = self.append_exchange(&mut tx, &request, config)?;

        if let Some(remainder) = remainder {
            tx.transfer_objects(vec![remainder], sender)?;
        }

        let decimals = if gas_payment.is_some() {
            SUI_DECIMALS
        } else {
            amount.decimals
        };
        let traded = if use_all {
            raw_to_decimal(u128::from(amount_raw), decimals)
        } else {
            amount.decimal
        };

        info!(
            direction = %direction,
            amount = %traded,
            raw = amount_raw,
            coins = coins.len(),
            route = ?route,
            commands = tx.commands.len(),
            "Swap transaction assembled"
        );

        Ok(PendingTransaction {
            kind: tx,
            direction,
            from_token: source.to_string(),
            to_token: destination.to_string(),
            amount_raw,
            amount: traded,
            route,
            gas_payment,
        })
    }

    /// Merge every coin into the largest, then split off the trade amount
    /// unless the whole balance is being sold, in which case the amount is
    /// the sum of the coins just listed. Returns (input, remainder, raw).
    fn carve_from_coins(
        &self,
        tx: &mut ProgrammableTransaction,
        coins: &[CoinObject],
        amount: ResolvedAmount,
        use_all: bool,
    ) -> Result<(Argument, Option<Argument>, u64), SwapError> {
        let (first, rest) = match coins.split_first() {
            Some(split) => split,
            None => {
                return Err(SwapError::InsufficientHoldings {
                    coin_type: String::new(),
                })
            }
        };

        let primary = tx.owned_object(first.object_ref)?;
        if !rest.is_empty() {
            debug!(count = coins.len(), "Merging source coins");
            let others = rest
                .iter()
                .map(|c| tx.owned_object(c.object_ref))
                .collect::<Result<Vec<_>, _>>()?;
            tx.merge_coins(primary, others)?;
        }

        if use_all {
            let total: u128 = coins.iter().map(|c| u128::from(c.balance)).sum();
            if total != amount.raw {
                debug!(listed = %total, snapshot = %amount.raw, "Coin listing differs from balance snapshot");
            }
            Ok((primary, None, to_u64(total)?))
        } else {
            let raw = to_u64(amount.raw)?;
            let input = tx.split_coin(primary, raw)?;
            Ok((input, Some(primary), raw))
        }
    }

    /// Split the trade amount off the gas coin. Selling everything leaves
    /// the gas budget behind.
    fn carve_from_gas(
        &self,
        tx: &mut ProgrammableTransaction,
        coins: &[CoinObject],
        amount: ResolvedAmount,
        use_all: bool,
    ) -> Result<(Argument, u64), SwapError> {
        let raw = if use_all {
            let total: u128 = coins.iter().map(|c| u128::from(c.balance)).sum();
            let spendable = total.saturating_sub(u128::from(self.gas_budget));
            if spendable == 0 {
                return Err(SwapError::InsufficientHoldings {
                    coin_type: SUI_COIN_TYPE.to_string(),
                });
            }
            to_u64(spendable)?
        } else {
            to_u64(amount.raw)?
        };

        let gas = tx.gas();
        Ok((tx.split_coin(gas, raw)?, raw))
    }

    /// Append the exchange call using the route assigned to the direction.
    fn append_exchange(
        &self,
        tx: &mut ProgrammableTransaction,
        request: &SwapRequest,
        config: &TradingConfiguration,
    ) -> Result<RouteTaken, SwapError> {
        match request.direction.route() {
            SwapRoute::SdkOnly => {
                self.pool.append_swap(tx, request)?;
                Ok(RouteTaken::Primary)
            }
            SwapRoute::SdkWithManualFallback => {
                let mut scratch = tx.clone();
                match self.pool.append_swap(&mut scratch, request) {
                    Ok(()) => {
                        *tx = scratch;
                        Ok(RouteTaken::Primary)
                    }
                    Err(e) => {
                        warn!(
                            protocol = self.pool.name(),
                            error = %e,
                            price_limit = FALLBACK_SQRT_PRICE_LIMIT,
                            configured_slippage = %config.slippage_tolerance,
                            "Primary swap call failed, falling back to manual trade call"
                        );
                        self.events.emit(SwapEvent::FallbackRouteTaken {
                            direction: request.direction,
                            primary_error: e.to_string(),
                            price_limit: FALLBACK_SQRT_PRICE_LIMIT.to_string(),
                            configured_slippage: config.slippage_tolerance,
                        });
                        self.pool.append_manual_swap(tx, request)?;
                        Ok(RouteTaken::ManualFallback)
                    }
                }
            }
        }
    }
}

fn to_u64(raw: u128) -> Result<u64, SwapError> {
    u64::try_from(raw).map_err(|_| SwapError::Config(format!("Swap amount {raw} exceeds u64")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::transaction::{CallArg, Command, ObjectInput};
    use crate::ledger::MockLedgerClient;
    use crate::pool::MockPoolProtocol;
    use crate::types::{Network, TradeSize};
    use rust_decimal_macros::dec;

    const SENDER: &str = "0x00000000000000000000000000000000000000000000000000000000000000aa";
    const USDC: &str = "0xdba3::usdc::USDC";

    fn config() -> TradingConfiguration {
        TradingConfiguration {
            pool_id: "0xbeef".into(),
            base_token: "0x2::sui::SUI".into(),
            quote_token: USDC.into(),
            trade_size: TradeSize::FixedAmount(dec!(0.1)),
            slippage_tolerance: dec!(0.02),
            network: Network::Testnet,
            rpc_url: String::new(),
            clmm_package_id: "0x1".into(),
            global_config: "0x2".into(),
        }
    }

    fn coin(id: u8, balance: u64) -> CoinObject {
        CoinObject {
            coin_type: USDC.into(),
            object_ref: ObjectRef {
                object_id: [id; 32],
                version: 1,
                digest: [0; 32],
            },
            balance,
        }
    }

    fn ledger_with(coins: Vec<CoinObject>) -> MockLedgerClient {
        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_get_coins()
            .returning(move |_, _| Ok(coins.clone()));
        ledger
    }

    fn pool_ok() -> MockPoolProtocol {
        let mut pool = MockPoolProtocol::new();
        pool.expect_name().return_const("mock".to_string());
        pool.expect_append_swap().returning(|tx, _| {
            tx.move_call("0x1::trade::flash_swap", &[], vec![])?;
            Ok(())
        });
        pool
    }

    fn builder(ledger: MockLedgerClient, pool: MockPoolProtocol) -> TransactionBuilder {
        TransactionBuilder::new(Arc::new(ledger), Arc::new(pool), EventBus::new(), 50_000_000)
    }

    fn fixed(raw: u128, decimal: Decimal) -> ResolvedAmount {
        ResolvedAmount {
            raw,
            decimal,
            decimals: 6,
        }
    }

    #[test]
    fn test_gas_asset_detection() {
        assert!(is_gas_asset("0x2::sui::SUI"));
        assert!(is_gas_asset(SUI_COIN_TYPE));
        assert!(!is_gas_asset(USDC));
        assert!(!is_gas_asset("garbage"));
    }

    #[tokio::test]
    async fn test_no_coins_is_insufficient_holdings() {
        let b = builder(ledger_with(vec![]), pool_ok());
        let err = b
            .build(SENDER, &config(), SwapDirection::QuoteToBase, fixed(100_000, dec!(0.1)), false)
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::InsufficientHoldings { .. }));
    }

    #[tokio::test]
    async fn test_merge_split_and_return_remainder() {
        let b = builder(ledger_with(vec![coin(1, 5), coin(2, 9_000_000), coin(3, 1_000_000)]), pool_ok());
        let pending = b
            .build(SENDER, &config(), SwapDirection::QuoteToBase, fixed(100_000, dec!(0.1)), false)
            .await
            .unwrap();

        let cmds = &pending.kind.commands;
        // Largest coin is the merge target.
        assert_eq!(pending.kind.inputs[0], CallArg::Object(ObjectInput::Owned(coin(2, 0).object_ref)));
        assert!(matches!(&cmds[0], Command::MergeCoins(Argument::Input(0), srcs) if srcs.len() == 2));
        assert!(matches!(&cmds[1], Command::SplitCoins(Argument::Input(0), _)));
        assert!(matches!(&cmds[2], Command::MoveCall(_)));
        assert!(matches!(&cmds[3], Command::TransferObjects(objs, _) if objs == &vec![Argument::Input(0)]));

        assert_eq!(pending.amount_raw, 100_000);
        assert_eq!(pending.amount, dec!(0.1));
        assert_eq!(pending.route, RouteTaken::Primary);
        assert!(pending.gas_payment.is_none());
        assert_eq!(pending.from_token, USDC);
    }

    #[tokio::test]
    async fn test_use_all_spends_merged_coin_without_remainder() {
        let b = builder(ledger_with(vec![coin(1, 7_000_000)]), pool_ok());
        let pending = b
            .build(SENDER, &config(), SwapDirection::QuoteToBase, fixed(7_000_000, dec!(7)), true)
            .await
            .unwrap();

        assert_eq!(pending.kind.commands.len(), 1);
        assert_eq!(pending.amount, dec!(7));
        assert_eq!(pending.amount_raw, 7_000_000);
    }

    #[tokio::test]
    async fn test_use_all_trades_listed_coins_not_snapshot() {
        let b = builder(ledger_with(vec![coin(1, 3_000_000), coin(2, 4_000_000)]), pool_ok());
        let pending = b
            .build(SENDER, &config(), SwapDirection::QuoteToBase, fixed(9_000_000, dec!(9)), true)
            .await
            .unwrap();

        assert_eq!(pending.amount_raw, 7_000_000);
        assert_eq!(pending.amount, dec!(7));
        assert!(matches!(&pending.kind.commands[0], Command::MergeCoins(Argument::Input(0), srcs) if srcs.len() == 1));
        assert!(!pending
            .kind
            .commands
            .iter()
            .any(|c| matches!(c, Command::TransferObjects(..))));
    }

    #[tokio::test]
    async fn test_gas_source_splits_from_gas_coin() {
        let b = builder(ledger_with(vec![coin(1, 2_000_000_000), coin(2, 500_000_000)]), pool_ok());
        let pending = b
            .build(SENDER, &config(), SwapDirection::BaseToQuote, fixed(100_000_000, dec!(0.1)), false)
            .await
            .unwrap();

        assert!(matches!(&pending.kind.commands[0], Command::SplitCoins(Argument::GasCoin, _)));
        assert_eq!(pending.gas_payment.as_ref().map(|p| p.len()), Some(2));
        // Gas coin remainder goes back automatically, no transfer command.
        assert!(!pending
            .kind
            .commands
            .iter()
            .any(|c| matches!(c, Command::TransferObjects(..))));
    }

    #[tokio::test]
    async fn test_gas_source_use_all_keeps_budget() {
        let b = builder(ledger_with(vec![coin(1, 1_050_000_000)]), pool_ok());
        let pending = b
            .build(SENDER, &config(), SwapDirection::BaseToQuote, fixed(1_050_000_000, dec!(1.05)), true)
            .await
            .unwrap();
        assert_eq!(pending.amount_raw, 1_000_000_000);
        assert_eq!(pending.amount, dec!(1));

        let b = builder(ledger_with(vec![coin(1, 50_000_000)]), pool_ok());
        let err = b
            .build(SENDER, &config(), SwapDirection::BaseToQuote, fixed(50_000_000, dec!(0.05)), true)
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::InsufficientHoldings { .. }));
    }

    #[tokio::test]
    async fn test_base_to_quote_falls_back_without_partial_commands() {
        let mut pool = MockPoolProtocol::new();
        pool.expect_name().return_const("mock".to_string());
        pool.expect_append_swap().returning(|tx, _| {
            // Leaves a half-built command behind before failing.
            tx.move_call("0x1::trade::flash_swap", &[], vec![])?;
            Err(SwapError::PoolCall("sdk exploded".into()))
        });
        pool.expect_append_manual_swap().times(1).returning(|tx, _| {
            tx.move_call("0x1::trade::manual", &[], vec![])?;
            Ok(())
        });

        let events = EventBus::new();
        let mut rx = events.subscribe();
        let b = TransactionBuilder::new(
            Arc::new(ledger_with(vec![coin(1, 2_000_000_000)])),
            Arc::new(pool),
            events,
            50_000_000,
        );
        let pending = b
            .build(SENDER, &config(), SwapDirection::BaseToQuote, fixed(100_000_000, dec!(0.1)), false)
            .await
            .unwrap();

        assert_eq!(pending.route, RouteTaken::ManualFallback);
        let calls: Vec<&str> = pending
            .kind
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::MoveCall(call) => Some(call.function.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(calls, vec!["manual"]);

        match rx.try_recv().unwrap() {
            SwapEvent::FallbackRouteTaken { primary_error, .. } => {
                assert!(primary_error.contains("sdk exploded"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_quote_to_base_has_no_fallback() {
        let mut pool = MockPoolProtocol::new();
        pool.expect_name().return_const("mock".to_string());
        pool.expect_append_swap()
            .returning(|_, _| Err(SwapError::PoolCall("sdk exploded".into())));
        pool.expect_append_manual_swap().never();

        let b = builder(ledger_with(vec![coin(1, 1_000_000)]), pool);
        let err = b
            .build(SENDER, &config(), SwapDirection::QuoteToBase, fixed(100_000, dec!(0.1)), false)
            .await
            .unwrap_err();
        assert_eq!(err, SwapError::PoolCall("sdk exploded".into()));
    }
}
