//! Ledger access.
//!
//! Defines the `LedgerClient` trait the engine talks to and provides:
//! - `rpc`: Sui JSON-RPC implementation
//! - `transaction`: programmable transaction assembly and BCS encoding

pub mod rpc;
pub mod transaction;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{raw_to_decimal, SwapError, SUI_DECIMALS};
use transaction::ObjectRef;

/// One spendable `Coin<T>` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinObject {
    pub coin_type: String,
    pub object_ref: ObjectRef,
    pub balance: u64,
}

/// Gas cost summary reported in transaction effects, in MIST.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasCost {
    pub computation: u64,
    pub storage: u64,
    pub rebate: u64,
}

impl GasCost {
    /// Net fee (`computation + storage − rebate`) in SUI. Never negative.
    pub fn net_sui(&self) -> Decimal {
        let net = (self.computation + self.storage).saturating_sub(self.rebate);
        raw_to_decimal(u128::from(net), SUI_DECIMALS)
    }
}

/// What the network returned for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResponse {
    pub digest: String,
    pub success: bool,
    /// Abort or failure message when `success` is false.
    pub error: Option<String>,
    pub gas_cost: Option<GasCost>,
    pub event_count: usize,
}

/// Abstraction over the Sui fullnode.
///
/// Implementors provide balance reads, coin enumeration and
/// transaction execution. All amounts are raw integer units.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Total balance of `coin_type` held by `owner`.
    async fn get_balance(&self, owner: &str, coin_type: &str) -> Result<u128, SwapError>;

    /// Every coin object of `coin_type` held by `owner`.
    async fn get_coins(&self, owner: &str, coin_type: &str) -> Result<Vec<CoinObject>, SwapError>;

    /// Decimal precision from on-chain metadata; `None` when unpublished.
    async fn get_coin_decimals(&self, coin_type: &str) -> Result<Option<u8>, SwapError>;

    async fn get_reference_gas_price(&self) -> Result<u64, SwapError>;

    /// Initial shared version of a shared object.
    async fn get_shared_object_version(&self, object_id: &str) -> Result<u64, SwapError>;

    /// Submit signed transaction bytes and wait for local execution.
    async fn execute_transaction(
        &self,
        tx_bytes: &[u8],
        signature: &str,
    ) -> Result<ExecutionResponse, SwapError>;
}
