//! Mock ledger for integration testing.
//!
//! Provides a deterministic `LedgerClient` implementation that serves
//! balances and coins from memory, accepts every signed transaction (or
//! rejects them on demand) and records what was submitted. No network.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use momentum_bot::ledger::transaction::ObjectRef;
use momentum_bot::ledger::{CoinObject, ExecutionResponse, GasCost, LedgerClient};
use momentum_bot::types::SwapError;

#[derive(Default)]
struct LedgerState {
    balances: HashMap<String, u128>,
    decimals: HashMap<String, u8>,
    coin_ids: HashMap<String, u8>,
    executions: Vec<Vec<u8>>,
    /// If set, every read returns this infrastructure error.
    force_error: Option<String>,
    /// If set, transactions execute but fail on-chain with this reason.
    onchain_failure: Option<String>,
    /// If set, each execution takes this long to come back.
    execution_delay: Option<Duration>,
}

/// An in-memory Sui ledger for one wallet.
///
/// Cloning shares state, so a test can keep a handle after giving the
/// ledger to the controller.
#[derive(Clone, Default)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw balance of `coin_type`, served as a single coin.
    pub fn set_balance(&self, coin_type: &str, raw: u128) {
        let mut state = self.state.lock().unwrap();
        let next_id = state.coin_ids.len() as u8 + 1;
        state.coin_ids.entry(coin_type.to_string()).or_insert(next_id);
        state.balances.insert(coin_type.to_string(), raw);
    }

    /// Publish metadata decimals for `coin_type`.
    pub fn set_decimals(&self, coin_type: &str, decimals: u8) {
        self.state
            .lock()
            .unwrap()
            .decimals
            .insert(coin_type.to_string(), decimals);
    }

    /// Force all subsequent reads to return an error.
    pub fn set_error(&self, msg: &str) {
        self.state.lock().unwrap().force_error = Some(msg.to_string());
    }

    /// Clear any forced error.
    pub fn clear_error(&self) {
        self.state.lock().unwrap().force_error = None;
    }

    /// Make every subsequent transaction fail on-chain.
    pub fn set_onchain_failure(&self, reason: &str) {
        self.state.lock().unwrap().onchain_failure = Some(reason.to_string());
    }

    pub fn clear_onchain_failure(&self) {
        self.state.lock().unwrap().onchain_failure = None;
    }

    /// Hold every subsequent execution for `delay` before answering.
    pub fn set_execution_delay(&self, delay: Duration) {
        self.state.lock().unwrap().execution_delay = Some(delay);
    }

    /// Number of transactions submitted so far.
    pub fn execution_count(&self) -> usize {
        self.state.lock().unwrap().executions.len()
    }

    fn check_error(&self) -> Result<(), SwapError> {
        match &self.state.lock().unwrap().force_error {
            Some(err) => Err(SwapError::Infrastructure(err.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_balance(&self, _owner: &str, coin_type: &str) -> Result<u128, SwapError> {
        self.check_error()?;
        let state = self.state.lock().unwrap();
        Ok(state.balances.get(coin_type).copied().unwrap_or(0))
    }

    async fn get_coins(&self, _owner: &str, coin_type: &str) -> Result<Vec<CoinObject>, SwapError> {
        self.check_error()?;
        let state = self.state.lock().unwrap();
        let balance = state.balances.get(coin_type).copied().unwrap_or(0);
        if balance == 0 {
            return Ok(Vec::new());
        }
        let id = state.coin_ids.get(coin_type).copied().unwrap_or(0);
        Ok(vec![CoinObject {
            coin_type: coin_type.to_string(),
            object_ref: ObjectRef {
                object_id: [id; 32],
                version: 7,
                digest: [id; 32],
            },
            balance: u64::try_from(balance).unwrap_or(u64::MAX),
        }])
    }

    async fn get_coin_decimals(&self, coin_type: &str) -> Result<Option<u8>, SwapError> {
        self.check_error()?;
        Ok(self.state.lock().unwrap().decimals.get(coin_type).copied())
    }

    async fn get_reference_gas_price(&self) -> Result<u64, SwapError> {
        self.check_error()?;
        Ok(750)
    }

    async fn get_shared_object_version(&self, _object_id: &str) -> Result<u64, SwapError> {
        self.check_error()?;
        Ok(1)
    }

    async fn execute_transaction(
        &self,
        tx_bytes: &[u8],
        signature: &str,
    ) -> Result<ExecutionResponse, SwapError> {
        self.check_error()?;
        assert!(!signature.is_empty(), "unsigned transaction submitted");

        let delay = self.state.lock().unwrap().execution_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.executions.push(tx_bytes.to_vec());
        let digest = format!("MOCKDIGEST{}", state.executions.len());

        Ok(match &state.onchain_failure {
            Some(reason) => ExecutionResponse {
                digest,
                success: false,
                error: Some(reason.clone()),
                gas_cost: None,
                event_count: 0,
            },
            None => ExecutionResponse {
                digest,
                success: true,
                error: None,
                gas_cost: Some(GasCost {
                    computation: 1_000_000,
                    storage: 2_000_000,
                    rebate: 1_000_000,
                }),
                event_count: 2,
            },
        })
    }
}
