//! Submission and result interpretation.
//!
//! Resolves shared-object versions, picks gas, signs and executes a
//! `PendingTransaction`, then folds the network's answer (or any error on
//! the way) into a `SwapOutcome`. Never retries.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::engine::builder::PendingTransaction;
use crate::keys::SigningIdentity;
use crate::ledger::transaction::{format_address, parse_address, GasData, ObjectRef, TransactionData};
use crate::ledger::{ExecutionResponse, LedgerClient};
use crate::types::{SwapError, SwapOutcome, SUI_COIN_TYPE};

pub struct Submitter {
    ledger: Arc<dyn LedgerClient>,
    identity: Arc<SigningIdentity>,
    gas_budget: u64,
}

impl Submitter {
    pub fn new(ledger: Arc<dyn LedgerClient>, identity: Arc<SigningIdentity>, gas_budget: u64) -> Self {
        Self {
            ledger,
            identity,
            gas_budget,
        }
    }

    /// Sign, submit and interpret. Every failure becomes a failed outcome.
    pub async fn submit(&self, pending: PendingTransaction) -> SwapOutcome {
        match self.execute(&pending).await {
            Ok(resp) => interpret(&pending, resp),
            Err(e) => {
                warn!(direction = %pending.direction, error = %e, "Swap submission failed");
                SwapOutcome::failed(
                    e.to_string(),
                    pending.amount,
                    &pending.from_token,
                    &pending.to_token,
                )
            }
        }
    }

    async fn execute(&self, pending: &PendingTransaction) -> Result<ExecutionResponse, SwapError> {
        let mut kind = pending.kind.clone();
        for id in kind.unresolved_shared() {
            let version = self
                .ledger
                .get_shared_object_version(&format_address(&id))
                .await?;
            kind.resolve_shared(&id, version);
        }

        let payment = match &pending.gas_payment {
            Some(coins) => coins.clone(),
            None => self.select_gas(&kind.owned_inputs()).await?,
        };
        let price = self.ledger.get_reference_gas_price().await?;
        let sender = parse_address(self.identity.address())?;

        let data = TransactionData {
            sender,
            kind,
            gas: GasData {
                payment,
                owner: sender,
                price,
                budget: self.gas_budget,
            },
        };
        let tx_bytes = data.to_bytes()?;
        let signature = self.identity.sign_transaction(&tx_bytes);

        debug!(bytes = tx_bytes.len(), gas_price = price, "Submitting transaction");
        self.ledger.execute_transaction(&tx_bytes, &signature).await
    }

    /// Largest SUI coins not already used as inputs, until the budget is
    /// covered.
    async fn select_gas(&self, exclude: &[[u8; 32]]) -> Result<Vec<ObjectRef>, SwapError> {
        let mut coins = self
            .ledger
            .get_coins(self.identity.address(), SUI_COIN_TYPE)
            .await?;
        coins.retain(|c| !exclude.contains(&c.object_ref.object_id));
        coins.sort_by(|a, b| b.balance.cmp(&a.balance));

        let mut selected = Vec::new();
        let mut covered: u128 = 0;
        for coin in coins {
            if covered >= u128::from(self.gas_budget) {
                break;
            }
            covered += u128::from(coin.balance);
            selected.push(coin.object_ref);
        }

        if selected.is_empty() {
            return Err(SwapError::Infrastructure("No SUI coins available for gas".into()));
        }
        if covered < u128::from(self.gas_budget) {
            warn!(
                available = covered as u64,
                budget = self.gas_budget,
                "Gas coins do not cover the budget"
            );
        }
        Ok(selected)
    }
}

/// Map the ledger's verdict to an outcome.
fn interpret(pending: &PendingTransaction, resp: ExecutionResponse) -> SwapOutcome {
    if resp.success {
        info!(
            digest = %resp.digest,
            events = resp.event_count,
            "Transaction executed"
        );
        SwapOutcome::succeeded(
            resp.digest,
            pending.amount,
            &pending.from_token,
            &pending.to_token,
            resp.gas_cost.map(|g| g.net_sui()),
        )
    } else {
        let reason = resp.error.unwrap_or_else(|| "unknown failure".to_string());
        warn!(digest = %resp.digest, error = %reason, "Transaction failed on-chain");
        SwapOutcome::failed(
            SwapError::ProtocolExecution(reason).to_string(),
            pending.amount,
            &pending.from_token,
            &pending.to_token,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
