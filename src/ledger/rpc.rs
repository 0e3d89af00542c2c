//! Sui fullnode JSON-RPC client.
//!
//! Docs: https://docs.sui.io/sui-api-ref
//! Every call is a JSON-RPC 2.0 POST to the configured endpoint. An
//! `error` object in the reply and any transport failure both surface as
//! `SwapError::Infrastructure`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::transaction::ObjectRef;
use super::{CoinObject, ExecutionResponse, GasCost, LedgerClient};
use crate::types::SwapError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const USER_AGENT: &str = "momentum-bot/0.1.0";

/// Upper bound on `suix_getCoins` pages (50 coins each).
const MAX_COIN_PAGES: usize = 100;

// ---------------------------------------------------------------------------
// RPC response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceResult {
    total_balance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinPage {
    data: Vec<RpcCoin>,
    next_cursor: Option<String>,
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcCoin {
    coin_type: String,
    coin_object_id: String,
    version: String,
    digest: String,
    balance: String,
}

#[derive(Debug, Deserialize)]
struct CoinMetadata {
    decimals: u8,
}

#[derive(Debug, Deserialize)]
struct ObjectResult {
    data: Option<ObjectData>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ObjectData {
    owner: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteResult {
    digest: String,
    effects: Option<Effects>,
    #[serde(default)]
    events: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Effects {
    status: ExecutionStatus,
    gas_used: Option<GasUsed>,
}

#[derive(Debug, Deserialize)]
struct ExecutionStatus {
    status: String,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GasUsed {
    computation_cost: String,
    storage_cost: String,
    storage_rebate: String,
}

fn parse_u64(field: &str, s: &str) -> Result<u64, SwapError> {
    s.parse()
        .map_err(|e| SwapError::Infrastructure(format!("Bad {field} '{s}': {e}")))
}

fn parse_u128(field: &str, s: &str) -> Result<u128, SwapError> {
    s.parse()
        .map_err(|e| SwapError::Infrastructure(format!("Bad {field} '{s}': {e}")))
}

impl RpcCoin {
    fn into_coin(self) -> Result<CoinObject, SwapError> {
        let version = parse_u64("coin version", &self.version)?;
        Ok(CoinObject {
            object_ref: ObjectRef::from_rpc(&self.coin_object_id, version, &self.digest)?,
            balance: parse_u64("coin balance", &self.balance)?,
            coin_type: self.coin_type,
        })
    }
}

impl GasUsed {
    fn to_cost(&self) -> Result<GasCost, SwapError> {
        Ok(GasCost {
            computation: parse_u64("computationCost", &self.computation_cost)?,
            storage: parse_u64("storageCost", &self.storage_cost)?,
            rebate: parse_u64("storageRebate", &self.storage_rebate)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// JSON-RPC client for a Sui fullnode.
pub struct SuiRpcClient {
    http: Client,
    url: String,
    next_id: AtomicU64,
}

impl SuiRpcClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, SwapError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SwapError::Infrastructure(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC call and decode its `result`.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, SwapError> {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| SwapError::Infrastructure(format!("{method}: empty result")))
    }

    /// Like `call`, but a `null` result is `None` rather than an error.
    async fn call_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, SwapError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, "Sui RPC request");

        let resp = self.http.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SwapError::Infrastructure(format!(
                "{method}: HTTP {status}: {text}"
            )));
        }

        let envelope: RpcEnvelope<T> = resp.json().await.map_err(|e| {
            SwapError::Infrastructure(format!("{method}: failed to parse response: {e}"))
        })?;

        if let Some(err) = envelope.error {
            return Err(SwapError::Infrastructure(format!(
                "{method}: RPC error {}: {}",
                err.code, err.message
            )));
        }

        Ok(envelope.result)
    }
}

#[async_trait]
impl LedgerClient for SuiRpcClient {
    async fn get_balance(&self, owner: &str, coin_type: &str) -> Result<u128, SwapError> {
        let result: BalanceResult = self
            .call("suix_getBalance", json!([owner, coin_type]))
            .await?;
        parse_u128("totalBalance", &result.total_balance)
    }

    async fn get_coins(&self, owner: &str, coin_type: &str) -> Result<Vec<CoinObject>, SwapError> {
        let mut coins = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_COIN_PAGES {
            let page: CoinPage = self
                .call("suix_getCoins", json!([owner, coin_type, cursor, null]))
                .await?;

            for coin in page.data {
                coins.push(coin.into_coin()?);
            }

            match page.next_cursor {
                Some(next) if page.has_next_page => cursor = Some(next),
                _ => return Ok(coins),
            }
        }

        warn!(owner, coin_type, pages = MAX_COIN_PAGES, "Coin listing truncated");
        Ok(coins)
    }

    async fn get_coin_decimals(&self, coin_type: &str) -> Result<Option<u8>, SwapError> {
        let meta: Option<CoinMetadata> = self
            .call_optional("suix_getCoinMetadata", json!([coin_type]))
            .await?;
        Ok(meta.map(|m| m.decimals))
    }

    async fn get_reference_gas_price(&self) -> Result<u64, SwapError> {
        // Returned as a string by current nodes, as a number by older ones.
        let value: Value = self.call("suix_getReferenceGasPrice", json!([])).await?;
        match &value {
            Value::String(s) => parse_u64("reference gas price", s),
            Value::Number(n) => n.as_u64().ok_or_else(|| {
                SwapError::Infrastructure(format!("Bad reference gas price {n}"))
            }),
            other => Err(SwapError::Infrastructure(format!(
                "Bad reference gas price {other}"
            ))),
        }
    }

    async fn get_shared_object_version(&self, object_id: &str) -> Result<u64, SwapError> {
        let result: ObjectResult = self
            .call("sui_getObject", json!([object_id, { "showOwner": true }]))
            .await?;

        if let Some(err) = result.error {
            return Err(SwapError::Infrastructure(format!(
                "Object {object_id} unavailable: {err}"
            )));
        }

        let owner = result.data.and_then(|d| d.owner).ok_or_else(|| {
            SwapError::Infrastructure(format!("Object {object_id} has no owner info"))
        })?;

        let version = owner
            .get("Shared")
            .and_then(|s| s.get("initial_shared_version"))
            .ok_or_else(|| {
                SwapError::Infrastructure(format!("Object {object_id} is not shared"))
            })?;

        match version {
            Value::Number(n) => n.as_u64().ok_or_else(|| {
                SwapError::Infrastructure(format!("Bad shared version for {object_id}"))
            }),
            Value::String(s) => parse_u64("initial_shared_version", s),
            _ => Err(SwapError::Infrastructure(format!(
                "Bad shared version for {object_id}"
            ))),
        }
    }

    async fn execute_transaction(
        &self,
        tx_bytes: &[u8],
        signature: &str,
    ) -> Result<ExecutionResponse, SwapError> {
        let params = json!([
            BASE64.encode(tx_bytes),
            [signature],
            { "showEffects": true, "showEvents": true },
            "WaitForLocalExecution",
        ]);
        let result: ExecuteResult = self.call("sui_executeTransactionBlock", params).await?;

        let (success, error, gas_cost) = match result.effects {
            Some(effects) => {
                let gas_cost = match effects.gas_used {
                    Some(g) => Some(g.to_cost()?),
                    None => None,
                };
                let success = effects.status.status == "success";
                let error = if success {
                    None
                } else {
                    Some(
                        effects
                            .status
                            .error
                            .unwrap_or_else(|| effects.status.status.clone()),
                    )
                };
                (success, error, gas_cost)
            }
            None => (false, Some("No effects returned".to_string()), None),
        };

        Ok(ExecutionResponse {
            digest: result.digest,
            success,
            error,
            gas_cost,
            event_count: result.events.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
