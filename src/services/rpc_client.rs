//! JSON-RPC client for an Ethereum-compatible node

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::abi::{self, AbiError};
use crate::models::Address;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("node returned error {code}: {message}")]
    Node { code: i64, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<AbiError> for RpcError {
    fn from(err: AbiError) -> Self {
        RpcError::Malformed(err.to_string())
    }
}

/// Transaction fields for `eth_call` and `eth_sendTransaction`.
/// The node signs sends with its own unlocked accounts.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    pub data: String,
}

impl TransactionRequest {
    pub fn new(to: Address, data: &[u8]) -> Self {
        Self {
            from: None,
            to,
            value: None,
            gas: None,
            data: abi::to_hex(data),
        }
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn value(mut self, value: u128) -> Self {
        self.value = Some(quantity(value));
        self
    }

    pub fn gas(mut self, gas: u64) -> Self {
        self.gas = Some(quantity(gas.into()));
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    pub from_block: String,
    pub to_block: String,
}

/// A log entry as returned by `eth_getLogs`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

impl Log {
    pub fn block(&self) -> Option<u64> {
        self.block_number
            .as_deref()
            .and_then(|raw| parse_quantity(raw).ok())
            .and_then(|block| u64::try_from(block).ok())
    }
}

/// The receipt fields the client inspects
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
    /// `0x1` once executed, `0x0` when the transaction reverted
    #[serde(default)]
    pub status: Option<String>,
}

impl TransactionReceipt {
    /// Pre-Byzantium receipts carry no status and are treated as executed.
    pub fn reverted(&self) -> bool {
        matches!(self.status.as_deref().map(parse_quantity), Some(Ok(0)))
    }
}

#[derive(Clone)]
pub struct RpcClient {
    url: String,
    http: Client,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: Client::new(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .http
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        parse_response(response)
    }

    pub async fn block_number(&self) -> Result<u64, RpcError> {
        let result = self.request("eth_blockNumber", json!([])).await?;
        let block = parse_quantity(as_str(&result)?)?;
        u64::try_from(block).map_err(|_| RpcError::Malformed(format!("block number {block} out of range")))
    }

    pub async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        let result = self.request("eth_accounts", json!([])).await?;
        serde_json::from_value(result).map_err(|err| RpcError::Malformed(err.to_string()))
    }

    pub async fn call(&self, tx: &TransactionRequest) -> Result<Vec<u8>, RpcError> {
        let result = self.request("eth_call", json!([tx, "latest"])).await?;
        Ok(abi::from_hex(as_str(&result)?)?)
    }

    /// Returns the transaction hash.
    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, RpcError> {
        let result = self.request("eth_sendTransaction", json!([tx])).await?;
        Ok(as_str(&result)?.to_string())
    }

    /// `None` while the transaction is still pending.
    pub async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, RpcError> {
        let result = self.request("eth_getTransactionReceipt", json!([tx_hash])).await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result)
            .map(Some)
            .map_err(|err| RpcError::Malformed(err.to_string()))
    }

    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, RpcError> {
        let result = self.request("eth_getLogs", json!([filter])).await?;
        serde_json::from_value(result).map_err(|err| RpcError::Malformed(err.to_string()))
    }
}

fn parse_response(response: Value) -> Result<Value, RpcError> {
    if let Some(error) = response.get("error") {
        return Err(RpcError::Node {
            code: error.pointer("/code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .pointer("/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    response
        .get("result")
        .cloned()
        .ok_or_else(|| RpcError::Malformed("missing result in RPC response".to_string()))
}

fn as_str(value: &Value) -> Result<&str, RpcError> {
    value
        .as_str()
        .ok_or_else(|| RpcError::Malformed(format!("expected hex string, got {value}")))
}

/// `0x`-prefixed minimal hex, as the JSON-RPC quantity encoding requires.
pub fn quantity(value: u128) -> String {
    format!("{value:#x}")
}

pub fn parse_quantity(raw: &str) -> Result<u128, RpcError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::Malformed(format!("quantity {raw} is missing 0x prefix")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|err| RpcError::Malformed(format!("quantity {raw}: {err}")))
}
