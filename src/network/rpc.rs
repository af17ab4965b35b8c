// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Typed wrapper over Ethereum JSON-RPC. Every method returns either data or
//! an error that distinguishes transport failure, decode failure and
//! missing data, so callers can pick a retry policy per class.

use crate::common::error::AppError;
use crate::common::parsing::{
    canonical_address, canonical_hash, parse_address_hex, parse_b256_hex, parse_hex_bytes,
    parse_u64_hex, parse_u128_hex, parse_u256_hex,
};
use crate::common::retry::retry_async;
use alloy::primitives::{Address, B256, U256};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// The exact substring unreliable public endpoints produce when they hand
/// back a truncated body. Receipt fetches retry on this and nothing else.
pub const TRUNCATED_JSON_MARKER: &str = "unexpected end of JSON input";

// Initial attempt plus three retries, backing off 300/600/900 ms.
const RECEIPT_RETRY_ATTEMPTS: usize = 4;
const RECEIPT_RETRY_STEP_MS: u64 = 300;

#[derive(Debug, Clone, Deserialize)]
struct RpcEnvelope {
    result: Option<serde_json::Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcBlock {
    pub number: String,
    pub hash: Option<String>,
    pub timestamp: String,
    #[serde(default)]
    pub transactions: Vec<RpcTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcTransaction {
    pub hash: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: String,
    #[serde(rename = "gasPrice")]
    pub gas_price: Option<String>,
    #[serde(rename = "maxFeePerGas")]
    pub max_fee_per_gas: Option<String>,
    #[serde(default)]
    pub input: String,
    #[serde(rename = "transactionIndex")]
    pub transaction_index: Option<String>,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
    /// Reorg signal, when the node supplies one. Plugins must drop
    /// transactions flagged removed.
    #[serde(default)]
    pub removed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcReceipt {
    pub status: Option<String>,
    #[serde(rename = "gasUsed")]
    pub gas_used: Option<String>,
    #[serde(rename = "effectiveGasPrice")]
    pub effective_gas_price: Option<String>,
    #[serde(rename = "transactionIndex")]
    pub transaction_index: Option<String>,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
    #[serde(rename = "contractAddress")]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub logs: Vec<RpcLog>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcLog {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub removed: bool,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: Option<String>,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
}

impl RpcBlock {
    pub fn number_u64(&self) -> u64 {
        parse_u64_hex(&self.number).unwrap_or_default()
    }

    pub fn timestamp_u64(&self) -> u64 {
        parse_u64_hex(&self.timestamp).unwrap_or_default()
    }
}

impl RpcTransaction {
    pub fn hash_b256(&self) -> Option<B256> {
        parse_b256_hex(&self.hash)
    }

    pub fn from_address(&self) -> Option<Address> {
        self.from.as_deref().and_then(parse_address_hex)
    }

    pub fn to_address(&self) -> Option<Address> {
        self.to.as_deref().and_then(parse_address_hex)
    }

    /// Contract creation: the envelope has no `to`.
    pub fn is_create(&self) -> bool {
        self.to_address().is_none()
    }

    pub fn value_wei(&self) -> U256 {
        parse_u256_hex(&self.value).unwrap_or(U256::ZERO)
    }

    pub fn gas_price_wei(&self) -> Option<u128> {
        self.gas_price
            .as_deref()
            .and_then(parse_u128_hex)
            .or_else(|| self.max_fee_per_gas.as_deref().and_then(parse_u128_hex))
    }

    pub fn block_number_u64(&self) -> u64 {
        self.block_number
            .as_deref()
            .and_then(parse_u64_hex)
            .unwrap_or_default()
    }

    pub fn index_u64(&self) -> Option<u64> {
        self.transaction_index.as_deref().and_then(parse_u64_hex)
    }
}

impl RpcReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref().and_then(parse_u64_hex) == Some(1)
    }

    pub fn gas_used_u64(&self) -> u64 {
        self.gas_used
            .as_deref()
            .and_then(parse_u64_hex)
            .unwrap_or_default()
    }

    pub fn effective_gas_price_wei(&self) -> Option<u128> {
        self.effective_gas_price.as_deref().and_then(parse_u128_hex)
    }

    pub fn index_u64(&self) -> Option<u64> {
        self.transaction_index.as_deref().and_then(parse_u64_hex)
    }

    pub fn contract_address_parsed(&self) -> Option<Address> {
        self.contract_address.as_deref().and_then(parse_address_hex)
    }
}

impl RpcLog {
    pub fn address_parsed(&self) -> Option<Address> {
        parse_address_hex(&self.address)
    }

    pub fn topic0(&self) -> Option<B256> {
        self.topics.first().and_then(|t| parse_b256_hex(t))
    }

    pub fn topic(&self, idx: usize) -> Option<B256> {
        self.topics.get(idx).and_then(|t| parse_b256_hex(t))
    }

    pub fn data_bytes(&self) -> Vec<u8> {
        parse_hex_bytes(&self.data).unwrap_or_default()
    }

    pub fn tx_hash_b256(&self) -> Option<B256> {
        self.transaction_hash.as_deref().and_then(parse_b256_hex)
    }

    pub fn block_number_u64(&self) -> u64 {
        self.block_number
            .as_deref()
            .and_then(parse_u64_hex)
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct RpcClient {
    client: Client,
    endpoint: String,
}

impl RpcClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Initialization(format!("RPC client init failed: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1u64,
            "method": method,
            "params": params,
        });
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Connection(format!("RPC request failed ({method}): {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::ApiCall {
                provider: "json-rpc".into(),
                status: resp.status().as_u16(),
            });
        }
        let body = resp
            .text()
            .await
            .map_err(|e| AppError::Connection(format!("RPC body read failed ({method}): {e}")))?;
        let envelope: RpcEnvelope = serde_json::from_str(&body).map_err(|e| {
            if e.is_eof() {
                AppError::Decode(TRUNCATED_JSON_MARKER.to_string())
            } else {
                AppError::Decode(format!("RPC decode failed ({method}): {e}"))
            }
        })?;
        if let Some(err) = envelope.error {
            return Err(AppError::Rpc {
                method: method.to_string(),
                reason: format!("code={} message={}", err.code, err.message),
            });
        }
        Ok(envelope.result.unwrap_or(serde_json::Value::Null))
    }

    fn decode_result<T: serde::de::DeserializeOwned>(
        method: &str,
        value: serde_json::Value,
    ) -> Result<T, AppError> {
        serde_json::from_value(value)
            .map_err(|e| AppError::Decode(format!("{method} result decode failed: {e}")))
    }

    pub async fn latest_block_number(&self) -> Result<u64, AppError> {
        let result = self.request("eth_blockNumber", json!([])).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| AppError::Decode("eth_blockNumber result was not a string".into()))?;
        parse_u64_hex(hex)
            .ok_or_else(|| AppError::Decode(format!("Invalid eth_blockNumber hex: {hex}")))
    }

    pub async fn block_by_number(&self, number: u64) -> Result<RpcBlock, AppError> {
        let tag = format!("0x{number:x}");
        let result = self
            .request("eth_getBlockByNumber", json!([tag, true]))
            .await?;
        if result.is_null() {
            return Err(AppError::NotFound(format!("block {number}")));
        }
        Self::decode_result("eth_getBlockByNumber", result)
    }

    pub async fn block_by_hash(&self, hash: B256) -> Result<RpcBlock, AppError> {
        let result = self
            .request("eth_getBlockByHash", json!([canonical_hash(hash), true]))
            .await?;
        if result.is_null() {
            return Err(AppError::NotFound(format!("block {hash:#x}")));
        }
        Self::decode_result("eth_getBlockByHash", result)
    }

    /// Receipt fetch with the bounded truncated-JSON retry: up to three
    /// attempts at 300 ms / 600 ms / 900 ms, and only when the decoder saw a
    /// truncated body. Every other error propagates on the first attempt.
    pub async fn receipt(&self, tx_hash: B256) -> Result<RpcReceipt, AppError> {
        retry_async(
            |_| self.receipt_once(tx_hash),
            RECEIPT_RETRY_ATTEMPTS,
            Duration::from_millis(RECEIPT_RETRY_STEP_MS),
            is_truncated_json_error,
        )
        .await
    }

    async fn receipt_once(&self, tx_hash: B256) -> Result<RpcReceipt, AppError> {
        let result = self
            .request("eth_getTransactionReceipt", json!([canonical_hash(tx_hash)]))
            .await?;
        if result.is_null() {
            return Err(AppError::NotFound(format!("receipt {tx_hash:#x}")));
        }
        Self::decode_result("eth_getTransactionReceipt", result)
    }

    pub async fn filter_logs(
        &self,
        from_block: u64,
        to_block: u64,
        addresses: &[Address],
        topics: &[B256],
    ) -> Result<Vec<RpcLog>, AppError> {
        let addr_list: Vec<String> = addresses.iter().map(|a| canonical_address(*a)).collect();
        let topic_list: Vec<String> = topics.iter().map(|t| canonical_hash(*t)).collect();
        let mut filter = json!({
            "fromBlock": format!("0x{from_block:x}"),
            "toBlock": format!("0x{to_block:x}"),
        });
        if !addr_list.is_empty() {
            filter["address"] = json!(addr_list);
        }
        if !topic_list.is_empty() {
            filter["topics"] = json!([topic_list]);
        }
        let result = self.request("eth_getLogs", json!([filter])).await?;
        Self::decode_result("eth_getLogs", result)
    }

    pub async fn code_at(&self, address: Address) -> Result<Vec<u8>, AppError> {
        let result = self
            .request("eth_getCode", json!([canonical_address(address), "latest"]))
            .await?;
        let hex = result
            .as_str()
            .ok_or_else(|| AppError::Decode("eth_getCode result was not a string".into()))?;
        parse_hex_bytes(hex).ok_or_else(|| AppError::Decode("eth_getCode returned invalid hex".into()))
    }

    /// `eth_call` against latest. `data` is selector + arguments.
    pub async fn call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, AppError> {
        let call_obj = json!({
            "to": canonical_address(to),
            "data": format!("0x{}", hex::encode(data)),
        });
        let result = self.request("eth_call", json!([call_obj, "latest"])).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| AppError::Decode("eth_call result was not a string".into()))?;
        parse_hex_bytes(hex).ok_or_else(|| AppError::Decode("eth_call returned invalid hex".into()))
    }
}

pub fn is_truncated_json_error(err: &AppError) -> bool {
    matches!(err, AppError::Decode(msg) if msg.contains(TRUNCATED_JSON_MARKER))
}
