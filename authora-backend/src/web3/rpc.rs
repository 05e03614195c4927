//! Minimal EVM JSON-RPC client
//!
//! Plain HTTP JSON-RPC against the configured node. Quantities come back as
//! 0x-prefixed hex strings and are parsed into `U256`.

use ethers::types::{Address, Bytes, H256, U256};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct EvmRpc {
    client: Client,
    rpc_url: String,
}

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    method: String,
    params: Value,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

fn parse_quantity(result: &Value, what: &str) -> Result<U256, String> {
    let hex_str = result
        .as_str()
        .ok_or_else(|| format!("Invalid {} response", what))?;

    U256::from_str_radix(hex_str.trim_start_matches("0x"), 16)
        .map_err(|e| format!("Failed to parse {}: {}", what, e))
}

impl EvmRpc {
    pub fn new(rpc_url: &str) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
        })
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, String> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: method.to_string(),
            params,
            id: 1,
        };

        log::debug!("[RPC] {} to {} with params: {:?}", method, self.rpc_url, request.params);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("RPC request {} failed: {}", method, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {}", e))?;

        if !status.is_success() {
            return Err(format!(
                "RPC error ({}) from {}: {}",
                status,
                self.rpc_url,
                if body.is_empty() { "empty response" } else { &body }
            ));
        }

        let rpc_response: JsonRpcResponse = serde_json::from_str(&body)
            .map_err(|e| format!("Failed to parse RPC response: {} - body: {}", e, body))?;

        if let Some(error) = rpc_response.error {
            return Err(format!("RPC error {}: {}", error.code, error.message));
        }

        rpc_response.result.ok_or_else(|| "RPC returned null result".to_string())
    }

    /// Native balance in wei
    pub async fn get_balance(&self, address: Address) -> Result<U256, String> {
        let params = json!([format!("{:?}", address), "latest"]);
        let result = self.rpc_call("eth_getBalance", params).await?;
        parse_quantity(&result, "balance")
    }

    /// Read-only contract call
    pub async fn eth_call(&self, to: Address, data: &[u8]) -> Result<Bytes, String> {
        let params = json!([
            {
                "to": format!("{:?}", to),
                "data": format!("0x{}", hex::encode(data))
            },
            "latest"
        ]);

        let result = self.rpc_call("eth_call", params).await?;

        let hex_str = result
            .as_str()
            .ok_or_else(|| "Invalid eth_call response".to_string())?;

        let bytes = hex::decode(hex_str.trim_start_matches("0x"))
            .map_err(|e| format!("Failed to decode eth_call result: {}", e))?;

        Ok(Bytes::from(bytes))
    }

    pub async fn estimate_gas(
        &self,
        from: Address,
        to: Address,
        data: &[u8],
        value: U256,
    ) -> Result<U256, String> {
        let params = json!([
            {
                "from": format!("{:?}", from),
                "to": format!("{:?}", to),
                "data": format!("0x{}", hex::encode(data)),
                "value": format!("0x{:x}", value)
            }
        ]);

        let result = self.rpc_call("eth_estimateGas", params).await?;
        parse_quantity(&result, "gas estimate")
    }

    pub async fn gas_price(&self) -> Result<U256, String> {
        let result = self.rpc_call("eth_gasPrice", json!([])).await?;
        parse_quantity(&result, "gas price")
    }

    pub async fn chain_id(&self) -> Result<u64, String> {
        let result = self.rpc_call("eth_chainId", json!([])).await?;
        Ok(parse_quantity(&result, "chain id")?.low_u64())
    }

    /// Pending nonce for an address
    pub async fn get_transaction_count(&self, address: Address) -> Result<U256, String> {
        let params = json!([format!("{:?}", address), "pending"]);
        let result = self.rpc_call("eth_getTransactionCount", params).await?;
        parse_quantity(&result, "nonce")
    }

    pub async fn send_raw_transaction(&self, signed_tx: &[u8]) -> Result<H256, String> {
        let params = json!([format!("0x{}", hex::encode(signed_tx))]);

        let result = self.rpc_call("eth_sendRawTransaction", params).await?;

        let hash_hex = result
            .as_str()
            .ok_or_else(|| "Invalid sendRawTransaction response".to_string())?;

        hash_hex
            .parse()
            .map_err(|e| format!("Failed to parse tx hash: {}", e))
    }
}
