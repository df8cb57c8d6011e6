//! JSON-RPC client for the L2 (zkSync-style) source chain
//!
//! Talks plain JSON-RPC over reqwest: `eth_*` for blocks and receipts and
//! `zks_getL2ToL1LogProof` for inclusion proofs.

use alloy::primitives::B256;
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::{InclusionProof, ProofService, SourceBlock, SourceGateway, SourceReceipt};

/// Failure talking to a JSON-RPC endpoint
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed {method} response: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON-RPC response wrapper
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// `zks_getL2ToL1LogProof` result
#[derive(Debug, Deserialize)]
struct LogProofResponse {
    id: u64,
    proof: Vec<B256>,
    root: B256,
}

/// L2 JSON-RPC client
pub struct ZkRpcClient {
    rpc_url: String,
    client: Client,
}

impl ZkRpcClient {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .wrap_err("Failed to build HTTP client")?;

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            client,
        })
    }

    /// Issue one JSON-RPC request. A `null` result maps to `Ok(None)`.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> std::result::Result<Option<T>, GatewayError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .json::<RpcResponse>()
            .await?;

        if let Some(error) = response.error {
            return Err(GatewayError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        match response.result {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| GatewayError::Decode {
                    method: method.to_string(),
                    source,
                }),
        }
    }
}

#[async_trait]
impl SourceGateway for ZkRpcClient {
    async fn block_number(&self) -> Result<u64> {
        let hex: String = self
            .request("eth_blockNumber", json!([]))
            .await?
            .ok_or_else(|| eyre!("No block number returned"))?;
        let number = u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .wrap_err_with(|| format!("Invalid block number {}", hex))?;
        Ok(number)
    }

    async fn block_with_transactions(&self, number: u64) -> Result<SourceBlock> {
        self.request("eth_getBlockByNumber", json!([format!("0x{:x}", number), true]))
            .await?
            .ok_or_else(|| eyre!("Block {} not found", number))
    }

    async fn receipt(&self, tx_hash: B256) -> Result<Option<SourceReceipt>> {
        let receipt = self
            .request("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        Ok(receipt)
    }
}

#[async_trait]
impl ProofService for ZkRpcClient {
    async fn inclusion_proof(
        &self,
        tx_hash: B256,
        log_index: u64,
    ) -> Result<Option<InclusionProof>> {
        let Some(proof) = self
            .request::<LogProofResponse>("zks_getL2ToL1LogProof", json!([tx_hash, log_index]))
            .await?
        else {
            debug!(tx_hash = %tx_hash, log_index, "Log proof not available yet");
            return Ok(None);
        };

        let receipt = self
            .receipt(tx_hash)
            .await?
            .ok_or_else(|| eyre!("Receipt for {} disappeared", tx_hash))?;
        let Some(batch_number) = receipt.l1_batch_number else {
            // proof without a sealed batch cannot be submitted yet
            return Ok(None);
        };

        Ok(Some(InclusionProof {
            batch_number: batch_number.to(),
            message_index: proof.id,
            proof: proof.proof,
            root: proof.root,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_display() {
        let err = GatewayError::Rpc {
            code: -32000,
            message: "batch not executed yet".to_string(),
        };
        assert_eq!(err.to_string(), "RPC error -32000: batch not executed yet");
    }

    #[test]
    fn test_log_proof_response_parse() {
        let json = r#"{
            "id": 4,
            "proof": ["0x0101010101010101010101010101010101010101010101010101010101010101"],
            "root": "0x0202020202020202020202020202020202020202020202020202020202020202"
        }"#;
        let proof: LogProofResponse = serde_json::from_str(json).unwrap();
        assert_eq!(proof.id, 4);
        assert_eq!(proof.proof.len(), 1);
        assert_eq!(proof.root, B256::repeat_byte(2));
    }

    #[test]
    fn test_rpc_response_with_error() {
        let json = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"bad params"}}"#;
        let response: RpcResponse = serde_json::from_str(json).unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().message, "bad params");
    }

    #[test]
    fn test_client_creation() {
        assert!(ZkRpcClient::new("http://localhost:3050").is_ok());
    }
}
