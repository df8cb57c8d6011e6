//! Ledger gateway and proof service interfaces
//!
//! The relayer only talks to the chains through these traits:
//! - `SourceGateway` - L2 blocks and receipts (with L2 -> L1 logs)
//! - `ProofService` - Merkle inclusion proofs for L2 -> L1 logs
//! - `DestinationGateway` - L1 gas price, calls, submission, receipts
//! - `BaseTokenBridge` - base-token withdrawal status and finalization
//!
//! Concrete implementations live in the submodules.

use alloy::primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use eyre::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::types::WithdrawalPhase;

pub mod bridge;
pub mod l1;
pub mod zksync;

pub use bridge::NullifierBridge;
pub use l1::L1Client;
pub use zksync::{GatewayError, ZkRpcClient};

/// L2 block with the fields the scanner needs
#[derive(Debug, Clone, Deserialize)]
pub struct SourceBlock {
    pub number: U64,
    #[serde(default)]
    pub transactions: Vec<SourceTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceTransaction {
    pub hash: B256,
    pub from: Address,
}

/// L2 receipt augmented with the chain's native L2 -> L1 logs
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReceipt {
    pub transaction_hash: B256,
    pub status: Option<U64>,
    #[serde(default)]
    pub l1_batch_number: Option<U64>,
    #[serde(default)]
    pub logs: Vec<RawLog>,
    #[serde(default, rename = "l2ToL1Logs")]
    pub l2_to_l1_logs: Vec<CrossChainLog>,
}

impl SourceReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.map(|s| s == U64::from(1)).unwrap_or(false)
    }
}

/// Ordinary EVM event log
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub log_index: Option<U64>,
}

/// L2 -> L1 log entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossChainLog {
    pub sender: Address,
    pub key: B256,
    pub value: B256,
    #[serde(default)]
    pub tx_index_in_l1_batch: Option<U64>,
}

/// Merkle inclusion proof for one L2 -> L1 log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionProof {
    pub batch_number: u64,
    pub message_index: u64,
    pub proof: Vec<B256>,
    pub root: B256,
}

#[async_trait]
pub trait SourceGateway: Send + Sync {
    /// Latest L2 block number
    async fn block_number(&self) -> Result<u64>;

    /// Block `number` with full transaction objects
    async fn block_with_transactions(&self, number: u64) -> Result<SourceBlock>;

    /// Receipt with L2 -> L1 logs; `None` when the transaction is unknown
    async fn receipt(&self, tx_hash: B256) -> Result<Option<SourceReceipt>>;
}

#[async_trait]
pub trait ProofService: Send + Sync {
    /// Proof for the `log_index`-th L2 -> L1 log of `tx_hash`. `Ok(None)`
    /// means the proof is not available yet.
    async fn inclusion_proof(&self, tx_hash: B256, log_index: u64)
        -> Result<Option<InclusionProof>>;
}

#[async_trait]
pub trait DestinationGateway: Send + Sync {
    async fn gas_price(&self) -> Result<u128>;

    /// Read-only call against L1
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// Sign and broadcast a legacy-priced transaction, returning its hash
    async fn send_transaction(
        &self,
        to: Address,
        data: Bytes,
        value: U256,
        gas_price: u128,
    ) -> Result<B256>;

    /// Wait up to `timeout` for a receipt. `Ok(None)` on timeout, otherwise
    /// whether the transaction succeeded.
    async fn wait_for_receipt(&self, tx_hash: B256, timeout: Duration) -> Result<Option<bool>>;
}

#[async_trait]
pub trait BaseTokenBridge: Send + Sync {
    async fn withdrawal_status(&self, tx_hash: B256) -> Result<WithdrawalPhase>;

    /// Submit the finalization for a ready withdrawal
    async fn try_finalize_withdrawal(&self, tx_hash: B256) -> Result<B256>;

    /// Poll until the withdrawal reports finalized or `timeout` elapses
    async fn wait_for_withdrawal(&self, tx_hash: B256, timeout: Duration) -> Result<()>;
}

/// Gas price with the relayer's fixed 20% bump
pub fn bumped_gas_price(base: u128) -> u128 {
    base.saturating_mul(120) / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bumped_gas_price() {
        assert_eq!(bumped_gas_price(1_000_000_000), 1_200_000_000);
        assert_eq!(bumped_gas_price(0), 0);
        assert_eq!(bumped_gas_price(u128::MAX), u128::MAX / 100);
    }

    #[test]
    fn test_receipt_deserialize() {
        let json = r#"{
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "status": "0x1",
            "l1BatchNumber": "0x2a",
            "logs": [{
                "address": "0x0000000000000000000000000000000000008008",
                "topics": [],
                "data": "0x",
                "logIndex": "0x0"
            }],
            "l2ToL1Logs": [{
                "sender": "0x0000000000000000000000000000000000008008",
                "key": "0x000000000000000000000000aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "value": "0x2222222222222222222222222222222222222222222222222222222222222222",
                "txIndexInL1Batch": "0x5",
                "isService": true
            }]
        }"#;
        let receipt: SourceReceipt = serde_json::from_str(json).unwrap();
        assert!(receipt.succeeded());
        assert_eq!(receipt.l1_batch_number, Some(U64::from(42)));
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.l2_to_l1_logs.len(), 1);
        assert_eq!(
            receipt.l2_to_l1_logs[0].tx_index_in_l1_batch,
            Some(U64::from(5))
        );
    }

    #[test]
    fn test_failed_receipt() {
        let json = r#"{
            "transactionHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "status": "0x0"
        }"#;
        let receipt: SourceReceipt = serde_json::from_str(json).unwrap();
        assert!(!receipt.succeeded());
        assert!(receipt.l2_to_l1_logs.is_empty());
    }
}
