//! Shared types for the interop relayer
//!
//! Queue entries, scan cursor, finalize outcomes and withdrawal phases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of an interop message, for observability only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Action {
    Deposit,
    Withdrawal,
    #[default]
    Unknown,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Deposit => write!(f, "Deposit"),
            Action::Withdrawal => write!(f, "Withdrawal"),
            Action::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A source-chain transaction waiting to be finalized on L1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingItem {
    /// Source-chain transaction hash (unique key)
    pub hash: String,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub action: Action,
    #[serde(default = "zero_amount")]
    pub amount: String,
    /// L1 transaction hash of the latest finalization attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_finalize_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Pass-level failures seen for this item so far
    #[serde(default, skip_serializing_if = "is_zero")]
    pub attempts: u32,
}

impl PendingItem {
    pub fn new(hash: impl Into<String>, action: Action, amount: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            added_at: Utc::now(),
            action,
            amount: amount.into(),
            last_finalize_hash: None,
            updated_at: None,
            attempts: 0,
        }
    }
}

/// A source-chain transaction whose message no longer needs relaying
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedItem {
    pub source_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_hash: Option<String>,
    pub finalized_at: DateTime<Utc>,
    #[serde(default)]
    pub action: Action,
    #[serde(default = "zero_amount")]
    pub amount: String,
}

impl FinalizedItem {
    /// Build the history entry for a pending item that just completed
    pub fn from_pending(item: &PendingItem, destination_hash: Option<String>) -> Self {
        Self {
            source_hash: item.hash.clone(),
            destination_hash,
            finalized_at: Utc::now(),
            action: item.action,
            amount: item.amount.clone(),
        }
    }
}

/// Scan cursor: highest fully scanned source block (inclusive)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanState {
    pub last_block: u64,
}

/// Why a finalize attempt ended the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    TxNotFound,
    NoLogs,
    WithdrawalNotReady,
    NoInteropLogs,
    ProofNotReady,
    NoMessage,
    AlreadyFinalized,
    L1Pending,
    TxFailed,
    Finalized,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::TxNotFound => "tx_not_found",
            ReasonCode::NoLogs => "no_logs",
            ReasonCode::WithdrawalNotReady => "withdrawal_not_ready",
            ReasonCode::NoInteropLogs => "no_interop_logs",
            ReasonCode::ProofNotReady => "proof_not_ready",
            ReasonCode::NoMessage => "no_message",
            ReasonCode::AlreadyFinalized => "already_finalized",
            ReasonCode::L1Pending => "l1_pending",
            ReasonCode::TxFailed => "tx_failed",
            ReasonCode::Finalized => "finalized",
        }
    }

    /// Outcomes that keep the item queued for the next pass
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReasonCode::ProofNotReady | ReasonCode::L1Pending | ReasonCode::WithdrawalNotReady
        )
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one finalize attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeResult {
    pub success: bool,
    pub reason: ReasonCode,
    /// L1 transaction hash, when one was submitted
    pub destination_hash: Option<String>,
}

impl FinalizeResult {
    pub fn done(reason: ReasonCode) -> Self {
        Self {
            success: true,
            reason,
            destination_hash: None,
        }
    }

    pub fn failed(reason: ReasonCode) -> Self {
        Self {
            success: false,
            reason,
            destination_hash: None,
        }
    }

    pub fn with_destination(mut self, hash: impl Into<String>) -> Self {
        self.destination_hash = Some(hash.into());
        self
    }
}

/// What the scheduler does with an item after a finalize attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Move to finalized history
    Complete(Option<String>),
    /// Keep pending, recording the latest L1 hash if any
    Requeue(Option<String>),
    /// Remove from pending without a history entry
    Drop,
}

impl From<&FinalizeResult> for Disposition {
    fn from(result: &FinalizeResult) -> Self {
        if result.success {
            Disposition::Complete(result.destination_hash.clone())
        } else if result.reason.is_retryable() {
            Disposition::Requeue(result.destination_hash.clone())
        } else {
            Disposition::Drop
        }
    }
}

/// Phase of a base-token withdrawal on the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalPhase {
    NotReady,
    ReadyToFinalize,
    Finalized,
}

fn zero_amount() -> String {
    "0".to_string()
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_reasons() {
        let retryable = [
            ReasonCode::ProofNotReady,
            ReasonCode::L1Pending,
            ReasonCode::WithdrawalNotReady,
        ];
        for reason in retryable {
            assert!(reason.is_retryable(), "{} should be retryable", reason);
        }

        let permanent = [
            ReasonCode::TxNotFound,
            ReasonCode::NoMessage,
            ReasonCode::TxFailed,
        ];
        for reason in permanent {
            assert!(!reason.is_retryable(), "{} should not be retryable", reason);
        }
    }

    #[test]
    fn test_disposition_partition() {
        let done = FinalizeResult::done(ReasonCode::Finalized).with_destination("0xabc");
        assert_eq!(
            Disposition::from(&done),
            Disposition::Complete(Some("0xabc".to_string()))
        );

        let pending = FinalizeResult::failed(ReasonCode::L1Pending).with_destination("0xdef");
        assert_eq!(
            Disposition::from(&pending),
            Disposition::Requeue(Some("0xdef".to_string()))
        );

        let reverted = FinalizeResult::failed(ReasonCode::TxFailed).with_destination("0x123");
        assert_eq!(Disposition::from(&reverted), Disposition::Drop);
    }

    #[test]
    fn test_reason_code_serializes_snake_case() {
        let json = serde_json::to_string(&ReasonCode::WithdrawalNotReady).unwrap();
        assert_eq!(json, "\"withdrawal_not_ready\"");
        let json = serde_json::to_string(&ReasonCode::L1Pending).unwrap();
        assert_eq!(json, "\"l1_pending\"");
    }

    #[test]
    fn test_pending_item_optional_fields() {
        let json = r#"{"hash":"0x01","addedAt":"2024-01-01T00:00:00Z"}"#;
        let item: PendingItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.action, Action::Unknown);
        assert_eq!(item.amount, "0");
        assert_eq!(item.attempts, 0);
        assert!(item.last_finalize_hash.is_none());

        let out = serde_json::to_string(&item).unwrap();
        assert!(!out.contains("lastFinalizeHash"));
        assert!(!out.contains("attempts"));
    }
}
