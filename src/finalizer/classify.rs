//! Error classification for finalize attempts
//!
//! RPC and proof-service failures only surface as text, so the finalizer
//! decides between "retry later", "already done" and "abort this item" by
//! inspecting the rendered error chain.

use eyre::Report;

use crate::contracts::already_finalized_selector;

/// How a failed external call should be treated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// Proof exists but the batch has not been executed on L1 yet
    ProofNotReady,
    /// The handler reports the message as already finalized
    AlreadyFinalized,
    /// Anything else: abort this item for the current pass
    Unexpected,
}

/// Classify an error message
pub fn classify_error(error: &str) -> ErrorClass {
    let error_lower = error.to_lowercase();

    if error_lower.contains("not executed yet")
        || error_lower.contains("proof not available")
        || error_lower.contains("proof is not available")
        || error_lower.contains("batch not executed")
        || error_lower.contains("batchnotexecuted")
        || error_lower.contains("not ready")
    {
        return ErrorClass::ProofNotReady;
    }

    if error_lower.contains("already finalized")
        || error_lower.contains("withdrawalalreadyfinalized")
        || error_lower.contains(&already_finalized_selector())
    {
        return ErrorClass::AlreadyFinalized;
    }

    ErrorClass::Unexpected
}

/// Classify a report using its full cause chain
pub fn classify_report(error: &Report) -> ErrorClass {
    classify_error(&format!("{:#}", error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::{eyre, WrapErr};

    #[test]
    fn test_error_classification() {
        assert_eq!(
            classify_error("RPC error -32000: L1 batch 12 not executed yet"),
            ErrorClass::ProofNotReady
        );
        assert_eq!(
            classify_error("Proof not available for log"),
            ErrorClass::ProofNotReady
        );
        assert_eq!(
            classify_error("execution reverted: Withdrawal already finalized"),
            ErrorClass::AlreadyFinalized
        );
        assert_eq!(
            classify_error("connection refused"),
            ErrorClass::Unexpected
        );
    }

    #[test]
    fn test_unexecuted_batch_is_not_ready() {
        assert_eq!(
            classify_error("execution reverted: BatchNotExecuted(9)"),
            ErrorClass::ProofNotReady
        );
        assert_eq!(
            classify_error("gas estimation failed: batch not executed"),
            ErrorClass::ProofNotReady
        );
    }

    #[test]
    fn test_revert_selector_detected() {
        let message = format!(
            "server returned an error response: execution reverted, data: \"0x{}\"",
            already_finalized_selector()
        );
        assert_eq!(classify_error(&message), ErrorClass::AlreadyFinalized);
    }

    #[test]
    fn test_report_chain_is_inspected() {
        let report = Err::<(), _>(eyre!("batch not executed yet"))
            .wrap_err("Failed to fetch proof")
            .unwrap_err();
        assert_eq!(classify_report(&report), ErrorClass::ProofNotReady);
    }
}
