//! Finalizer - drives one pending item through the relay state machine
//!
//! For a source transaction:
//! 1. Receipt must exist and have succeeded
//! 2. No L2 -> L1 logs means nothing to relay
//! 3. A base-token withdrawal in the same transaction is finalized first
//! 4. The interop-center log is located
//! 5. Its inclusion proof is fetched
//! 6. The message payload and L2 sender are recovered
//! 7. `finalizeDeposit` is submitted on L1 with a bumped gas price
//! 8. The L1 receipt is awaited for a bounded time
//!
//! Retryable outcomes come back as `FinalizeResult`s; `Err` means the item
//! hit an unexpected failure and should be retried on a later pass.

use alloy::primitives::{Address, B256, U256};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::contracts::FinalizeMessage;
use crate::gateway::{
    bumped_gas_price, BaseTokenBridge, DestinationGateway, ProofService, SourceGateway,
};
use crate::message::{
    any_log_references, find_log_by_key, locate_payload, resolve_sender, tx_number_in_batch,
};
use crate::types::{FinalizeResult, ReasonCode, WithdrawalPhase};

pub mod classify;

pub use classify::{classify_error, classify_report, ErrorClass};

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Static parameters of the finalizer
#[derive(Debug, Clone)]
pub struct FinalizerSettings {
    pub interop_center: Address,
    pub base_token: Address,
    /// L1 contract receiving `finalizeDeposit`
    pub handler: Address,
    /// Source chain id passed to the handler
    pub chain_id: u64,
    pub confirmation_timeout: Duration,
}

pub struct Finalizer {
    source: Arc<dyn SourceGateway>,
    proofs: Arc<dyn ProofService>,
    destination: Arc<dyn DestinationGateway>,
    bridge: Arc<dyn BaseTokenBridge>,
    settings: FinalizerSettings,
}

impl Finalizer {
    pub fn new(
        source: Arc<dyn SourceGateway>,
        proofs: Arc<dyn ProofService>,
        destination: Arc<dyn DestinationGateway>,
        bridge: Arc<dyn BaseTokenBridge>,
        settings: FinalizerSettings,
    ) -> Self {
        Self {
            source,
            proofs,
            destination,
            bridge,
            settings,
        }
    }

    /// Run the state machine for one source transaction
    pub async fn finalize(&self, tx_hash: B256) -> Result<FinalizeResult> {
        let receipt = match self
            .source
            .receipt(tx_hash)
            .await
            .wrap_err("Failed to fetch L2 receipt")?
        {
            Some(receipt) if receipt.succeeded() => receipt,
            _ => return Ok(FinalizeResult::failed(ReasonCode::TxNotFound)),
        };

        if receipt.l2_to_l1_logs.is_empty() {
            return Ok(FinalizeResult::done(ReasonCode::NoLogs));
        }

        if any_log_references(&receipt, &self.settings.base_token) {
            if let Some(result) = self.finalize_base_token_withdrawal(tx_hash).await? {
                return Ok(result);
            }
        }

        let Some((log_index, log)) = find_log_by_key(&receipt, &self.settings.interop_center)
        else {
            return Ok(FinalizeResult::done(ReasonCode::NoInteropLogs));
        };

        let proof = match self.proofs.inclusion_proof(tx_hash, log_index).await {
            Ok(Some(proof)) if !proof.proof.is_empty() => proof,
            Ok(_) => {
                debug!(tx_hash = %tx_hash, log_index, "Proof not ready");
                return Ok(FinalizeResult::failed(ReasonCode::ProofNotReady));
            }
            Err(e) if classify_report(&e) == ErrorClass::ProofNotReady => {
                debug!(tx_hash = %tx_hash, error = %e, "Proof not ready");
                return Ok(FinalizeResult::failed(ReasonCode::ProofNotReady));
            }
            Err(e) => return Err(e).wrap_err("Failed to fetch inclusion proof"),
        };

        let sender = resolve_sender(log);
        let Some(message) = locate_payload(&receipt, log, &self.settings.interop_center)
            .filter(|payload| !payload.is_empty())
        else {
            warn!(tx_hash = %tx_hash, "No interop message payload found");
            return Ok(FinalizeResult::failed(ReasonCode::NoMessage));
        };

        let call = FinalizeMessage {
            chain_id: self.settings.chain_id,
            batch_number: proof.batch_number,
            message_index: proof.message_index,
            sender,
            tx_number_in_batch: tx_number_in_batch(log),
            message,
            proof: proof.proof,
        };

        info!(
            tx_hash = %tx_hash,
            batch = call.batch_number,
            message_index = call.message_index,
            sender = %call.sender,
            root = %proof.root,
            "Submitting L1 finalization"
        );

        let l1_hash = match self.submit(&call).await {
            Ok(hash) => hash,
            Err(e) if classify_report(&e) == ErrorClass::AlreadyFinalized => {
                info!(tx_hash = %tx_hash, "Message already finalized on L1");
                return Ok(FinalizeResult::done(ReasonCode::AlreadyFinalized));
            }
            Err(e) if classify_report(&e) == ErrorClass::ProofNotReady => {
                debug!(tx_hash = %tx_hash, error = %e, "Batch not executed on L1 yet");
                return Ok(FinalizeResult::failed(ReasonCode::ProofNotReady));
            }
            Err(e) => return Err(e),
        };
        let l1_hash_hex = format!("{:#x}", l1_hash);

        match self
            .destination
            .wait_for_receipt(l1_hash, self.settings.confirmation_timeout)
            .await?
        {
            Some(true) => {
                info!(tx_hash = %tx_hash, l1_tx_hash = %l1_hash_hex, "L1 finalization confirmed");
                Ok(FinalizeResult::done(ReasonCode::Finalized).with_destination(l1_hash_hex))
            }
            Some(false) => {
                warn!(tx_hash = %tx_hash, l1_tx_hash = %l1_hash_hex, "L1 finalization reverted");
                Ok(FinalizeResult::failed(ReasonCode::TxFailed).with_destination(l1_hash_hex))
            }
            None => {
                warn!(
                    tx_hash = %tx_hash,
                    l1_tx_hash = %l1_hash_hex,
                    timeout = ?self.settings.confirmation_timeout,
                    "L1 finalization still pending"
                );
                Ok(FinalizeResult::failed(ReasonCode::L1Pending).with_destination(l1_hash_hex))
            }
        }
    }

    /// Complete the base-token withdrawal carried by the same transaction.
    /// Returns a result only when the item must stop here.
    async fn finalize_base_token_withdrawal(&self, tx_hash: B256) -> Result<Option<FinalizeResult>> {
        let phase = self
            .bridge
            .withdrawal_status(tx_hash)
            .await
            .wrap_err("Failed to read withdrawal status")?;

        match phase {
            WithdrawalPhase::Finalized => {
                debug!(tx_hash = %tx_hash, "Base-token withdrawal already finalized");
                Ok(None)
            }
            WithdrawalPhase::ReadyToFinalize => {
                info!(tx_hash = %tx_hash, "Finalizing base-token withdrawal");
                let l1_hash = match self.bridge.try_finalize_withdrawal(tx_hash).await {
                    Ok(hash) => hash,
                    // a sealed batch has a proof before it is executed on L1
                    Err(e) if classify_report(&e) == ErrorClass::ProofNotReady => {
                        debug!(tx_hash = %tx_hash, error = %e, "Base-token withdrawal not executable yet");
                        return Ok(Some(FinalizeResult::failed(ReasonCode::WithdrawalNotReady)));
                    }
                    Err(e) => return Err(e).wrap_err("Failed to finalize base-token withdrawal"),
                };
                self.bridge
                    .wait_for_withdrawal(tx_hash, self.settings.confirmation_timeout)
                    .await?;
                info!(tx_hash = %tx_hash, l1_tx_hash = %l1_hash, "Base-token withdrawal finalized");
                Ok(None)
            }
            WithdrawalPhase::NotReady => {
                debug!(tx_hash = %tx_hash, "Base-token withdrawal not ready");
                Ok(Some(FinalizeResult::failed(ReasonCode::WithdrawalNotReady)))
            }
        }
    }

    async fn submit(&self, call: &FinalizeMessage) -> Result<B256> {
        let base = self.destination.gas_price().await?;
        let gas_price = bumped_gas_price(base);
        debug!(base_gas_price = base, gas_price, "Using bumped L1 gas price");

        self.destination
            .send_transaction(self.settings.handler, call.calldata(), U256::ZERO, gas_price)
            .await
    }
}
