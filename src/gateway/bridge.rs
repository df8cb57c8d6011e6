//! Base-token withdrawal bridge
//!
//! Base-token withdrawals share the L2 -> L1 log mechanism with interop
//! messages, so they are finalized through the same handler call before the
//! interop message of the same transaction can be processed.

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{
    bumped_gas_price, BaseTokenBridge, DestinationGateway, InclusionProof, ProofService,
    SourceGateway, SourceReceipt,
};
use crate::contracts::{is_withdrawal_finalized_calldata, FinalizeMessage, L1Nullifier};
use crate::finalizer::{classify_report, ErrorClass};
use crate::message::{find_log_by_key, locate_payload, resolve_sender, tx_number_in_batch};
use crate::types::WithdrawalPhase;

const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// `BaseTokenBridge` backed by the L1 nullifier contract
pub struct NullifierBridge {
    source: Arc<dyn SourceGateway>,
    proofs: Arc<dyn ProofService>,
    destination: Arc<dyn DestinationGateway>,
    handler: Address,
    base_token: Address,
    chain_id: u64,
    confirmation_timeout: Duration,
}

/// Base-token withdrawal located in a receipt, with its proof if available
struct LocatedWithdrawal {
    receipt: SourceReceipt,
    log_index: u64,
    proof: Option<InclusionProof>,
}

impl NullifierBridge {
    pub fn new(
        source: Arc<dyn SourceGateway>,
        proofs: Arc<dyn ProofService>,
        destination: Arc<dyn DestinationGateway>,
        handler: Address,
        base_token: Address,
        chain_id: u64,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            source,
            proofs,
            destination,
            handler,
            base_token,
            chain_id,
            confirmation_timeout,
        }
    }

    async fn locate(&self, tx_hash: B256) -> Result<LocatedWithdrawal> {
        let receipt = self
            .source
            .receipt(tx_hash)
            .await?
            .ok_or_else(|| eyre!("Receipt for {} not found", tx_hash))?;

        let (log_index, _) = find_log_by_key(&receipt, &self.base_token)
            .ok_or_else(|| eyre!("No base-token withdrawal log in {}", tx_hash))?;

        let proof = match self.proofs.inclusion_proof(tx_hash, log_index).await {
            Ok(proof) => proof.filter(|p| !p.proof.is_empty()),
            Err(e) if classify_report(&e) == ErrorClass::ProofNotReady => {
                debug!(tx_hash = %tx_hash, error = %e, "Withdrawal proof not ready");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(LocatedWithdrawal {
            receipt,
            log_index,
            proof,
        })
    }

    async fn is_finalized(&self, proof: &InclusionProof) -> Result<bool> {
        let data =
            is_withdrawal_finalized_calldata(self.chain_id, proof.batch_number, proof.message_index);
        let output = self.destination.call(self.handler, data).await?;
        let decoded = L1Nullifier::isWithdrawalFinalizedCall::abi_decode_returns(&output, true)
            .map_err(|e| eyre!("Invalid isWithdrawalFinalized output: {}", e))?;
        Ok(decoded._0)
    }
}

#[async_trait]
impl BaseTokenBridge for NullifierBridge {
    async fn withdrawal_status(&self, tx_hash: B256) -> Result<WithdrawalPhase> {
        let located = self.locate(tx_hash).await?;
        let Some(proof) = located.proof else {
            return Ok(WithdrawalPhase::NotReady);
        };

        if self.is_finalized(&proof).await? {
            Ok(WithdrawalPhase::Finalized)
        } else {
            Ok(WithdrawalPhase::ReadyToFinalize)
        }
    }

    async fn try_finalize_withdrawal(&self, tx_hash: B256) -> Result<B256> {
        let located = self.locate(tx_hash).await?;
        let proof = located
            .proof
            .ok_or_else(|| eyre!("Withdrawal proof for {} not available", tx_hash))?;
        let log = &located.receipt.l2_to_l1_logs[located.log_index as usize];

        let message = locate_payload(&located.receipt, log, &self.base_token)
            .filter(|payload| !payload.is_empty())
            .ok_or_else(|| eyre!("No withdrawal message in {}", tx_hash))?;

        let call = FinalizeMessage {
            chain_id: self.chain_id,
            batch_number: proof.batch_number,
            message_index: proof.message_index,
            sender: resolve_sender(log),
            tx_number_in_batch: tx_number_in_batch(log),
            message,
            proof: proof.proof,
        };

        let gas_price = bumped_gas_price(self.destination.gas_price().await?);
        let l1_hash = self
            .destination
            .send_transaction(self.handler, call.calldata(), U256::ZERO, gas_price)
            .await?;

        info!(
            tx_hash = %tx_hash,
            l1_tx_hash = %l1_hash,
            "Submitted base-token withdrawal finalization"
        );

        match self
            .destination
            .wait_for_receipt(l1_hash, self.confirmation_timeout)
            .await?
        {
            Some(true) => Ok(l1_hash),
            Some(false) => Err(eyre!("Withdrawal finalization {} reverted", l1_hash)),
            None => Err(eyre!("Withdrawal finalization {} not confirmed in time", l1_hash)),
        }
    }

    async fn wait_for_withdrawal(&self, tx_hash: B256, timeout: Duration) -> Result<()> {
        let poll = async {
            loop {
                match self.withdrawal_status(tx_hash).await? {
                    WithdrawalPhase::Finalized => return Ok::<(), eyre::Report>(()),
                    phase => debug!(tx_hash = %tx_hash, ?phase, "Waiting for withdrawal"),
                }
                tokio::time::sleep(STATUS_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| eyre!("Withdrawal {} not finalized within {:?}", tx_hash, timeout))?
    }
}
