use alloy::primitives::Address;
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tracing::{debug, info};

use crate::gateway::SourceGateway;
use crate::message::{address_needle, extract_metadata, log_references};
use crate::metrics;
use crate::store::{enqueue, Store};
use crate::types::{PendingItem, ScanState};

/// Blocks scanned behind the head on a cold start instead of from genesis
pub const COLD_START_LOOKBACK: u64 = 5;

/// Result of one scan pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub from_block: u64,
    pub to_block: u64,
    pub enqueued: usize,
}

/// L2 block scanner for executor transactions that emit interop messages
pub struct Scanner {
    source: Arc<dyn SourceGateway>,
    store: Store,
    executor: Address,
    interop_center: Address,
}

impl Scanner {
    pub fn new(
        source: Arc<dyn SourceGateway>,
        store: Store,
        executor: Address,
        interop_center: Address,
    ) -> Self {
        Self {
            source,
            store,
            executor,
            interop_center,
        }
    }

    /// Scan every block after the cursor up to the current head.
    ///
    /// A failure reading the head or a block aborts the pass without moving
    /// the cursor; receipt failures only skip that transaction.
    pub async fn scan_new_blocks(&self) -> Result<ScanSummary> {
        let state = self.store.load_scan_state().await?;

        let head = self
            .source
            .block_number()
            .await
            .wrap_err("Failed to get L2 block number")?;

        let from_block = if state.last_block == 0 {
            head.saturating_sub(COLD_START_LOOKBACK)
        } else {
            state.last_block + 1
        };

        let mut summary = ScanSummary {
            from_block,
            to_block: head,
            enqueued: 0,
        };

        if from_block > head {
            debug!(last_block = state.last_block, head, "No new L2 blocks");
            return Ok(summary);
        }

        let mut pending = self.store.load_pending().await?;
        let finalized = self.store.load_finalized().await?;

        info!(from_block, to_block = head, "Scanning L2 blocks");

        for number in from_block..=head {
            let block = self
                .source
                .block_with_transactions(number)
                .await
                .wrap_err_with(|| format!("Failed to get L2 block {}", number))?;

            for tx in block.transactions.iter().filter(|tx| tx.from == self.executor) {
                let receipt = match self.source.receipt(tx.hash).await {
                    Ok(Some(receipt)) => receipt,
                    Ok(None) => {
                        debug!(tx_hash = %tx.hash, "Receipt not found, skipping");
                        continue;
                    }
                    Err(e) => {
                        debug!(tx_hash = %tx.hash, error = %e, "Receipt fetch failed, skipping");
                        continue;
                    }
                };

                let needle = address_needle(&self.interop_center);
                if !receipt
                    .l2_to_l1_logs
                    .iter()
                    .any(|log| log_references(log, &needle))
                {
                    continue;
                }

                let (action, amount) = extract_metadata(&receipt, &self.interop_center);
                let hash = format!("{:#x}", tx.hash);
                if enqueue(
                    &mut pending,
                    &finalized,
                    PendingItem::new(hash.clone(), action, amount.clone()),
                ) {
                    summary.enqueued += 1;
                    metrics::record_enqueued(&action.to_string());
                    info!(
                        block = number,
                        tx_hash = %hash,
                        action = %action,
                        amount = %amount,
                        "New interop transaction queued"
                    );
                }
            }
        }

        if summary.enqueued > 0 {
            self.store.save_pending(&pending).await?;
        }
        self.store
            .save_scan_state(ScanState { last_block: head })
            .await?;
        metrics::record_blocks_scanned(head - from_block + 1, head);

        Ok(summary)
    }
}
