//! Scheduler - runs relay passes back to back on a fixed interval
//!
//! One pass: scan new L2 blocks, then finalize every pending item in order
//! with a short pause between items. Queue and history are written once at
//! the end of the pass, so a crash mid-pass simply repeats the work.

use alloy::primitives::B256;
use chrono::Utc;
use eyre::Result;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::finalizer::Finalizer;
use crate::metrics;
use crate::scanner::Scanner;
use crate::store::Store;
use crate::types::{Disposition, FinalizedItem, PendingItem};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    pub item_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            item_delay: DEFAULT_ITEM_DELAY,
        }
    }
}

/// Counts for one finalization sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub finalized: usize,
    pub requeued: usize,
    pub dropped: usize,
}

pub struct Scheduler {
    scanner: Scanner,
    finalizer: Finalizer,
    store: Store,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(scanner: Scanner, finalizer: Finalizer, store: Store, config: SchedulerConfig) -> Self {
        Self {
            scanner,
            finalizer,
            store,
            config,
        }
    }

    /// Run passes until a shutdown signal arrives
    pub async fn run(&self, mut shutdown: mpsc::Receiver<()>) -> Result<()> {
        info!(
            poll_interval = ?self.config.poll_interval,
            item_delay = ?self.config.item_delay,
            "Scheduler started"
        );

        loop {
            if let Err(e) = self.run_pass().await {
                metrics::record_error("pass");
                error!(error = %e, "Relay pass failed");
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutdown signal received, stopping scheduler");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// One full pass: scan, then finalize everything pending
    pub async fn run_pass(&self) -> Result<PassSummary> {
        metrics::record_pass();

        match self.scanner.scan_new_blocks().await {
            Ok(scan) if scan.enqueued > 0 => {
                info!(enqueued = scan.enqueued, to_block = scan.to_block, "Scan complete");
            }
            Ok(_) => {}
            Err(e) => {
                metrics::record_error("scan");
                warn!(error = %e, "Scan aborted, range will be retried next pass");
            }
        }

        self.finalize_pending().await
    }

    /// Attempt every pending item once and persist the outcome
    pub async fn finalize_pending(&self) -> Result<PassSummary> {
        let pending = self.store.load_pending().await?;
        let mut finalized = self.store.load_finalized().await?;
        let mut kept: Vec<PendingItem> = Vec::with_capacity(pending.len());
        let mut summary = PassSummary::default();

        for (index, mut item) in pending.into_iter().enumerate() {
            if finalized
                .iter()
                .any(|f| f.source_hash.eq_ignore_ascii_case(&item.hash))
            {
                warn!(tx_hash = %item.hash, "Pending item already in history, removing");
                continue;
            }

            let Ok(tx_hash) = B256::from_str(&item.hash) else {
                warn!(tx_hash = %item.hash, "Invalid transaction hash in queue, dropping");
                summary.dropped += 1;
                continue;
            };

            if index > 0 {
                tokio::time::sleep(self.config.item_delay).await;
            }

            match self.finalizer.finalize(tx_hash).await {
                Ok(result) => {
                    metrics::record_outcome(result.reason.as_str());
                    match Disposition::from(&result) {
                        Disposition::Complete(destination_hash) => {
                            info!(
                                tx_hash = %item.hash,
                                reason = %result.reason,
                                l1_tx_hash = ?destination_hash,
                                "Item finalized"
                            );
                            finalized.insert(0, FinalizedItem::from_pending(&item, destination_hash));
                            summary.finalized += 1;
                        }
                        Disposition::Requeue(destination_hash) => {
                            info!(
                                tx_hash = %item.hash,
                                reason = %result.reason,
                                "Item not ready, keeping in queue"
                            );
                            if destination_hash.is_some() {
                                item.last_finalize_hash = destination_hash;
                            }
                            item.updated_at = Some(Utc::now());
                            kept.push(item);
                            summary.requeued += 1;
                        }
                        Disposition::Drop => {
                            error!(
                                tx_hash = %item.hash,
                                reason = %result.reason,
                                l1_tx_hash = ?result.destination_hash,
                                "Finalization failed permanently, dropping item"
                            );
                            summary.dropped += 1;
                        }
                    }
                }
                Err(e) => {
                    // pass-level failure: the item stays queued however often it recurs
                    metrics::record_error("finalize");
                    item.attempts = item.attempts.saturating_add(1);
                    item.updated_at = Some(Utc::now());
                    warn!(
                        tx_hash = %item.hash,
                        attempts = item.attempts,
                        error = %e,
                        "Finalization error, will retry next pass"
                    );
                    kept.push(item);
                    summary.requeued += 1;
                }
            }
        }

        // history first: a crash in between leaves a duplicate that the next
        // pass removes from the queue
        self.store.save_finalized(&finalized).await?;
        self.store.save_pending(&kept).await?;
        metrics::set_pending_items(kept.len());

        Ok(summary)
    }
}
