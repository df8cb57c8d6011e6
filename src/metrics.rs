//! Prometheus metrics for the interop relayer
//!
//! Exposes metrics on /metrics endpoint for Prometheus scraping.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Gauge,
};

lazy_static! {
    // Scheduler
    pub static ref PASSES: Counter = register_counter!(
        "interop_relayer_passes_total",
        "Total number of relay passes run"
    ).unwrap();

    // Scanner
    pub static ref BLOCKS_SCANNED: Counter = register_counter!(
        "interop_relayer_blocks_scanned_total",
        "Total number of L2 blocks scanned"
    ).unwrap();

    pub static ref LATEST_SCANNED_BLOCK: Gauge = register_gauge!(
        "interop_relayer_latest_scanned_block",
        "Last L2 block fully scanned"
    ).unwrap();

    pub static ref ITEMS_ENQUEUED: CounterVec = register_counter_vec!(
        "interop_relayer_items_enqueued_total",
        "Total number of interop transactions queued",
        &["action"]
    ).unwrap();

    // Finalizer
    pub static ref FINALIZE_OUTCOMES: CounterVec = register_counter_vec!(
        "interop_relayer_finalize_outcomes_total",
        "Finalize attempts by reason code",
        &["reason"]
    ).unwrap();

    pub static ref PENDING_ITEMS: Gauge = register_gauge!(
        "interop_relayer_pending_items",
        "Items waiting for finalization"
    ).unwrap();

    // Error metrics
    pub static ref ERRORS: CounterVec = register_counter_vec!(
        "interop_relayer_errors_total",
        "Total number of errors",
        &["type"]
    ).unwrap();

    // Health metrics
    pub static ref UP: Gauge = register_gauge!(
        "interop_relayer_up",
        "Whether the relayer is up and running"
    ).unwrap();
}

pub fn record_pass() {
    PASSES.inc();
}

/// Record the scanner reaching `block_number`
pub fn record_blocks_scanned(count: u64, block_number: u64) {
    BLOCKS_SCANNED.inc_by(count as f64);
    LATEST_SCANNED_BLOCK.set(block_number as f64);
}

pub fn record_enqueued(action: &str) {
    ITEMS_ENQUEUED.with_label_values(&[action]).inc();
}

pub fn record_outcome(reason: &str) {
    FINALIZE_OUTCOMES.with_label_values(&[reason]).inc();
}

pub fn set_pending_items(count: usize) {
    PENDING_ITEMS.set(count as f64);
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
