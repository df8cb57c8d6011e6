//! Interop Relayer - Library interface
//!
//! Re-exports internal modules for use in integration tests.

pub mod config;
pub mod contracts;
pub mod finalizer;
pub mod gateway;
pub mod message;
pub mod metrics;
pub mod scanner;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod types;
