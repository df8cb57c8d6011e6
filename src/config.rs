use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::contracts::BASE_TOKEN_ADDRESS;

/// Main configuration for the relayer
#[derive(Debug, Clone)]
pub struct Config {
    pub l2: L2Config,
    pub l1: L1Config,
    pub relayer: RelayerConfig,
    pub server: ServerConfig,
}

/// Source chain configuration
#[derive(Debug, Clone)]
pub struct L2Config {
    pub rpc_url: String,
    pub chain_id: u64,
    pub interop_center_address: String,
    pub base_token_address: String,
    /// Watched sender; defaults to the executor key's address
    pub executor_address: Option<String>,
}

/// Destination chain configuration
#[derive(Clone)]
pub struct L1Config {
    pub rpc_url: String,
    pub finalization_handler_address: String,
    pub private_key: String,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for L1Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("L1Config")
            .field("rpc_url", &self.rpc_url)
            .field(
                "finalization_handler_address",
                &self.finalization_handler_address,
            )
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Relayer loop configuration
#[derive(Debug, Clone)]
pub struct RelayerConfig {
    pub poll_interval_ms: u64,
    pub item_delay_ms: u64,
    pub confirmation_timeout_secs: u64,
    pub data_dir: PathBuf,
    pub finalized_retention: usize,
}

impl RelayerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

/// Status server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub cors_origin: String,
}

/// Default functions
fn default_poll_interval() -> u64 {
    30_000
}

fn default_item_delay() -> u64 {
    1_000
}

fn default_confirmation_timeout() -> u64 {
    300
}

fn default_finalized_retention() -> usize {
    50
}

fn default_status_port() -> u16 {
    3001
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| eyre!("{} environment variable is required", name))
}

fn optional<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let l2 = L2Config {
            rpc_url: required("L2_RPC_URL")?,
            chain_id: required("L2_CHAIN_ID")?
                .parse()
                .wrap_err("L2_CHAIN_ID must be a valid u64")?,
            interop_center_address: required("INTEROP_CENTER_ADDRESS")?,
            base_token_address: env::var("BASE_TOKEN_ADDRESS")
                .unwrap_or_else(|_| format!("{:#x}", BASE_TOKEN_ADDRESS)),
            executor_address: env::var("EXECUTOR_ADDRESS").ok(),
        };

        let l1 = L1Config {
            rpc_url: required("L1_RPC_URL")?,
            finalization_handler_address: required("FINALIZATION_HANDLER_ADDRESS")?,
            private_key: required("EXECUTOR_PRIVATE_KEY")?,
        };

        let relayer = RelayerConfig {
            poll_interval_ms: optional("POLL_INTERVAL_MS").unwrap_or(default_poll_interval()),
            item_delay_ms: optional("ITEM_DELAY_MS").unwrap_or(default_item_delay()),
            confirmation_timeout_secs: optional("CONFIRMATION_TIMEOUT_SECS")
                .unwrap_or(default_confirmation_timeout()),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            finalized_retention: optional("FINALIZED_RETENTION")
                .unwrap_or(default_finalized_retention()),
        };

        let server = ServerConfig {
            bind_address: env::var("STATUS_BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: optional("STATUS_PORT").unwrap_or(default_status_port()),
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| default_cors_origin()),
        };

        let config = Config {
            l2,
            l1,
            relayer,
            server,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.l2.rpc_url.is_empty() {
            return Err(eyre!("l2.rpc_url cannot be empty"));
        }
        if self.l1.rpc_url.is_empty() {
            return Err(eyre!("l1.rpc_url cannot be empty"));
        }

        validate_address("l2.interop_center_address", &self.l2.interop_center_address)?;
        validate_address("l2.base_token_address", &self.l2.base_token_address)?;
        if let Some(ref executor) = self.l2.executor_address {
            validate_address("l2.executor_address", executor)?;
        }
        validate_address(
            "l1.finalization_handler_address",
            &self.l1.finalization_handler_address,
        )?;

        if self.l1.private_key.len() != 66 || !self.l1.private_key.starts_with("0x") {
            return Err(eyre!(
                "l1.private_key must be 66 chars (0x + 64 hex chars)"
            ));
        }

        if self.relayer.poll_interval_ms == 0 {
            return Err(eyre!("relayer.poll_interval_ms must be greater than 0"));
        }
        if self.relayer.confirmation_timeout_secs == 0 {
            return Err(eyre!(
                "relayer.confirmation_timeout_secs must be greater than 0"
            ));
        }
        if self.relayer.finalized_retention == 0 {
            return Err(eyre!("relayer.finalized_retention must be greater than 0"));
        }

        Ok(())
    }
}

fn validate_address(field: &str, value: &str) -> Result<()> {
    if value.len() != 42 || !value.starts_with("0x") {
        return Err(eyre!(
            "{} must be a valid hex address (42 chars with 0x prefix)",
            field
        ));
    }
    Ok(())
}
