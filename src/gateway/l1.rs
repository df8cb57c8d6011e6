//! L1 destination client
//!
//! Uses alloy's `ProviderBuilder::with_recommended_fillers()` plus the
//! executor wallet, so only `to`, `input`, `value` and the gas price need to
//! be set on outgoing transactions.

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::DestinationGateway;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Signing client for the destination chain
pub struct L1Client {
    rpc_url: Url,
    signer: PrivateKeySigner,
}

impl L1Client {
    pub fn new(rpc_url: &str, private_key: &str) -> Result<Self> {
        let rpc_url: Url = rpc_url.parse().wrap_err("Invalid L1 RPC URL")?;
        let signer: PrivateKeySigner = private_key.parse().wrap_err("Invalid private key")?;

        info!(executor = %signer.address(), "L1 client initialized");

        Ok(Self { rpc_url, signer })
    }

    /// Address of the executor key
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    fn provider(&self) -> impl Provider<Http<Client>> {
        let wallet = EthereumWallet::from(self.signer.clone());
        ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(self.rpc_url.clone())
    }
}

#[async_trait]
impl DestinationGateway for L1Client {
    async fn gas_price(&self) -> Result<u128> {
        self.provider()
            .get_gas_price()
            .await
            .wrap_err("Failed to get L1 gas price")
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);
        self.provider()
            .call(&tx)
            .await
            .map_err(|e| eyre!("L1 call to {} failed: {}", to, e))
    }

    async fn send_transaction(
        &self,
        to: Address,
        data: Bytes,
        value: U256,
        gas_price: u128,
    ) -> Result<B256> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(data)
            .with_value(value)
            .with_gas_price(gas_price);

        debug!(to = %to, gas_price, "Sending L1 transaction");

        let pending = self
            .provider()
            .send_transaction(tx)
            .await
            .map_err(|e| eyre!("Failed to send transaction: {}", e))?;

        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: B256, timeout: Duration) -> Result<Option<bool>> {
        let provider = self.provider();

        let poll = async {
            loop {
                match provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return receipt.status(),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed, retrying");
                    }
                }
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(status) => Ok(Some(status)),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_client_address_from_key() {
        let client = L1Client::new("http://localhost:8545", TEST_KEY).unwrap();
        assert_eq!(
            client.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(L1Client::new("http://localhost:8545", "0x1234").is_err());
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(L1Client::new("not a url", TEST_KEY).is_err());
    }
}
