use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use alloy_primitives::{Address, Bytes, TxHash};
use anyhow::{Context, Result};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::timeout;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(600); // blocks can be slow to include a tx

#[derive(Clone)]
pub struct RpcClient {
    providers: Vec<DynProvider>,
    urls: Vec<String>,
    current_provider: Arc<AtomicUsize>,
    wallet_address: Option<Address>,
    max_retries: usize,
}

impl RpcClient {
    pub fn new(rpc_urls: &[String], signer: Option<PrivateKeySigner>) -> Result<Self> {
        if rpc_urls.is_empty() {
            return Err(anyhow::anyhow!("At least one RPC URL must be provided"));
        }

        let wallet_address = signer.as_ref().map(|signer| signer.address());
        let wallet = signer.map(EthereumWallet::from);

        let mut providers = Vec::new();
        for url in rpc_urls {
            let parsed_url = url
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid RPC URL: {}", url))?;
            let provider = match &wallet {
                Some(wallet) => ProviderBuilder::new()
                    .wallet(wallet.clone())
                    .connect_http(parsed_url)
                    .erased(),
                None => ProviderBuilder::new().connect_http(parsed_url).erased(),
            };
            providers.push(provider);
        }

        Ok(RpcClient {
            providers,
            urls: rpc_urls.to_vec(),
            current_provider: Arc::new(AtomicUsize::new(0)),
            wallet_address,
            max_retries: 5,
        })
    }

    pub fn wallet_address(&self) -> Option<Address> {
        self.wallet_address
    }

    fn get_provider(&self) -> &DynProvider {
        let index = self.current_provider.load(Ordering::Relaxed) % self.providers.len();
        &self.providers[index]
    }

    pub fn get_current_url(&self) -> &str {
        let index = self.current_provider.load(Ordering::Relaxed) % self.urls.len();
        &self.urls[index]
    }

    pub fn rotate_provider(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.providers.len();
        self.current_provider.store(next, Ordering::Relaxed);

        if self.providers.len() > 1 {
            debug!("Rotating to RPC provider #{}", next);
        }
    }

    fn get_retry_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(100)
            .factor(2)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.max_retries)
    }

    fn handle_error(&self, method: &str, error_str: &str) {
        let current_url = self.get_current_url();
        warn!(
            "RPC error for {} on {}: {}, rotating provider",
            method, current_url, error_str
        );
        self.rotate_provider();
    }

    fn handle_timeout(&self, method: &str) -> anyhow::Error {
        let current_url = self.get_current_url();
        warn!(
            "{} timed out after {} seconds on {}, rotating provider",
            method,
            REQUEST_TIMEOUT.as_secs(),
            current_url
        );
        self.rotate_provider();
        anyhow::anyhow!(
            "{} timed out after {} seconds",
            method,
            REQUEST_TIMEOUT.as_secs()
        )
    }

    /// Runs a read against the current provider with timeout, retry and
    /// provider rotation. Reverts are returned immediately: asking another
    /// node gives the same answer.
    async fn read<T, F, Fut, E>(&self, method: &'static str, op: F) -> Result<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Display,
    {
        Retry::spawn(self.get_retry_strategy(), || {
            let fut = op(self.get_provider().clone());
            async move {
                match timeout(REQUEST_TIMEOUT, fut).await {
                    Ok(Ok(value)) => Ok(Ok(value)),
                    Ok(Err(e)) => {
                        let error_str = e.to_string();
                        if is_revert(&error_str) {
                            debug!("{} reverted: {}", method, error_str);
                            Ok(Err(anyhow::anyhow!("{} reverted: {}", method, error_str)))
                        } else {
                            self.handle_error(method, &error_str);
                            Err(anyhow::anyhow!("{}", error_str))
                        }
                    }
                    Err(_) => Err(self.handle_timeout(method)),
                }
            }
        })
        .await
        .and_then(|r| r)
    }

    pub async fn get_chain_id(&self) -> Result<u64> {
        self.read("eth_chainId", |provider| async move {
            provider.get_chain_id().await
        })
        .await
    }

    pub async fn get_code(&self, address: Address) -> Result<Bytes> {
        self.read("eth_getCode", move |provider| async move {
            provider.get_code_at(address).await
        })
        .await
    }

    pub async fn call_contract<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(call.abi_encode());

        let output = self
            .read("eth_call", |provider| {
                let tx = tx.clone();
                async move { provider.call(tx).await }
            })
            .await?;

        C::abi_decode_returns(&output)
            .map_err(|e| anyhow::anyhow!("Failed to decode {} output: {}", C::SIGNATURE, e))
    }

    /// Signs and submits `call` to `to`, then waits for the receipt. Sent once:
    /// a write is never retried blindly.
    pub async fn send_contract_call<C: SolCall>(&self, to: Address, call: C) -> Result<TxHash> {
        let from = self
            .wallet_address
            .ok_or_else(|| anyhow::anyhow!("WALLET_PRIVATE_KEY is required to send transactions"))?;

        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(call.abi_encode());

        let pending = match self.get_provider().send_transaction(tx).await {
            Ok(pending) => pending,
            Err(e) => {
                let error_str = e.to_string();
                self.handle_error("eth_sendTransaction", &error_str);
                anyhow::bail!("Failed to submit {}: {}", C::SIGNATURE, error_str);
            }
        };

        let tx_hash = *pending.tx_hash();
        info!("Submitted {} to {} in tx {}", C::SIGNATURE, to, tx_hash);

        let receipt = pending
            .with_timeout(Some(RECEIPT_TIMEOUT))
            .get_receipt()
            .await
            .with_context(|| format!("Failed waiting for receipt of {tx_hash}"))?;

        if !receipt.status() {
            anyhow::bail!("Transaction {} reverted", tx_hash);
        }

        Ok(tx_hash)
    }
}

fn is_revert(error_str: &str) -> bool {
    let lowered = error_str.to_lowercase();
    lowered.contains("execution reverted") || lowered.contains("revert")
}
