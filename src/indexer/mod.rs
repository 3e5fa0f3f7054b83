pub mod models;
pub mod moralis;

pub use models::{TokenDetails, TransferRecord, TransfersPage};
pub use moralis::MoralisClient;

use alloy_primitives::Address;
use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// Read-only access to an NFT indexing service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NftIndexer: Send + Sync {
    /// Full NFT transfer history of `wallet` on mainnet.
    async fn transfers(&self, wallet: Address) -> Result<Vec<TransferRecord>>;

    async fn token_metadata(&self, contract: Address, token_id: &str) -> Result<TokenDetails>;
}
