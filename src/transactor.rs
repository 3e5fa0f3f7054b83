use alloy_primitives::TxHash;
use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::time::Instant;
use tracing::{error, info};

/// Submits a write and reports its progress to the user.
#[async_trait]
pub trait Transactor: Send + Sync {
    async fn transact(&self, description: &str, tx: BoxFuture<'_, Result<TxHash>>) -> Result<TxHash>;
}

pub struct LoggingTransactor;

#[async_trait]
impl Transactor for LoggingTransactor {
    async fn transact(&self, description: &str, tx: BoxFuture<'_, Result<TxHash>>) -> Result<TxHash> {
        let start = Instant::now();
        info!("{}: waiting for wallet signature and confirmation", description);

        match tx.await {
            Ok(tx_hash) => {
                info!(
                    "{}: confirmed in {} after {:?}",
                    description,
                    tx_hash,
                    start.elapsed()
                );
                Ok(tx_hash)
            }
            Err(e) => {
                error!("{}: failed: {:#}", description, e);
                Err(e)
            }
        }
    }
}
