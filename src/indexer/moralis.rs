use super::{NftIndexer, TokenDetails, TransferRecord, TransfersPage};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::debug;

const CHAIN: &str = "eth";
const FORMAT: &str = "decimal";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_BODY_LIMIT: usize = 256;

pub struct MoralisClient {
    http: Client,
    base_url: String,
    api_key: String,
    max_pages: NonZeroUsize,
}

impl MoralisClient {
    pub fn new(base_url: &str, api_key: &str, max_pages: NonZeroUsize) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(MoralisClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            max_pages,
        })
    }

    fn transfers_url(&self, wallet: Address) -> String {
        format!("{}/{}/nft/transfers", self.base_url, wallet)
    }

    fn token_url(&self, contract: Address, token_id: &str) -> String {
        format!("{}/nft/{}/{}", self.base_url, contract, token_id)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .http
            .get(url)
            .header("X-API-Key", &self.api_key)
            .header("accept", "application/json")
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "{} returned {}: {}",
                url,
                status,
                truncate(&body, ERROR_BODY_LIMIT)
            );
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to decode response from {url}"))
    }
}

#[async_trait]
impl NftIndexer for MoralisClient {
    async fn transfers(&self, wallet: Address) -> Result<Vec<TransferRecord>> {
        let url = self.transfers_url(wallet);
        let mut transfers = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 0..self.max_pages.get() {
            let page_data: TransfersPage = {
                let mut query = vec![("chain", CHAIN), ("format", FORMAT)];
                if let Some(cursor) = cursor.as_deref() {
                    query.push(("cursor", cursor));
                }
                self.get_json(&url, &query).await?
            };
            debug!(
                "Fetched transfer page {} for {}: {} records",
                page,
                wallet,
                page_data.result.len()
            );
            transfers.extend(page_data.result);

            match page_data.cursor.filter(|next| !next.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(transfers)
    }

    async fn token_metadata(&self, contract: Address, token_id: &str) -> Result<TokenDetails> {
        let url = self.token_url(contract, token_id);
        self.get_json(&url, &[("chain", CHAIN), ("format", FORMAT)])
            .await
    }
}

fn truncate(body: &str, limit: usize) -> &str {
    match body.char_indices().nth(limit) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn client() -> MoralisClient {
        MoralisClient::new(
            "https://deep-index.moralis.io/api/v2/",
            "key",
            NonZeroUsize::new(2).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn builds_transfer_history_url() {
        let wallet = address!("0x00000000000000000000000000000000000000aa");
        assert_eq!(
            client().transfers_url(wallet),
            format!("https://deep-index.moralis.io/api/v2/{wallet}/nft/transfers")
        );
    }

    #[test]
    fn builds_token_metadata_url() {
        let contract = address!("0xbc4ca0eda7647a8ab7c2061c2e118a18a936f13d");
        assert_eq!(
            client().token_url(contract, "4021"),
            format!("https://deep-index.moralis.io/api/v2/nft/{contract}/4021")
        );
    }

    #[test]
    fn strips_trailing_slash_from_base_url() {
        assert_eq!(client().base_url, "https://deep-index.moralis.io/api/v2");
    }

    #[test]
    fn truncates_long_error_bodies() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
    }
}
