use crate::discovery::FailurePolicy;
use anyhow::{Context, Result};
use std::num::NonZeroUsize;
use std::str::FromStr;

const DEFAULT_MORALIS_API_URL: &str = "https://deep-index.moralis.io/api/v2";
const DEFAULT_EXPLORER_URL: &str = "https://etherscan.io";
const DEFAULT_MAX_PAGES: NonZeroUsize = NonZeroUsize::new(10).unwrap();

#[derive(Debug, Clone)]
pub struct Config {
    pub json_rpc_urls: Vec<String>,
    pub moralis_api_key: String,
    pub moralis_api_url: String,
    pub moralis_max_pages: NonZeroUsize,
    pub wallet_private_key: Option<String>,
    pub failure_policy: FailurePolicy,
    pub explorer_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let json_rpc_urls = std::env::var("JSON_RPC_URLS")
            .or_else(|_| std::env::var("JSON_RPC_URL"))
            .context("JSON_RPC_URLS (or JSON_RPC_URL) must be set in .env")?;
        let json_rpc_urls = parse_url_list(&json_rpc_urls);

        let moralis_api_key = std::env::var("MORALIS_API_KEY")
            .context("MORALIS_API_KEY must be set in .env")?;

        let moralis_api_url = std::env::var("MORALIS_API_URL")
            .unwrap_or_else(|_| DEFAULT_MORALIS_API_URL.to_string());

        let moralis_max_pages = match std::env::var("MORALIS_MAX_PAGES") {
            Ok(value) => parse_max_pages(&value)?,
            Err(_) => DEFAULT_MAX_PAGES,
        };

        let wallet_private_key = std::env::var("WALLET_PRIVATE_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let failure_policy = match std::env::var("APPROVAL_FAILURE_POLICY") {
            Ok(value) => FailurePolicy::from_str(&value)?,
            Err(_) => FailurePolicy::default(),
        };

        let explorer_url = Self::explorer_url_from_env();

        Ok(Config {
            json_rpc_urls,
            moralis_api_key,
            moralis_api_url,
            moralis_max_pages,
            wallet_private_key,
            failure_policy,
            explorer_url,
        })
    }

    /// Explorer base URL alone, for commands that need no RPC or indexer access.
    pub fn explorer_url_from_env() -> String {
        dotenv::dotenv().ok();
        std::env::var("EXPLORER_URL").unwrap_or_else(|_| DEFAULT_EXPLORER_URL.to_string())
    }
}

fn parse_max_pages(raw: &str) -> Result<NonZeroUsize> {
    raw.trim()
        .parse()
        .with_context(|| format!("MORALIS_MAX_PAGES must be a positive integer, got '{raw}'"))
}

fn parse_url_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from)
        .collect()
}
