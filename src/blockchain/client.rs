use crate::blockchain::models::{
    parse_address_snapshot, parse_transaction_details, AddressSnapshot, TransactionDetail,
};
use crate::config::Config;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_BLOCKCHAIR_URL: &str = "https://api.blockchair.com/bitcoin";

/// The transactions dashboard accepts at most this many hashes per request.
pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider throttled the request (status {0})")]
    Throttled(u16),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("batch of {0} hashes exceeds the provider limit of {max}", max = MAX_BATCH_SIZE)]
    BatchTooLarge(usize),
}

impl ClientError {
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled(_))
    }
}

/// Read-only access to an upstream chain data provider.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Balance and the newest page of transaction hashes for `address`.
    async fn address_snapshot(&self, address: &str) -> Result<AddressSnapshot, ClientError>;

    /// Details for at most `max_batch_size()` hashes.
    async fn transaction_details(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, TransactionDetail>, ClientError>;

    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }
}

/// Minimal Blockchair REST client.
pub struct BlockchairClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
    page_size: usize,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl BlockchairClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let timeout = Duration::from_secs(config.rpc_timeout_secs);
        let http_client = Client::builder().timeout(timeout).build()?;

        let limiter = config
            .rpc_rate_limit
            .and_then(NonZeroU32::new)
            .map(|per_minute| RateLimiter::direct(Quota::per_minute(per_minute)));

        info!(
            "Initializing Blockchair client with endpoint: {}, rate limit: {:?}/min",
            config.blockchair_url, config.rpc_rate_limit
        );

        Ok(Self {
            http_client,
            base_url: config.blockchair_url.trim_end_matches('/').to_string(),
            api_key: config.blockchair_api_key.clone(),
            page_size: config.snapshot_txn_limit,
            limiter,
        })
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<String, ClientError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let mut request = self.http_client.get(url).query(query);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("GET {} -> {}", url, status);

        if is_throttle_status(status) {
            return Err(ClientError::Throttled(status.as_u16()));
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

/// Blockchair signals an exhausted quota with 402 or 430, and sometimes a plain 429.
fn is_throttle_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 402 | 429 | 430)
}

#[async_trait]
impl ChainProvider for BlockchairClient {
    async fn address_snapshot(&self, address: &str) -> Result<AddressSnapshot, ClientError> {
        let url = format!("{}/dashboards/address/{}", self.base_url, address);
        let body = self
            .get(&url, &[("limit", self.page_size.to_string())])
            .await?;

        parse_address_snapshot(address, &body)
    }

    async fn transaction_details(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, TransactionDetail>, ClientError> {
        if ids.len() > MAX_BATCH_SIZE {
            return Err(ClientError::BatchTooLarge(ids.len()));
        }
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/dashboards/transactions/{}", self.base_url, ids.join(","));
        let body = self.get(&url, &[]).await?;

        parse_transaction_details(&body)
    }
}
