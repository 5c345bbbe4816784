use crate::blockchain::client::{ChainProvider, ClientError};
use crate::blockchain::models::TransactionDetail;
use backon::{ConstantBuilder, Retryable};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("rate limit exceeded on chunk {chunk} after one cooldown retry")]
    RateLimitExceeded { chunk: usize },

    #[error("upstream error on chunk {chunk}: {source}")]
    Upstream {
        chunk: usize,
        #[source]
        source: ClientError,
    },

    #[error("fetch cancelled")]
    Cancelled,
}

/// Retrieves transaction details in provider-sized chunks, one request at a time.
///
/// The provider enforces a single global rate limit, so chunks are never
/// requested concurrently. A throttled chunk is retried once after `cooldown`;
/// any other failure aborts the whole fetch without returning partial data.
pub struct BatchFetcher {
    provider: Arc<dyn ChainProvider>,
    cooldown: Duration,
}

impl BatchFetcher {
    pub fn new(provider: Arc<dyn ChainProvider>, cooldown: Duration) -> Self {
        Self { provider, cooldown }
    }

    pub async fn fetch(
        &self,
        ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, TransactionDetail>, FetchError> {
        let batch_size = self.provider.max_batch_size().max(1);
        let mut details = HashMap::with_capacity(ids.len());

        for (chunk_index, chunk) in ids.chunks(batch_size).enumerate() {
            debug!("Fetching chunk {} ({} hashes)", chunk_index, chunk.len());

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                result = self.fetch_chunk(chunk) => result,
            };

            let chunk_details = result.map_err(|source| {
                if source.is_throttled() {
                    FetchError::RateLimitExceeded { chunk: chunk_index }
                } else {
                    FetchError::Upstream {
                        chunk: chunk_index,
                        source,
                    }
                }
            })?;

            // Chunks never overlap; should a hash repeat, the later chunk wins.
            details.extend(chunk_details);
        }

        Ok(details)
    }

    async fn fetch_chunk(
        &self,
        chunk: &[String],
    ) -> Result<HashMap<String, TransactionDetail>, ClientError> {
        let cooldown = ConstantBuilder::default()
            .with_delay(self.cooldown)
            .with_max_times(1);

        (|| self.provider.transaction_details(chunk))
            .retry(cooldown)
            .when(ClientError::is_throttled)
            .notify(|err, wait| {
                warn!("Provider throttled chunk ({}), cooling down for {:?}", err, wait);
            })
            .await
    }
}
