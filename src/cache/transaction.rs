//! Transaction list cache implementation using Moka

use crate::models::TransactionRecord;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Caches the stored transaction list of each address.
///
/// Entries are only valid until the next sync that persists new
/// transactions for the address; the service invalidates them then.
/// Every invalidation bumps a generation counter so a list read from the
/// store before a concurrent invalidation is never left in the cache.
#[derive(Clone)]
pub struct TransactionCacheManager {
    cache: Cache<String, Arc<Vec<TransactionRecord>>>,
    generation: Arc<AtomicU64>,
}

impl TransactionCacheManager {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn get(&self, address: &str) -> Option<Arc<Vec<TransactionRecord>>> {
        let result = self.cache.get(address).await;
        if result.is_some() {
            debug!("Cache hit for address: {}", address);
        } else {
            debug!("Cache miss for address: {}", address);
        }
        result
    }

    /// Take before reading the list from the store; pass to `insert`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Cache a list read from the store after `generation()` returned
    /// `read_at`. If an invalidation happened since, the entry is dropped
    /// again and `false` is returned.
    pub async fn insert(&self, address: &str, transactions: Arc<Vec<TransactionRecord>>, read_at: u64) -> bool {
        self.cache.insert(address.to_string(), transactions).await;

        // An invalidation after this check removes the entry itself
        if self.generation() != read_at {
            self.cache.invalidate(address).await;
            debug!("Dropped stale transaction list for address: {}", address);
            return false;
        }
        true
    }

    pub async fn invalidate(&self, address: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(address).await;
        debug!("Invalidated cached transactions for address: {}", address);
    }
}
