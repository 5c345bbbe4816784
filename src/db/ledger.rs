use crate::db::{address, transaction, StoreError};
use crate::models::{AddressRecord, AddressState, TransactionRecord};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Persistence consumed by the sync engine and the service layer.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Resolve the lifecycle state of an address with a single read.
    async fn load_address(&self, public_key: &str) -> Result<AddressState, StoreError>;

    /// Atomically persist one sync pass.
    ///
    /// `observed` is the state read at the start of the pass; the write only
    /// applies if the stored address still matches it (no row for `Unseen`,
    /// the same cursor for `Tracked`). Otherwise nothing is written and
    /// `StoreError::Conflict` is returned.
    async fn commit_sync(
        &self,
        observed: &AddressState,
        address: &AddressRecord,
        transactions: &[TransactionRecord],
    ) -> Result<(), StoreError>;

    async fn transaction_hashes(&self, public_key: &str) -> Result<HashSet<String>, StoreError>;

    async fn list_transactions(&self, public_key: &str) -> Result<Vec<TransactionRecord>, StoreError>;

    async fn tracked_addresses(&self) -> Result<Vec<String>, StoreError>;
}

#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    async fn load_address(&self, public_key: &str) -> Result<AddressState, StoreError> {
        let record = address::get_address(&self.pool, public_key).await?;
        Ok(AddressState::from(record))
    }

    async fn commit_sync(
        &self,
        observed: &AddressState,
        record: &AddressRecord,
        transactions: &[TransactionRecord],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // The address write goes first: it takes SQLite's write lock and
        // carries the compare-and-swap condition.
        let applied = match observed {
            AddressState::Unseen => address::insert_address(&mut *tx, record).await?,
            AddressState::Tracked(previous) => {
                address::compare_and_update(&mut *tx, record, previous.last_txn_hash.as_deref()).await?
            }
        };

        if !applied {
            warn!("Sync commit for {} lost a race, rolling back", record.public_key);
            tx.rollback().await?;
            return Err(StoreError::Conflict(record.public_key.clone()));
        }

        let mut inserted = 0;
        for txn in transactions {
            if transaction::insert_transaction(&mut *tx, txn).await? {
                inserted += 1;
            }
        }

        tx.commit().await?;

        debug!(
            "Committed sync for {}: {} of {} transactions inserted",
            record.public_key,
            inserted,
            transactions.len()
        );
        Ok(())
    }

    async fn transaction_hashes(&self, public_key: &str) -> Result<HashSet<String>, StoreError> {
        Ok(transaction::get_transaction_hashes(&self.pool, public_key).await?)
    }

    async fn list_transactions(&self, public_key: &str) -> Result<Vec<TransactionRecord>, StoreError> {
        transaction::get_transactions(&self.pool, public_key).await
    }

    async fn tracked_addresses(&self) -> Result<Vec<String>, StoreError> {
        Ok(address::get_all_tracked_addresses(&self.pool).await?)
    }
}
