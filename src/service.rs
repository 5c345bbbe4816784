use crate::blockchain::client::ChainProvider;
use crate::cache::{self, TransactionCacheManager};
use crate::config::Config;
use crate::db::{LedgerStore, StoreError};
use crate::models::{AddressRecord, AddressState, TransactionRecord, WalletTransaction};
use crate::sync::{SyncEngine, SyncError, SyncOutcome};
use crate::transfer::{detect_transfers, TransferParams};
use crate::validation::{validate_bitcoin_address, validate_wallet_transactions, ValidationError};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Address {0} is not tracked")]
    NotTracked(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Operations exposed to the HTTP layer and the poller.
///
/// Every sync runs under a child of the service's shutdown token, so
/// shutting down aborts in-flight syncs before their final write.
pub struct WalletService {
    engine: SyncEngine,
    store: Arc<dyn LedgerStore>,
    cache: TransactionCacheManager,
    transfer_params: TransferParams,
    shutdown: CancellationToken,
}

impl WalletService {
    pub fn new(
        config: &Config,
        provider: Arc<dyn ChainProvider>,
        store: Arc<dyn LedgerStore>,
        shutdown: CancellationToken,
    ) -> Self {
        let engine = SyncEngine::new(
            provider,
            store.clone(),
            config.throttle_cooldown,
            config.gap_policy,
        );

        Self {
            engine,
            store,
            cache: cache::init_cache(config),
            transfer_params: TransferParams::new(
                config.transfer_window_secs,
                config.transfer_amount_tolerance,
            ),
            shutdown,
        }
    }

    /// Start tracking an address, running its first sync. An address that is
    /// already tracked is returned as stored.
    pub async fn add(&self, address: &str) -> Result<AddressRecord, ServiceError> {
        validate_bitcoin_address(address)?;

        if let AddressState::Tracked(record) = self.store.load_address(address).await? {
            debug!("Address {} already tracked", address);
            return Ok(record);
        }

        info!("Tracking new address {}", address);
        Ok(self.reconcile(address).await?.address)
    }

    pub async fn sync(&self, address: &str) -> Result<SyncOutcome, ServiceError> {
        validate_bitcoin_address(address)?;
        self.ensure_tracked(address).await?;
        self.reconcile(address).await
    }

    /// Balance after bringing the address up to date.
    pub async fn balance(&self, address: &str) -> Result<f64, ServiceError> {
        Ok(self.sync(address).await?.address.balance)
    }

    /// Every stored transaction of the address after bringing it up to date,
    /// newest first.
    pub async fn transactions(&self, address: &str) -> Result<Arc<Vec<TransactionRecord>>, ServiceError> {
        self.sync(address).await?;

        if let Some(cached) = self.cache.get(address).await {
            return Ok(cached);
        }

        let read_at = self.cache.generation();
        let transactions = Arc::new(self.store.list_transactions(address).await?);
        self.cache.insert(address, transactions.clone(), read_at).await;
        Ok(transactions)
    }

    pub fn detect_transfers(&self, txns: &[WalletTransaction]) -> Result<BTreeMap<String, String>, ServiceError> {
        validate_wallet_transactions(txns)?;
        let transfers = detect_transfers(txns, &self.transfer_params);
        debug!("Detected {} transfers among {} transactions", transfers.len(), txns.len());
        Ok(transfers)
    }

    pub async fn tracked_addresses(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.store.tracked_addresses().await?)
    }

    async fn ensure_tracked(&self, address: &str) -> Result<(), ServiceError> {
        match self.store.load_address(address).await? {
            AddressState::Tracked(_) => Ok(()),
            AddressState::Unseen => Err(ServiceError::NotTracked(address.to_string())),
        }
    }

    async fn reconcile(&self, address: &str) -> Result<SyncOutcome, ServiceError> {
        let cancel = self.shutdown.child_token();
        let outcome = self.engine.reconcile(address, &cancel).await?;

        if !outcome.new_transactions.is_empty() {
            self.cache.invalidate(address).await;
        }

        Ok(outcome)
    }
}
