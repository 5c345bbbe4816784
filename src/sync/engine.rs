use crate::blockchain::client::ChainProvider;
use crate::blockchain::fetcher::{BatchFetcher, FetchError};
use crate::blockchain::models::{AddressSnapshot, TransactionDetail};
use crate::db::LedgerStore;
use crate::models::{now_millis, AddressRecord, AddressState, TransactionRecord};
use crate::sync::error::{SyncError, SyncStage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What to do when the stored cursor is missing from the upstream page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    /// Surface `SyncError::GapDetected` and write nothing.
    #[default]
    Fail,
    /// Treat the page as a full resync; already stored hashes are skipped.
    Resync,
}

impl FromStr for GapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "resync" => Ok(Self::Resync),
            other => Err(format!("unknown gap policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub address: AddressRecord,
    pub new_transactions: Vec<TransactionRecord>,
}

/// The slice of `page` (newest first) that is newer than `cursor`.
///
/// Without a cursor the whole page is new. `None` means the cursor is not on
/// the page at all, so the page cannot be joined to what is stored.
pub fn new_transaction_ids<'a>(cursor: Option<&str>, page: &'a [String]) -> Option<&'a [String]> {
    match cursor {
        None => Some(page),
        Some(cursor) => page
            .iter()
            .position(|id| id == cursor)
            .map(|position| &page[..position]),
    }
}

/// Reconciles one address at a time against the upstream provider.
pub struct SyncEngine {
    provider: Arc<dyn ChainProvider>,
    store: Arc<dyn LedgerStore>,
    fetcher: BatchFetcher,
    gap_policy: GapPolicy,
}

impl SyncEngine {
    pub fn new(
        provider: Arc<dyn ChainProvider>,
        store: Arc<dyn LedgerStore>,
        throttle_cooldown: Duration,
        gap_policy: GapPolicy,
    ) -> Self {
        let fetcher = BatchFetcher::new(provider.clone(), throttle_cooldown);
        Self {
            provider,
            store,
            fetcher,
            gap_policy,
        }
    }

    /// Run one reconciliation pass for `address`.
    ///
    /// Reads the stored state, pulls the upstream snapshot, fetches details
    /// for every hash newer than the cursor and commits the new transactions
    /// together with the updated address in a single conditional write.
    /// Nothing is persisted unless the whole pass succeeds.
    pub async fn reconcile(&self, address: &str, cancel: &CancellationToken) -> Result<SyncOutcome, SyncError> {
        let state = self
            .store
            .load_address(address)
            .await
            .map_err(|source| store_error(address, SyncStage::Load, source))?;

        debug!(
            "Reconciling {} (tracked: {}, cursor: {:?})",
            address,
            state.is_tracked(),
            state.cursor()
        );

        let snapshot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(address)),
            snapshot = self.provider.address_snapshot(address) => snapshot,
        };
        let snapshot =
            snapshot.map_err(|source| SyncError::from_client(address, SyncStage::Snapshot, source))?;

        let new_ids = self.select_new_ids(address, &state, &snapshot).await?;

        let mut details = self
            .fetcher
            .fetch(&new_ids, cancel)
            .await
            .map_err(|e| fetch_error(address, e))?;

        let now = now_millis();
        let new_transactions = new_ids
            .iter()
            .map(|id| build_transaction(address, id, details.remove(id), now))
            .collect::<Result<Vec<_>, _>>()?;
        let record = next_address_record(address, &state, &snapshot, now);

        if cancel.is_cancelled() {
            return Err(cancelled(address));
        }

        self.store
            .commit_sync(&state, &record, &new_transactions)
            .await
            .map_err(|source| store_error(address, SyncStage::Write, source))?;

        info!(
            "Synced {}: {} new transactions, balance {}, cursor {:?}",
            address,
            new_transactions.len(),
            record.balance,
            record.last_txn_hash
        );

        Ok(SyncOutcome {
            address: record,
            new_transactions,
        })
    }

    async fn select_new_ids(
        &self,
        address: &str,
        state: &AddressState,
        snapshot: &AddressSnapshot,
    ) -> Result<Vec<String>, SyncError> {
        if let Some(ids) = new_transaction_ids(state.cursor(), &snapshot.txn_ids) {
            return Ok(ids.to_vec());
        }

        // A cursor can only be present on a tracked address
        let cursor = state.cursor().unwrap_or_default().to_string();
        match self.gap_policy {
            GapPolicy::Fail => {
                warn!("Cursor {} for {} not found in upstream page", cursor, address);
                Err(SyncError::GapDetected {
                    address: address.to_string(),
                    cursor,
                })
            }
            GapPolicy::Resync => {
                warn!("Cursor {} for {} not found in upstream page, resyncing page", cursor, address);
                let known = self
                    .store
                    .transaction_hashes(address)
                    .await
                    .map_err(|source| store_error(address, SyncStage::Load, source))?;

                Ok(snapshot
                    .txn_ids
                    .iter()
                    .filter(|id| !known.contains(*id))
                    .cloned()
                    .collect())
            }
        }
    }
}

fn build_transaction(
    address: &str,
    id: &str,
    detail: Option<TransactionDetail>,
    now: DateTime<Utc>,
) -> Result<TransactionRecord, SyncError> {
    let malformed = |reason: String| SyncError::MalformedData {
        address: address.to_string(),
        stage: SyncStage::Fetch,
        reason,
    };

    let detail = detail.ok_or_else(|| malformed(format!("no detail returned for transaction {}", id)))?;
    if detail.hash != id {
        return Err(malformed(format!(
            "detail for transaction {} carries hash {}",
            id, detail.hash
        )));
    }

    Ok(TransactionRecord {
        txn_hash: detail.hash,
        public_key: address.to_string(),
        amount: detail.amount,
        fee: detail.fee,
        tags: BTreeSet::new(),
        txn_timestamp: detail.timestamp,
        created_at: now,
    })
}

/// The address row after this pass. `updated_at` only moves when the
/// balance or cursor actually changed.
fn next_address_record(
    address: &str,
    state: &AddressState,
    snapshot: &AddressSnapshot,
    now: DateTime<Utc>,
) -> AddressRecord {
    let cursor = snapshot
        .txn_ids
        .first()
        .cloned()
        .or_else(|| state.cursor().map(str::to_string));

    match state.record() {
        None => AddressRecord {
            public_key: address.to_string(),
            balance: snapshot.balance,
            created_at: now,
            updated_at: now,
            last_txn_hash: cursor,
        },
        Some(previous) => {
            let changed = previous.balance != snapshot.balance || previous.last_txn_hash != cursor;
            AddressRecord {
                public_key: previous.public_key.clone(),
                balance: snapshot.balance,
                created_at: previous.created_at,
                updated_at: if changed { now } else { previous.updated_at },
                last_txn_hash: cursor,
            }
        }
    }
}

fn store_error(address: &str, stage: SyncStage, source: crate::db::StoreError) -> SyncError {
    SyncError::Store {
        address: address.to_string(),
        stage,
        source,
    }
}

fn cancelled(address: &str) -> SyncError {
    SyncError::Cancelled {
        address: address.to_string(),
    }
}

fn fetch_error(address: &str, error: FetchError) -> SyncError {
    match error {
        FetchError::RateLimitExceeded { chunk } => {
            warn!("Chunk {} for {} still throttled after cooldown", chunk, address);
            SyncError::RateLimitExceeded {
                address: address.to_string(),
                stage: SyncStage::Fetch,
            }
        }
        FetchError::Upstream { source, .. } => SyncError::from_client(address, SyncStage::Fetch, source),
        FetchError::Cancelled => cancelled(address),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn cursor_at_kth_newest_yields_k_minus_one_ids() {
        let ids = page(&["f", "e", "d", "c", "b", "a"]);
        // "c" is the 4th newest
        let new_ids = new_transaction_ids(Some("c"), &ids).unwrap();
        assert_eq!(new_ids, &ids[..3]);
        assert_eq!(new_ids, ["f", "e", "d"]);
    }

    #[test]
    fn cursor_at_head_yields_nothing() {
        let ids = page(&["b", "a"]);
        assert_eq!(new_transaction_ids(Some("b"), &ids).unwrap().len(), 0);
    }

    #[test]
    fn no_cursor_takes_whole_page() {
        let ids = page(&["b", "a"]);
        assert_eq!(new_transaction_ids(None, &ids).unwrap(), &ids[..]);
    }

    #[test]
    fn missing_cursor_is_a_gap() {
        let ids = page(&["b", "a"]);
        assert!(new_transaction_ids(Some("z"), &ids).is_none());
        assert!(new_transaction_ids(Some("z"), &[]).is_none());
    }

    #[test]
    fn gap_policy_parses_case_insensitively() {
        assert_eq!("Resync".parse::<GapPolicy>().unwrap(), GapPolicy::Resync);
        assert_eq!("fail".parse::<GapPolicy>().unwrap(), GapPolicy::Fail);
        assert!("skip".parse::<GapPolicy>().is_err());
    }
}
