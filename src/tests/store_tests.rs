//! tests/store_tests.rs - conditional commits and reads against in-memory SQLite

#[cfg(test)]
mod tests {
    use crate::db::{address, LedgerStore, StoreError};
    use crate::models::{AddressRecord, AddressState, TransactionRecord};
    use crate::tests::common::{block_time, ledger, ADDRESS, OTHER_ADDRESS};
    use chrono::{DateTime, TimeDelta, Utc};
    use std::collections::BTreeSet;

    fn created() -> DateTime<Utc> {
        block_time(1_000)
    }

    fn record(public_key: &str, balance: f64, cursor: Option<&str>) -> AddressRecord {
        AddressRecord {
            public_key: public_key.to_string(),
            balance,
            created_at: created(),
            updated_at: created(),
            last_txn_hash: cursor.map(str::to_string),
        }
    }

    fn transaction(hash: &str, public_key: &str, minute: i64) -> TransactionRecord {
        TransactionRecord {
            txn_hash: hash.to_string(),
            public_key: public_key.to_string(),
            amount: 12.34,
            fee: 0.25,
            tags: BTreeSet::new(),
            txn_timestamp: block_time(minute),
            created_at: created(),
        }
    }

    #[tokio::test]
    async fn test_unseen_until_first_commit() {
        let store = ledger().await;

        assert_eq!(store.load_address(ADDRESS).await.unwrap(), AddressState::Unseen);
        assert!(store.tracked_addresses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_round_trips_records() {
        let store = ledger().await;
        let address = record(ADDRESS, 1_234.5, Some("tx2"));
        let mut tagged = transaction("tx2", ADDRESS, 2);
        tagged.tags = ["exchange".to_string(), "payroll".to_string()].into_iter().collect();
        let txns = vec![tagged, transaction("tx1", ADDRESS, 1)];

        store.commit_sync(&AddressState::Unseen, &address, &txns).await.unwrap();

        assert_eq!(
            store.load_address(ADDRESS).await.unwrap(),
            AddressState::Tracked(address)
        );
        assert_eq!(store.list_transactions(ADDRESS).await.unwrap(), txns);
    }

    #[tokio::test]
    async fn test_second_first_commit_conflicts() {
        let store = ledger().await;
        let first = record(ADDRESS, 1.0, Some("tx1"));
        let second = record(ADDRESS, 2.0, Some("tx2"));

        store
            .commit_sync(&AddressState::Unseen, &first, &[transaction("tx1", ADDRESS, 1)])
            .await
            .unwrap();
        let result = store
            .commit_sync(&AddressState::Unseen, &second, &[transaction("tx2", ADDRESS, 2)])
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(ref key)) if key == ADDRESS));
        // the losing commit left no trace
        assert_eq!(store.load_address(ADDRESS).await.unwrap(), AddressState::Tracked(first));
        let hashes = store.transaction_hashes(ADDRESS).await.unwrap();
        assert_eq!(hashes.len(), 1);
        assert!(hashes.contains("tx1"));
    }

    #[tokio::test]
    async fn test_stale_cursor_conflicts() {
        let store = ledger().await;
        let initial = record(ADDRESS, 1.0, Some("tx1"));
        store.commit_sync(&AddressState::Unseen, &initial, &[]).await.unwrap();

        let observed = AddressState::Tracked(initial.clone());
        let mut advanced = initial.clone();
        advanced.last_txn_hash = Some("tx2".to_string());
        advanced.updated_at = created() + TimeDelta::seconds(5);
        store
            .commit_sync(&observed, &advanced, &[transaction("tx2", ADDRESS, 2)])
            .await
            .unwrap();

        // a pass that still believes the cursor is tx1
        let mut stale = initial.clone();
        stale.last_txn_hash = Some("tx3".to_string());
        let result = store
            .commit_sync(&observed, &stale, &[transaction("tx3", ADDRESS, 3)])
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.load_address(ADDRESS).await.unwrap(), AddressState::Tracked(advanced));
        assert!(!store.transaction_hashes(ADDRESS).await.unwrap().contains("tx3"));
    }

    #[tokio::test]
    async fn test_tracked_without_cursor_compares_null() {
        let store = ledger().await;
        let empty = record(ADDRESS, 0.0, None);
        store.commit_sync(&AddressState::Unseen, &empty, &[]).await.unwrap();

        let mut funded = empty.clone();
        funded.balance = 3.0;
        funded.last_txn_hash = Some("tx1".to_string());
        store
            .commit_sync(&AddressState::Tracked(empty), &funded, &[transaction("tx1", ADDRESS, 1)])
            .await
            .unwrap();

        assert_eq!(store.load_address(ADDRESS).await.unwrap(), AddressState::Tracked(funded));
    }

    #[tokio::test]
    async fn test_duplicate_transactions_are_ignored() {
        let store = ledger().await;
        let initial = record(ADDRESS, 1.0, Some("tx1"));
        let txn = transaction("tx1", ADDRESS, 1);
        store
            .commit_sync(&AddressState::Unseen, &initial, &[txn.clone(), txn.clone()])
            .await
            .unwrap();

        let mut changed = txn.clone();
        changed.amount = 99.0;
        store
            .commit_sync(&AddressState::Tracked(initial.clone()), &initial, &[changed])
            .await
            .unwrap();

        // first write wins
        assert_eq!(store.list_transactions(ADDRESS).await.unwrap(), vec![txn]);
    }

    #[tokio::test]
    async fn test_transactions_listed_newest_first() {
        let store = ledger().await;
        let txns = vec![
            transaction("tx-b", ADDRESS, 5),
            transaction("tx-old", ADDRESS, 1),
            transaction("tx-new", ADDRESS, 9),
            transaction("tx-a", ADDRESS, 5),
        ];
        store
            .commit_sync(&AddressState::Unseen, &record(ADDRESS, 1.0, Some("tx-new")), &txns)
            .await
            .unwrap();

        let listed: Vec<_> = store
            .list_transactions(ADDRESS)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.txn_hash)
            .collect();

        assert_eq!(listed, vec!["tx-new", "tx-a", "tx-b", "tx-old"]);
    }

    #[tokio::test]
    async fn test_tracked_addresses_in_creation_order() {
        let store = ledger().await;
        let mut later = record(ADDRESS, 1.0, None);
        later.created_at = created() + TimeDelta::minutes(1);
        later.updated_at = later.created_at;

        store.commit_sync(&AddressState::Unseen, &later, &[]).await.unwrap();
        store
            .commit_sync(&AddressState::Unseen, &record(OTHER_ADDRESS, 1.0, None), &[])
            .await
            .unwrap();

        assert_eq!(
            store.tracked_addresses().await.unwrap(),
            vec![OTHER_ADDRESS.to_string(), ADDRESS.to_string()]
        );
    }

    #[tokio::test]
    async fn test_insert_address_reports_existing_row() {
        let store = ledger().await;
        let row = record(ADDRESS, 1.0, None);

        assert!(address::insert_address(store.pool(), &row).await.unwrap());
        assert!(!address::insert_address(store.pool(), &row).await.unwrap());
    }

    #[tokio::test]
    async fn test_transaction_requires_address_row() {
        let store = ledger().await;
        let orphan = transaction("tx1", ADDRESS, 1);

        let result = crate::db::transaction::insert_transaction(store.pool(), &orphan).await;

        assert!(matches!(result, Err(StoreError::Database(_))));
    }
}
