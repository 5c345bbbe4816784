use crate::db::{from_millis, to_millis, StoreError};
use crate::models::TransactionRecord;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Pool, Row, Sqlite};
use std::collections::{BTreeSet, HashSet};

/// Insert-or-ignore by `(txn_hash, public_key)`. Returns whether a row was written.
pub async fn insert_transaction<'e, E>(executor: E, record: &TransactionRecord) -> Result<bool, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let tags = serde_json::to_string(&record.tags)
        .map_err(|e| StoreError::Corrupt(format!("unencodable tags: {}", e)))?;

    let result = sqlx::query(
        r#"
        INSERT INTO transactions
        (txn_hash, public_key, amount, fee, tags, txn_timestamp, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(txn_hash, public_key) DO NOTHING
        "#,
    )
    .bind(&record.txn_hash)
    .bind(&record.public_key)
    .bind(record.amount)
    .bind(record.fee)
    .bind(tags)
    .bind(to_millis(&record.txn_timestamp))
    .bind(to_millis(&record.created_at))
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// All stored transactions for an address, newest first.
pub async fn get_transactions(pool: &Pool<Sqlite>, public_key: &str) -> Result<Vec<TransactionRecord>, StoreError> {
    let rows = sqlx::query(
        r#"SELECT txn_hash, public_key, amount, fee, tags, txn_timestamp, created_at
           FROM transactions
           WHERE public_key = ?
           ORDER BY txn_timestamp DESC, txn_hash ASC"#,
    )
    .bind(public_key)
    .fetch_all(pool)
    .await?;

    rows.iter().map(transaction_from_row).collect()
}

pub async fn get_transaction_hashes(pool: &Pool<Sqlite>, public_key: &str) -> Result<HashSet<String>, sqlx::Error> {
    let rows = sqlx::query("SELECT txn_hash FROM transactions WHERE public_key = ?")
        .bind(public_key)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|row| row.get("txn_hash")).collect())
}

fn transaction_from_row(row: &SqliteRow) -> Result<TransactionRecord, StoreError> {
    let raw_tags: String = row.try_get("tags")?;
    let tags: BTreeSet<String> = serde_json::from_str(&raw_tags)
        .map_err(|e| StoreError::Corrupt(format!("tags column: {}", e)))?;

    Ok(TransactionRecord {
        txn_hash: row.try_get("txn_hash")?,
        public_key: row.try_get("public_key")?,
        amount: row.try_get("amount")?,
        fee: row.try_get("fee")?,
        tags,
        txn_timestamp: from_millis("txn_timestamp", row.try_get("txn_timestamp")?)?,
        created_at: from_millis("created_at", row.try_get("created_at")?)?,
    })
}
