// Address rows:
// - get_address(executor, public_key) -> Option<AddressRecord>
// - insert_address / compare_and_update: conditional writes used by the sync commit
// - get_all_tracked_addresses(pool) -> Vec<String>

use crate::db::{from_millis, to_millis, StoreError};
use crate::models::AddressRecord;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Pool, Row, Sqlite};

pub async fn get_address<'e, E>(executor: E, public_key: &str) -> Result<Option<AddressRecord>, StoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT public_key, balance, created_at, updated_at, last_txn_hash
         FROM addresses WHERE public_key = ?",
    )
    .bind(public_key)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(address_from_row).transpose()
}

/// Insert a first-seen address. Returns `false` when a row already exists,
/// i.e. another sync created it after our read.
pub async fn insert_address<'e, E>(executor: E, record: &AddressRecord) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO addresses (public_key, balance, created_at, updated_at, last_txn_hash)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(public_key) DO NOTHING",
    )
    .bind(&record.public_key)
    .bind(record.balance)
    .bind(to_millis(&record.created_at))
    .bind(to_millis(&record.updated_at))
    .bind(record.last_txn_hash.as_deref())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Update an address only if its cursor is still `expected_cursor`.
/// Returns `false` when the cursor moved (or the row vanished).
pub async fn compare_and_update<'e, E>(
    executor: E,
    record: &AddressRecord,
    expected_cursor: Option<&str>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE addresses
         SET balance = ?, updated_at = ?, last_txn_hash = ?
         WHERE public_key = ? AND last_txn_hash IS ?",
    )
    .bind(record.balance)
    .bind(to_millis(&record.updated_at))
    .bind(record.last_txn_hash.as_deref())
    .bind(&record.public_key)
    .bind(expected_cursor)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn get_all_tracked_addresses(pool: &Pool<Sqlite>) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query("SELECT public_key FROM addresses ORDER BY created_at, public_key")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|row| row.get("public_key")).collect())
}

fn address_from_row(row: &SqliteRow) -> Result<AddressRecord, StoreError> {
    Ok(AddressRecord {
        public_key: row.try_get("public_key")?,
        balance: row.try_get("balance")?,
        created_at: from_millis("created_at", row.try_get("created_at")?)?,
        updated_at: from_millis("updated_at", row.try_get("updated_at")?)?,
        last_txn_hash: row.try_get("last_txn_hash")?,
    })
}
