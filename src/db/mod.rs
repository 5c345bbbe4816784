pub mod address;
pub mod connection;
pub mod ledger;
pub mod migration;
pub mod transaction;

pub use ledger::{LedgerStore, SqliteLedger};

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflicting write for address {0}: the record changed since it was read")]
    Conflict(String),

    #[error("Corrupt stored row: {0}")]
    Corrupt(String),
}

pub(crate) fn to_millis(time: &DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

pub(crate) fn from_millis(column: &str, millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Corrupt(format!("{} out of range: {}", column, millis)))
}
