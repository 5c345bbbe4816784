// Ledger records persisted by the sync engine, the address lifecycle,
// and the wallet transactions fed to transfer detection.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Row of the `addresses` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub public_key: String,
    pub balance: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Newest transaction hash known as of the last successful sync.
    pub last_txn_hash: Option<String>,
}

/// Row of the `transactions` table, keyed by `(txn_hash, public_key)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub txn_hash: String,
    pub public_key: String,
    pub amount: f64,
    pub fee: f64,
    pub tags: BTreeSet<String>,
    pub txn_timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Whether the store has seen an address before.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressState {
    Unseen,
    Tracked(AddressRecord),
}

impl AddressState {
    pub fn record(&self) -> Option<&AddressRecord> {
        match self {
            Self::Unseen => None,
            Self::Tracked(record) => Some(record),
        }
    }

    pub fn cursor(&self) -> Option<&str> {
        self.record().and_then(|record| record.last_txn_hash.as_deref())
    }

    pub fn is_tracked(&self) -> bool {
        matches!(self, Self::Tracked(_))
    }
}

impl From<Option<AddressRecord>> for AddressState {
    fn from(record: Option<AddressRecord>) -> Self {
        record.map_or(Self::Unseen, Self::Tracked)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

/// A transaction as seen from one of a user's wallets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: String,
    #[serde(rename = "wallet")]
    pub wallet_id: String,
    #[serde(alias = "flow")]
    pub direction: Direction,
    #[serde(rename = "time", with = "wallet_time")]
    pub timestamp: DateTime<Utc>,
    pub amount: f64,
}

/// Current time truncated to the millisecond precision the store keeps.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Accepts `2006-01-02 15:04:05 UTC` or RFC 3339; always writes the former.
mod wallet_time {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, FORMAT) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|time| time.with_timezone(&Utc))
            .map_err(|_| de::Error::custom(format!("invalid transaction time: {}", raw)))
    }
}
