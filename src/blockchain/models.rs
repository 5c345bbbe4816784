use crate::blockchain::client::ClientError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// Upstream view of an address: balance plus transaction hashes, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressSnapshot {
    pub balance: f64,
    pub txn_ids: Vec<String>,
}

/// Transaction detail as returned by the transactions dashboard.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionDetail {
    pub hash: String,
    #[serde(rename = "time", deserialize_with = "blockchair_time")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "output_total_usd")]
    pub amount: f64,
    #[serde(rename = "fee_usd")]
    pub fee: f64,
}

#[derive(Deserialize)]
struct AddressDashboardResponse {
    data: HashMap<String, AddressDashboard>,
}

#[derive(Deserialize)]
struct AddressDashboard {
    address: AddressSummary,
    transactions: Vec<String>,
}

#[derive(Deserialize)]
struct AddressSummary {
    balance_usd: f64,
}

#[derive(Deserialize)]
struct TransactionsDashboardResponse {
    data: HashMap<String, TransactionEntry>,
}

#[derive(Deserialize)]
struct TransactionEntry {
    transaction: TransactionDetail,
}

fn blockchair_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| serde::de::Error::custom(format!("invalid block time: {}", raw)))
}

/// Decode an address dashboard body. The payload is keyed by the address;
/// Blockchair may normalise its case, so fall back to a case-insensitive match.
pub fn parse_address_snapshot(address: &str, body: &str) -> Result<AddressSnapshot, ClientError> {
    let mut response: AddressDashboardResponse = serde_json::from_str(body)
        .map_err(|e| ClientError::Malformed(format!("address dashboard: {}", e)))?;

    let key = if response.data.contains_key(address) {
        address.to_string()
    } else {
        response
            .data
            .keys()
            .find(|key| key.eq_ignore_ascii_case(address))
            .cloned()
            .ok_or_else(|| {
                ClientError::Malformed(format!("address dashboard has no entry for {}", address))
            })?
    };

    let dashboard = response
        .data
        .remove(&key)
        .ok_or_else(|| ClientError::Malformed(format!("address dashboard has no entry for {}", address)))?;

    Ok(AddressSnapshot {
        balance: dashboard.address.balance_usd,
        txn_ids: dashboard.transactions,
    })
}

/// Decode a transactions dashboard body into details keyed by hash.
pub fn parse_transaction_details(body: &str) -> Result<HashMap<String, TransactionDetail>, ClientError> {
    let response: TransactionsDashboardResponse = serde_json::from_str(body)
        .map_err(|e| ClientError::Malformed(format!("transactions dashboard: {}", e)))?;

    Ok(response
        .data
        .into_iter()
        .map(|(hash, entry)| (hash, entry.transaction))
        .collect())
}
