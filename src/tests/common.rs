//! Shared fixtures: a scripted chain provider and an in-memory ledger.

use crate::blockchain::client::{ChainProvider, ClientError};
use crate::blockchain::models::{AddressSnapshot, TransactionDetail};
use crate::db::{connection, SqliteLedger};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub const ADDRESS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
pub const OTHER_ADDRESS: &str = "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy";

/// Provider whose answers are set up by the test.
#[derive(Default)]
pub struct ScriptedProvider {
    snapshots: Mutex<HashMap<String, AddressSnapshot>>,
    details: Mutex<HashMap<String, TransactionDetail>>,
    /// Number of upcoming detail requests to answer with a throttle.
    throttles: Mutex<usize>,
    /// Detail request (0-based) that fails with a server error.
    fail_on_call: Mutex<Option<usize>>,
    /// Hashes whose details the provider pretends not to know.
    missing: Mutex<HashSet<String>>,
    snapshot_throttled: Mutex<bool>,
    detail_calls: Mutex<Vec<Vec<String>>>,
    snapshot_calls: Mutex<usize>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `ids` (newest first) for `address`, registering a detail for each.
    pub fn set_history(&self, address: &str, balance: f64, ids: &[String]) {
        {
            let mut details = self.details.lock().unwrap();
            for id in ids {
                details.entry(id.clone()).or_insert_with(|| detail(id));
            }
        }
        self.snapshots.lock().unwrap().insert(
            address.to_string(),
            AddressSnapshot {
                balance,
                txn_ids: ids.to_vec(),
            },
        );
    }

    pub fn register_details(&self, ids: &[String]) {
        let mut details = self.details.lock().unwrap();
        for id in ids {
            details.insert(id.clone(), detail(id));
        }
    }

    pub fn throttle_next(&self, count: usize) {
        *self.throttles.lock().unwrap() = count;
    }

    pub fn fail_on_call(&self, call: usize) {
        *self.fail_on_call.lock().unwrap() = Some(call);
    }

    pub fn drop_detail(&self, id: &str) {
        self.missing.lock().unwrap().insert(id.to_string());
    }

    pub fn throttle_snapshots(&self) {
        *self.snapshot_throttled.lock().unwrap() = true;
    }

    pub fn detail_calls(&self) -> Vec<Vec<String>> {
        self.detail_calls.lock().unwrap().clone()
    }

    pub fn detail_call_sizes(&self) -> Vec<usize> {
        self.detail_calls().iter().map(Vec::len).collect()
    }

    pub fn snapshot_calls(&self) -> usize {
        *self.snapshot_calls.lock().unwrap()
    }
}

#[async_trait]
impl ChainProvider for ScriptedProvider {
    async fn address_snapshot(&self, address: &str) -> Result<AddressSnapshot, ClientError> {
        *self.snapshot_calls.lock().unwrap() += 1;
        if *self.snapshot_throttled.lock().unwrap() {
            return Err(ClientError::Throttled(402));
        }

        self.snapshots
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| ClientError::Malformed(format!("address dashboard has no entry for {}", address)))
    }

    async fn transaction_details(&self, ids: &[String]) -> Result<HashMap<String, TransactionDetail>, ClientError> {
        let call = {
            let mut calls = self.detail_calls.lock().unwrap();
            calls.push(ids.to_vec());
            calls.len() - 1
        };

        {
            let mut throttles = self.throttles.lock().unwrap();
            if *throttles > 0 {
                *throttles -= 1;
                return Err(ClientError::Throttled(402));
            }
        }

        if *self.fail_on_call.lock().unwrap() == Some(call) {
            return Err(ClientError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }

        let details = self.details.lock().unwrap();
        let missing = self.missing.lock().unwrap();
        Ok(ids
            .iter()
            .filter(|id| !missing.contains(*id))
            .filter_map(|id| details.get(id).map(|detail| (id.clone(), detail.clone())))
            .collect())
    }
}

/// Deterministic detail: amount and time derived from the numeric suffix of the hash.
pub fn detail(id: &str) -> TransactionDetail {
    let n: i64 = id
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .unwrap_or(0);

    TransactionDetail {
        hash: id.to_string(),
        timestamp: block_time(n),
        amount: 10.0 + n as f64,
        fee: 0.5,
    }
}

pub fn block_time(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap() + chrono::TimeDelta::minutes(n)
}

/// `tx{to}` down to `tx{from}`: a newest-first page of hashes.
pub fn newest_first(from: usize, to: usize) -> Vec<String> {
    (from..=to).rev().map(|n| format!("tx{}", n)).collect()
}

pub fn ids(count: usize) -> Vec<String> {
    (0..count).map(|n| format!("tx{}", n)).collect()
}

pub async fn ledger() -> SqliteLedger {
    let pool = connection::in_memory()
        .await
        .expect("Failed to create in-memory database");
    SqliteLedger::new(pool)
}
