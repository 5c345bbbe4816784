//! Inference of transfers between a user's own wallets.
//!
//! An outbound transaction on one wallet and an inbound transaction of the
//! same amount on another wallet shortly afterwards are most likely the same
//! movement of funds. Transactions are sorted by time so each outbound leg
//! only has to look at a bounded window ahead of it.

use crate::models::{Direction, WalletTransaction};
use chrono::TimeDelta;
use std::collections::BTreeMap;

/// Absorbs float noise when comparing amount differences to the tolerance.
const AMOUNT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferParams {
    /// How long after an outbound leg its inbound leg may arrive.
    pub window: TimeDelta,
    /// Largest absolute amount difference still considered equal.
    pub amount_tolerance: f64,
}

impl Default for TransferParams {
    fn default() -> Self {
        Self {
            window: TimeDelta::minutes(5),
            amount_tolerance: 0.01,
        }
    }
}

impl TransferParams {
    pub fn new(window_secs: u64, amount_tolerance: f64) -> Self {
        let window_secs = i64::try_from(window_secs).unwrap_or(i64::MAX);
        Self {
            window: TimeDelta::try_seconds(window_secs).unwrap_or(TimeDelta::days(365)),
            amount_tolerance,
        }
    }
}

/// Pair outbound transactions with inbound ones on other wallets.
///
/// Returns `out_id -> in_id`. Each transaction is used at most once; for
/// every outbound leg (in time order) the closest inbound candidate in time
/// wins, then the closest in amount, then the earliest in sorted order.
pub fn detect_transfers(txns: &[WalletTransaction], params: &TransferParams) -> BTreeMap<String, String> {
    let mut sorted: Vec<&WalletTransaction> = txns.iter().collect();
    sorted.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.amount.total_cmp(&b.amount))
    });

    let mut consumed = vec![false; sorted.len()];
    let mut transfers = BTreeMap::new();

    for out_index in 0..sorted.len() {
        let out = sorted[out_index];
        if out.direction != Direction::Out || consumed[out_index] {
            continue;
        }

        let Some(deadline) = out.timestamp.checked_add_signed(params.window) else {
            continue;
        };

        // Equal timestamps may have sorted ahead of `out`, so start at the first
        // transaction sharing its time rather than just after it.
        let start = sorted.partition_point(|txn| txn.timestamp < out.timestamp);

        let mut best: Option<(usize, TimeDelta, f64)> = None;
        for (index, candidate) in sorted.iter().enumerate().skip(start) {
            if candidate.timestamp > deadline {
                break;
            }
            if index == out_index
                || consumed[index]
                || candidate.direction != Direction::In
                || candidate.wallet_id == out.wallet_id
            {
                continue;
            }

            let amount_diff = (candidate.amount - out.amount).abs();
            if !(amount_diff <= params.amount_tolerance + AMOUNT_EPSILON) {
                continue;
            }

            let time_delta = candidate.timestamp - out.timestamp;
            let closer = match best {
                None => true,
                Some((_, best_delta, best_diff)) => {
                    time_delta < best_delta || (time_delta == best_delta && amount_diff < best_diff)
                }
            };
            if closer {
                best = Some((index, time_delta, amount_diff));
            }
        }

        if let Some((in_index, _, _)) = best {
            consumed[out_index] = true;
            consumed[in_index] = true;
            transfers.insert(out.id.clone(), sorted[in_index].id.clone());
        }
    }

    transfers
}
