//! tests/transfer_tests.rs - pairing outbound and inbound legs across wallets

#[cfg(test)]
mod tests {
    use crate::models::{Direction, WalletTransaction};
    use crate::transfer::{detect_transfers, TransferParams};
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 3, 1, 10, 0, 0).unwrap()
    }

    fn txn(id: &str, wallet: &str, direction: Direction, amount: f64, offset_secs: i64) -> WalletTransaction {
        WalletTransaction {
            id: id.to_string(),
            wallet_id: wallet.to_string(),
            direction,
            timestamp: t0() + TimeDelta::seconds(offset_secs),
            amount,
        }
    }

    fn pairs(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(out, inbound)| (out.to_string(), inbound.to_string()))
            .collect()
    }

    #[test]
    fn test_matches_inbound_on_other_wallet() {
        let txns = vec![
            txn("A", "A", Direction::Out, 100.0, 0),
            txn("B", "B", Direction::In, 100.0, 120),
        ];

        let transfers = detect_transfers(&txns, &TransferParams::default());

        assert_eq!(transfers, pairs(&[("A", "B")]));
    }

    #[test]
    fn test_closer_inbound_wins() {
        let txns = vec![
            txn("A", "A", Direction::Out, 100.0, 0),
            txn("B", "B", Direction::In, 100.0, 120),
            txn("C", "C", Direction::In, 100.0, 60),
        ];

        let transfers = detect_transfers(&txns, &TransferParams::default());

        assert_eq!(transfers, pairs(&[("A", "C")]));
    }

    #[test]
    fn test_same_wallet_never_pairs() {
        let txns = vec![
            txn("A-out", "A", Direction::Out, 50.0, 0),
            txn("A-in", "A", Direction::In, 50.0, 0),
        ];

        assert!(detect_transfers(&txns, &TransferParams::default()).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(detect_transfers(&[], &TransferParams::default()).is_empty());
    }

    #[test]
    fn test_inbound_outside_window_is_ignored() {
        let txns = vec![
            txn("out", "A", Direction::Out, 100.0, 0),
            txn("late", "B", Direction::In, 100.0, 301),
            txn("early", "B", Direction::In, 100.0, -10),
        ];

        assert!(detect_transfers(&txns, &TransferParams::default()).is_empty());
    }

    #[test]
    fn test_window_edge_is_inclusive() {
        let txns = vec![
            txn("out", "A", Direction::Out, 100.0, 0),
            txn("in", "B", Direction::In, 100.0, 300),
        ];

        assert_eq!(
            detect_transfers(&txns, &TransferParams::default()),
            pairs(&[("out", "in")])
        );
    }

    #[test]
    fn test_amount_tolerance() {
        let txns = vec![
            txn("out", "A", Direction::Out, 100.0, 0),
            txn("off", "B", Direction::In, 100.02, 10),
            txn("near", "C", Direction::In, 100.01, 20),
        ];

        let transfers = detect_transfers(&txns, &TransferParams::default());
        assert_eq!(transfers, pairs(&[("out", "near")]));

        let strict = TransferParams::new(300, 0.0);
        assert!(detect_transfers(&txns, &strict).is_empty());
    }

    #[test]
    fn test_equal_delay_prefers_closer_amount() {
        let txns = vec![
            txn("out", "A", Direction::Out, 100.0, 0),
            txn("rough", "B", Direction::In, 100.01, 30),
            txn("exact", "C", Direction::In, 100.0, 30),
        ];

        assert_eq!(
            detect_transfers(&txns, &TransferParams::default()),
            pairs(&[("out", "exact")])
        );
    }

    #[test]
    fn test_each_transaction_used_once() {
        let txns = vec![
            txn("out1", "A", Direction::Out, 20.0, 0),
            txn("out2", "B", Direction::Out, 20.0, 10),
            txn("in1", "C", Direction::In, 20.0, 30),
        ];

        let transfers = detect_transfers(&txns, &TransferParams::default());

        // the earlier outbound leg claims the only inbound one
        assert_eq!(transfers, pairs(&[("out1", "in1")]));
    }

    #[test]
    fn test_greedy_pairs_in_time_order() {
        let txns = vec![
            txn("in2", "C", Direction::In, 7.5, 200),
            txn("out2", "B", Direction::Out, 7.5, 100),
            txn("in1", "D", Direction::In, 7.5, 50),
            txn("out1", "A", Direction::Out, 7.5, 0),
        ];

        let transfers = detect_transfers(&txns, &TransferParams::default());

        assert_eq!(transfers, pairs(&[("out1", "in1"), ("out2", "in2")]));
    }

    #[test]
    fn test_simultaneous_legs_pair() {
        // The inbound leg sorts ahead of the outbound one on amount
        let txns = vec![
            txn("out", "A", Direction::Out, 10.005, 0),
            txn("in", "B", Direction::In, 10.0, 0),
        ];

        assert_eq!(
            detect_transfers(&txns, &TransferParams::default()),
            pairs(&[("out", "in")])
        );
    }

    #[test]
    fn test_only_out_to_in() {
        let txns = vec![
            txn("in", "A", Direction::In, 5.0, 0),
            txn("out", "B", Direction::Out, 5.0, 60),
            txn("out-again", "C", Direction::Out, 5.0, 90),
        ];

        assert!(detect_transfers(&txns, &TransferParams::default()).is_empty());
    }

    #[test]
    fn test_nan_amount_never_matches() {
        let txns = vec![
            txn("out", "A", Direction::Out, f64::NAN, 0),
            txn("in", "B", Direction::In, f64::NAN, 10),
        ];

        assert!(detect_transfers(&txns, &TransferParams::default()).is_empty());
    }
}
