use std::{env, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use wallet_sync_service::{
    blockchain::{BatchFetcher, BlockchairClient, ChainProvider},
    config::Config,
    db::{connection, LedgerStore, SqliteLedger},
    sync::SyncEngine,
    validation::validate_bitcoin_address,
};

// Manual check against the live Blockchair API:
//   cargo run --bin test_blockchair -- <address>
// Uses an in-memory ledger, so nothing is written to DATABASE_URL.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let address = env::args()
        .nth(1)
        .unwrap_or_else(|| "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa".to_string());
    validate_bitcoin_address(&address)?;

    let config = Config::from_env();
    let client = Arc::new(BlockchairClient::new(&config)?);
    let cancel = CancellationToken::new();

    // 1. Address dashboard
    info!("Fetching address dashboard for {}...", address);
    let snapshot = client.address_snapshot(&address).await?;
    info!(
        "✅ Balance ${:.2}, {} transaction hashes on the first page",
        snapshot.balance,
        snapshot.txn_ids.len()
    );

    // 2. Details for a few of the newest hashes
    let sample: Vec<String> = snapshot.txn_ids.iter().take(3).cloned().collect();
    if sample.is_empty() {
        warn!("Address has no transactions, skipping detail lookup");
    } else {
        let fetcher = BatchFetcher::new(client.clone(), config.throttle_cooldown);
        match fetcher.fetch(&sample, &cancel).await {
            Ok(details) => {
                for id in &sample {
                    match details.get(id) {
                        Some(detail) => info!(
                            "✅ {} at {}: ${:.2} (fee ${:.2})",
                            id, detail.timestamp, detail.amount, detail.fee
                        ),
                        None => error!("❌ No detail returned for {}", id),
                    }
                }
            }
            Err(e) => error!("❌ Detail fetch failed: {}", e),
        }
    }

    // 3. Two reconcile passes; the second one should find nothing new
    let ledger = Arc::new(SqliteLedger::new(connection::in_memory().await?));
    let engine = SyncEngine::new(client, ledger.clone(), config.throttle_cooldown, config.gap_policy);

    let first = engine.reconcile(&address, &cancel).await?;
    info!(
        "✅ First sync stored {} transactions, cursor {:?}",
        first.new_transactions.len(),
        first.address.last_txn_hash
    );

    let second = engine.reconcile(&address, &cancel).await?;
    if second.new_transactions.is_empty() {
        info!("✅ Second sync found no new transactions");
    } else {
        warn!(
            "Second sync found {} new transactions (address is active)",
            second.new_transactions.len()
        );
    }

    let stored = ledger.list_transactions(&address).await?;
    info!("Ledger now holds {} transactions for {}", stored.len(), address);

    Ok(())
}
